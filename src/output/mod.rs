pub mod schema;

pub use schema::{DetectedStack, StacksOutput};
