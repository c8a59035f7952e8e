//! Progress reporting for scans

mod handler;
mod logging;

pub use handler::{NoOpHandler, ProgressEvent, ProgressHandler, SkipReason};
pub use logging::LoggingHandler;
