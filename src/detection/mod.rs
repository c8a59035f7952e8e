//! Serverless stack detection
//!
//! - [`rules`]: the [`RuleEngine`] and the built-in detection rules
//! - [`detector`]: the [`Detector`] that scans all candidate stacks with a
//!   bounded worker pool
//! - [`types`]: the values exchanged with a [`crate::source::StackDataSource`]

pub mod detector;
pub mod error;
pub mod rules;
pub mod types;

pub use detector::{Detector, DEFAULT_MAX_WORKERS};
pub use error::DetectionError;
pub use rules::{DetectionRule, RuleEngine, ServerlessDeploymentBucketRule};
pub use types::{DetectionVerdict, ResourceRecord, StackCandidate, StackDetail};
