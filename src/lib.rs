//! find-serverless-stacks - locate CloudFormation stacks deployed by the
//! Serverless Framework
//!
//! A scan lists every active stack in one region, inspects each stack's
//! resources with a bounded pool of concurrent workers, and reports the
//! stacks that contain the Serverless Framework deployment bucket.
//!
//! # Example Usage
//!
//! ```
//! use find_serverless_stacks::detection::{Detector, ResourceRecord};
//! use find_serverless_stacks::source::MockStackSource;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let source = MockStackSource::new().with_stack(
//!     "my-api-dev",
//!     vec![ResourceRecord::new("ServerlessDeploymentBucket", "AWS::S3::Bucket")],
//! );
//!
//! let detector = Detector::new(Arc::new(source), "us-east-1");
//! let stacks = detector.detect(&CancellationToken::new()).await.unwrap();
//! assert_eq!(stacks[0].stack_name, "my-api-dev");
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`detection`]: rule engine and the concurrent detector
//! - [`source`]: the data source abstraction the detector consumes
//! - [`aws`]: the CloudFormation-backed data source
//! - [`output`]: result schema
//! - [`cli`]: argument parsing, handlers and output formatting

pub mod aws;
pub mod cli;
pub mod config;
pub mod detection;
pub mod output;
pub mod progress;
pub mod source;
pub mod util;

pub use config::{AssumeRoleConfig, ConfigError, ScanConfig};
pub use detection::{DetectionError, Detector, RuleEngine};
pub use output::{DetectedStack, StacksOutput};
pub use source::{SourceError, StackDataSource};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
