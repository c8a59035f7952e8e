//! CloudFormation-backed stack data source
//!
//! [`CloudFormationSource`] implements [`crate::source::StackDataSource`]
//! over the AWS SDK. Every API call it makes goes through the shared
//! [`TokenBucket`], a per-request timeout and [`retry_with_backoff`], and
//! stops as soon as the scan's cancellation token fires.

pub mod auth;
pub mod client;
pub mod rate_limit;
pub mod retry;

pub use auth::load_sdk_config;
pub use client::CloudFormationSource;
pub use rate_limit::TokenBucket;
pub use retry::{retry_with_backoff, RetryConfig};
