//! Stack data source abstraction
//!
//! The detector never talks to AWS directly. It consumes a
//! [`StackDataSource`], which lists candidate stacks and fetches per-stack
//! resources and details. [`crate::aws::CloudFormationSource`] is the real
//! implementation; [`mock::MockStackSource`] is a scripted in-memory one.
//!
//! Every call receives the scan's [`CancellationToken`]. Implementations are
//! expected to return [`SourceError::Cancelled`] promptly once it fires.

pub mod mock;

use crate::detection::types::{ResourceRecord, StackCandidate, StackDetail};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use mock::MockStackSource;

/// Failures reported by a stack data source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("insufficient AWS permissions: {message}")]
    PermissionDenied { message: String },

    #[error("invalid AWS region '{region}': {message}")]
    InvalidRegion { region: String, message: String },

    #[error("AWS API rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("network connectivity issue: {message}")]
    Network { message: String },

    #[error("stack not found: {stack_name}")]
    NotFound { stack_name: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("unexpected AWS API error: {message}")]
    Unknown { message: String },
}

impl SourceError {
    /// Rate limiting and transient network failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited { .. } | SourceError::Network { .. }
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        SourceError::Unknown {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        SourceError::Network {
            message: message.into(),
        }
    }
}

/// Capability the detector needs from its environment
///
/// Implementations must be safe for concurrent use: one instance is shared
/// by every scan worker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StackDataSource: Send + Sync {
    /// Lists all stacks in an active state. Failure here aborts the scan.
    async fn list_candidates(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<StackCandidate>, SourceError>;

    async fn get_resources(
        &self,
        cancel: &CancellationToken,
        stack_name: &str,
    ) -> Result<Vec<ResourceRecord>, SourceError>;

    /// Returns `Ok(None)` when the backend knows nothing more about the stack
    async fn get_detail(
        &self,
        cancel: &CancellationToken,
        stack_name: &str,
    ) -> Result<Option<StackDetail>, SourceError>;
}
