use crate::source::SourceError;
use thiserror::Error;

/// Errors that abort a whole scan
///
/// Only the candidate listing can fail a scan. Per-stack failures are
/// absorbed by the detector and never surface here.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("failed to list candidate stacks")]
    ListCandidates(#[source] SourceError),
}

impl DetectionError {
    /// True when the listing was interrupted by the scan's cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DetectionError::ListCandidates(SourceError::Cancelled))
    }
}
