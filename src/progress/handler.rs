//! Progress handler trait and events

use std::time::Duration;

/// Why a candidate produced no result and no error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The listing entry had no usable name
    MissingName,

    /// Resources could not be fetched, so the stack cannot be classified
    ResourcesUnavailable { error: String },
}

/// Events emitted while a scan runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Scan started
    ScanStarted { region: String },

    /// Candidate listing finished and workers are about to start
    CandidatesListed { candidates: usize, workers: usize },

    /// A candidate was dropped without classification
    StackSkipped {
        stack_name: Option<String>,
        reason: SkipReason,
    },

    /// Detail fetch failed; evaluation continues without it
    DetailUnavailable { stack_name: String, error: String },

    /// A stack was evaluated and matched no rule
    StackNotMatched { stack_name: String },

    /// A stack matched at least one rule
    StackMatched { stack_name: String, reasons: usize },

    /// A worker task ended abnormally
    WorkerFailed { error: String },

    /// Scan completed
    ScanCompleted {
        candidates: usize,
        matched: usize,
        total_time: Duration,
    },

    /// Scan aborted
    ScanFailed { error: String },
}

/// Trait for observing scan progress
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_handler() {
        let handler = NoOpHandler;
        handler.on_progress(&ProgressEvent::ScanStarted {
            region: "us-east-1".to_string(),
        });
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::ScanStarted {
            region: "us-east-1".to_string(),
        });
        handler.on_progress(&ProgressEvent::CandidatesListed {
            candidates: 2,
            workers: 2,
        });
        handler.on_progress(&ProgressEvent::ScanCompleted {
            candidates: 2,
            matched: 1,
            total_time: Duration::from_millis(50),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::StackSkipped {
            stack_name: None,
            reason: SkipReason::MissingName,
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("StackSkipped"));
        assert!(debug_str.contains("MissingName"));
    }
}
