//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler, SkipReason};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ScanStarted { region } => {
                info!(region = %region, "Starting stack scan");
            }
            ProgressEvent::CandidatesListed {
                candidates,
                workers,
            } => {
                info!(candidates, workers, "Listed candidate stacks");
            }
            ProgressEvent::StackSkipped { stack_name, reason } => match reason {
                SkipReason::MissingName => {
                    debug!("Skipping listing entry without a stack name");
                }
                SkipReason::ResourcesUnavailable { error } => {
                    warn!(
                        stack = stack_name.as_deref().unwrap_or("<unnamed>"),
                        error = %error,
                        "Skipping stack, resources unavailable"
                    );
                }
            },
            ProgressEvent::DetailUnavailable { stack_name, error } => {
                debug!(stack = %stack_name, error = %error, "Stack detail unavailable");
            }
            ProgressEvent::StackNotMatched { stack_name } => {
                debug!(stack = %stack_name, "No rule matched");
            }
            ProgressEvent::StackMatched {
                stack_name,
                reasons,
            } => {
                info!(stack = %stack_name, reasons, "Serverless stack detected");
            }
            ProgressEvent::WorkerFailed { error } => {
                warn!(error = %error, "Scan worker failed");
            }
            ProgressEvent::ScanCompleted {
                candidates,
                matched,
                total_time,
            } => {
                info!(
                    candidates,
                    matched,
                    total_time_ms = total_time.as_millis() as u64,
                    "Scan complete"
                );
            }
            ProgressEvent::ScanFailed { error } => {
                warn!(error = %error, "Scan failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::ScanStarted {
                region: "us-east-1".to_string(),
            },
            ProgressEvent::CandidatesListed {
                candidates: 3,
                workers: 3,
            },
            ProgressEvent::StackSkipped {
                stack_name: None,
                reason: SkipReason::MissingName,
            },
            ProgressEvent::StackSkipped {
                stack_name: Some("broken".to_string()),
                reason: SkipReason::ResourcesUnavailable {
                    error: "AccessDenied".to_string(),
                },
            },
            ProgressEvent::DetailUnavailable {
                stack_name: "app".to_string(),
                error: "timeout".to_string(),
            },
            ProgressEvent::StackNotMatched {
                stack_name: "other".to_string(),
            },
            ProgressEvent::StackMatched {
                stack_name: "app".to_string(),
                reasons: 1,
            },
            ProgressEvent::WorkerFailed {
                error: "panicked".to_string(),
            },
            ProgressEvent::ScanCompleted {
                candidates: 3,
                matched: 1,
                total_time: Duration::from_millis(120),
            },
            ProgressEvent::ScanFailed {
                error: "listing failed".to_string(),
            },
        ];

        for event in &events {
            handler.on_progress(event);
        }
    }
}
