//! Concurrent stack detector
//!
//! A scan runs in four steps:
//! 1. List candidate stacks once. This is the only step whose failure is
//!    returned to the caller.
//! 2. Queue every candidate and start `min(max_workers, candidates)` worker
//!    tasks.
//! 3. Each worker pulls candidates until the queue is drained: fetch
//!    resources, fetch detail, evaluate the rules, and send a
//!    [`DetectedStack`] for every match.
//! 4. Drain the result channel into the output list. Order follows worker
//!    completion, not input order.
//!
//! Per-stack failures never abort the scan. A stack without a name or whose
//! resources cannot be fetched is dropped; a stack whose detail cannot be
//! fetched is still evaluated from its resources alone.

use super::error::DetectionError;
use super::rules::RuleEngine;
use super::types::StackCandidate;
use crate::output::schema::DetectedStack;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler, SkipReason};
use crate::source::StackDataSource;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Scans one region for Serverless Framework stacks
pub struct Detector {
    source: Arc<dyn StackDataSource>,
    engine: Arc<RuleEngine>,
    region: String,
    max_workers: usize,
    progress: Arc<dyn ProgressHandler>,
}

impl Detector {
    /// Creates a detector with the default rules and worker count
    pub fn new(source: Arc<dyn StackDataSource>, region: impl Into<String>) -> Self {
        Self {
            source,
            engine: Arc::new(RuleEngine::with_defaults()),
            region: region.into(),
            max_workers: DEFAULT_MAX_WORKERS,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_rule_engine(mut self, engine: RuleEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    /// Sets the worker pool size; zero is treated as one
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_progress_handler(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = handler;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn rule_engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Runs a full scan
    ///
    /// Returns an error only when the candidate listing fails, including
    /// when it is cancelled. Cancellation after the listing yields whatever
    /// was classified before in-flight calls were aborted.
    pub async fn detect(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<DetectedStack>, DetectionError> {
        let start = Instant::now();
        self.progress.on_progress(&ProgressEvent::ScanStarted {
            region: self.region.clone(),
        });

        let candidates = match self.source.list_candidates(cancel).await {
            Ok(candidates) => candidates,
            Err(e) => {
                let cause = e.to_string();
                let error = DetectionError::ListCandidates(e);
                self.progress.on_progress(&ProgressEvent::ScanFailed {
                    error: format!("{}: {}", error, cause),
                });
                return Err(error);
            }
        };

        let total = candidates.len();
        let stacks = self.process_concurrently(candidates, cancel).await;

        self.progress.on_progress(&ProgressEvent::ScanCompleted {
            candidates: total,
            matched: stacks.len(),
            total_time: start.elapsed(),
        });

        Ok(stacks)
    }

    async fn process_concurrently(
        &self,
        candidates: Vec<StackCandidate>,
        cancel: &CancellationToken,
    ) -> Vec<DetectedStack> {
        let total = candidates.len();
        let workers = self.max_workers.min(total);
        self.progress
            .on_progress(&ProgressEvent::CandidatesListed { candidates: total, workers });

        if total == 0 {
            return Vec::new();
        }

        // Capacity covers every candidate, so queueing never waits on workers.
        let (job_tx, job_rx) = mpsc::channel::<StackCandidate>(total);
        for candidate in candidates {
            if job_tx.send(candidate).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let jobs = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<DetectedStack>(total);

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let worker = StackWorker {
                source: Arc::clone(&self.source),
                engine: Arc::clone(&self.engine),
                region: self.region.clone(),
                progress: Arc::clone(&self.progress),
                cancel: cancel.clone(),
            };
            let jobs = Arc::clone(&jobs);
            let results = result_tx.clone();
            pool.spawn(async move { worker.run(worker_id, jobs, results).await });
        }
        drop(result_tx);

        let mut stacks = Vec::new();
        while let Some(stack) = result_rx.recv().await {
            stacks.push(stack);
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                self.progress.on_progress(&ProgressEvent::WorkerFailed {
                    error: e.to_string(),
                });
            }
        }

        stacks
    }
}

/// Read-only state one worker task needs
struct StackWorker {
    source: Arc<dyn StackDataSource>,
    engine: Arc<RuleEngine>,
    region: String,
    progress: Arc<dyn ProgressHandler>,
    cancel: CancellationToken,
}

impl StackWorker {
    async fn run(
        self,
        worker_id: usize,
        jobs: Arc<Mutex<mpsc::Receiver<StackCandidate>>>,
        results: mpsc::Sender<DetectedStack>,
    ) {
        let mut processed = 0usize;

        loop {
            let next = jobs.lock().await.recv().await;
            let Some(candidate) = next else {
                break;
            };

            processed += 1;
            if let Some(stack) = self.process_stack(candidate).await {
                if results.send(stack).await.is_err() {
                    break;
                }
            }
        }

        debug!(worker_id, processed, "Worker finished");
    }

    async fn process_stack(&self, candidate: StackCandidate) -> Option<DetectedStack> {
        let Some(stack_name) = candidate.usable_name() else {
            self.progress.on_progress(&ProgressEvent::StackSkipped {
                stack_name: None,
                reason: SkipReason::MissingName,
            });
            return None;
        };

        let resources = match self.source.get_resources(&self.cancel, stack_name).await {
            Ok(resources) => resources,
            Err(e) => {
                self.progress.on_progress(&ProgressEvent::StackSkipped {
                    stack_name: Some(stack_name.to_string()),
                    reason: SkipReason::ResourcesUnavailable {
                        error: e.to_string(),
                    },
                });
                return None;
            }
        };

        let detail = match self.source.get_detail(&self.cancel, stack_name).await {
            Ok(detail) => detail,
            Err(e) => {
                self.progress.on_progress(&ProgressEvent::DetailUnavailable {
                    stack_name: stack_name.to_string(),
                    error: e.to_string(),
                });
                None
            }
        };

        let verdict = self.engine.evaluate(&resources, detail.as_ref());
        if !verdict.is_match() {
            self.progress.on_progress(&ProgressEvent::StackNotMatched {
                stack_name: stack_name.to_string(),
            });
            return None;
        }

        self.progress.on_progress(&ProgressEvent::StackMatched {
            stack_name: stack_name.to_string(),
            reasons: verdict.reasons().len(),
        });

        Some(DetectedStack::from_parts(
            &candidate,
            detail.as_ref(),
            &self.region,
            verdict.into_reasons(),
            Utc::now(),
        ))
    }
}
