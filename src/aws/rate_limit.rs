//! Token bucket rate limiter
//!
//! Tokens are added to the bucket at a constant rate and every API call
//! consumes one. When the bucket is empty the caller waits for the next
//! token instead of being rejected, so bursts up to the bucket size pass
//! immediately and the long-run rate never exceeds the refill rate.

use crate::source::SourceError;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// CloudFormation allows roughly ten requests per second per account
pub const DEFAULT_RATE_PER_SEC: f64 = 5.0;
pub const DEFAULT_BURST: u32 = 10;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Waiting token bucket shared by every API call of one client
#[derive(Debug)]
pub struct TokenBucket {
    rate_per_sec: f64,
    burst: u32,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket
    ///
    /// A non-positive rate falls back to [`DEFAULT_RATE_PER_SEC`] and a zero
    /// burst is treated as one.
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        let rate_per_sec = if rate_per_sec > 0.0 && rate_per_sec.is_finite() {
            rate_per_sec
        } else {
            DEFAULT_RATE_PER_SEC
        };
        let burst = burst.max(1);

        Self {
            rate_per_sec,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn rate_per_sec(&self) -> f64 {
        self.rate_per_sec
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Takes one token, waiting for a refill when the bucket is empty
    ///
    /// Returns [`SourceError::Cancelled`] if `cancel` fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), SourceError> {
        loop {
            if cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }

            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }

                let missing = 1.0 - state.tokens;
                Duration::from_secs_f64(missing / self.rate_per_sec)
            };

            trace!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting for token");

            tokio::select! {
                _ = cancel.cancelled() => return Err(SourceError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Takes one token only if it is available right now
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        state.tokens =
            (state.tokens + elapsed.as_secs_f64() * self.rate_per_sec).min(self.burst as f64);
        state.last_refill = now;
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_PER_SEC, DEFAULT_BURST)
    }
}
