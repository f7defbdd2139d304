//! Rate limiting for the store and the embedding generator.

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::trace;

use engram_protocols::MemoryError;

/// A `(max_operations, time_window)` admission policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    pub max_operations: u32,
    pub time_window: Duration,
}

impl RateLimiterConfig {
    pub fn per_second(max_operations: u32) -> Self {
        Self {
            max_operations,
            time_window: Duration::from_secs(1),
        }
    }
}

/// Counters exposed by a limiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterStats {
    /// Successful acquisitions, blocking and non-blocking.
    pub total_acquired: u64,
    /// Acquisitions that had to wait for capacity.
    pub throttled: u64,
}

impl RateLimiterStats {
    pub fn throttle_rate(&self) -> f64 {
        if self.total_acquired == 0 {
            return 0.0;
        }
        self.throttled as f64 / self.total_acquired as f64
    }
}

struct LimiterState {
    /// GCRA theoretical arrival time of the next conforming operation.
    tat: Instant,
    total_acquired: u64,
    throttled: u64,
}

/// GCRA (leaky-bucket) rate limiter with continuous replenishment.
///
/// Capacity refills at one operation per `time_window / max_operations`
/// rather than in discrete window resets, so there is no thundering herd
/// at window boundaries. A full window's worth of burst is tolerated.
///
/// Capacity is consumed only at the moment an acquisition is granted:
/// a caller cancelled while waiting has reserved nothing, so cancellation
/// can never leak capacity away from other callers.
pub struct RateLimiter {
    name: String,
    /// Spacing between conforming operations.
    increment: Duration,
    /// Burst allowance: how far ahead of schedule an operation may run.
    tolerance: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimiterConfig) -> Self {
        let ops = config.max_operations.max(1);
        let increment = config.time_window / ops;
        let tolerance = increment * (ops - 1);
        Self {
            name: name.into(),
            increment,
            tolerance,
            state: Mutex::new(LimiterState {
                tat: Instant::now(),
                total_acquired: 0,
                throttled: 0,
            }),
        }
    }

    /// Block until capacity is available, then consume one operation.
    /// The sleep happens outside the lock; an already-available acquire is
    /// a single short critical section.
    pub async fn acquire(&self) {
        let mut waited = false;
        loop {
            let wait = {
                let mut state = self.state.lock();
                let now = Instant::now();
                let tat = state.tat.max(now);
                let allowed_at = tat.checked_sub(self.tolerance).unwrap_or(now);
                if allowed_at <= now {
                    state.tat = tat + self.increment;
                    state.total_acquired += 1;
                    if waited {
                        state.throttled += 1;
                    }
                    None
                } else {
                    Some(allowed_at - now)
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    waited = true;
                    trace!(limiter = %self.name, delay_ms = delay.as_millis() as u64, "throttled");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Consume one operation only if capacity is available right now.
    pub fn try_acquire(&self) -> Result<(), MemoryError> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let tat = state.tat.max(now);
        let allowed_at = tat.checked_sub(self.tolerance).unwrap_or(now);
        if allowed_at <= now {
            state.tat = tat + self.increment;
            state.total_acquired += 1;
            Ok(())
        } else {
            Err(MemoryError::CapacityExceeded(self.name.clone()))
        }
    }

    /// Report whether capacity is available without consuming any.
    pub fn has_capacity(&self) -> bool {
        let state = self.state.lock();
        let now = Instant::now();
        let tat = state.tat.max(now);
        match tat.checked_sub(self.tolerance) {
            Some(allowed_at) => allowed_at <= now,
            None => true,
        }
    }

    pub fn stats(&self) -> RateLimiterStats {
        let state = self.state.lock();
        RateLimiterStats {
            total_acquired: state.total_acquired,
            throttled: state.throttled,
        }
    }
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;
