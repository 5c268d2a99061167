// Client-side rate limit tracking.
// Remaining-request count and reset time come from response headers; requests
// are gated before any network attempt. Expiry is lazy: the state clears on
// the first check past the reset time, not on a timer.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::Clock;

/// Rate limit headers parsed from a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// Requests remaining in the current window.
    pub remaining: Option<i64>,
    /// Unix timestamp (seconds) when the window resets.
    pub reset_epoch: Option<i64>,
}

#[derive(Debug, Default)]
struct LimitState {
    remaining: Option<i64>,
    /// Reset time in epoch milliseconds.
    reset_at: Option<i64>,
}

/// Per-client rate limit state.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    state: Mutex<LimitState>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(LimitState::default()),
        }
    }

    /// Record limits from a response.
    pub fn record(&self, remaining: i64, reset_epoch_secs: i64) {
        let mut state = self.state.lock().unwrap();
        state.remaining = Some(remaining);
        state.reset_at = Some(reset_epoch_secs * 1000);
        debug!(remaining, "rate limit updated");
    }

    /// Record whichever limit headers the response carried.
    pub fn record_headers(&self, headers: &RateLimitHeaders) {
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = headers.remaining {
            state.remaining = Some(remaining);
            debug!(remaining, "rate limit updated");
        }
        if let Some(reset_epoch) = headers.reset_epoch {
            state.reset_at = Some(reset_epoch * 1000);
        }
    }

    /// Whether requests are currently blocked.
    ///
    /// True only when limits have been recorded, no requests remain, and the
    /// reset time is still ahead. A check at or past the reset time clears
    /// the recorded state. Before anything is recorded this is always false:
    /// absence of information never blocks.
    pub fn is_limited(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let (Some(remaining), Some(reset_at)) = (state.remaining, state.reset_at) else {
            return false;
        };

        if self.clock.now_millis() >= reset_at {
            state.remaining = None;
            state.reset_at = None;
            return false;
        }

        remaining <= 0
    }

    /// When the current window ends, if limits have been recorded.
    pub fn resets_at(&self) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap();
        state.reset_at.and_then(DateTime::from_timestamp_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter_at(now: i64) -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new(now));
        let limiter = RateLimiter::new(clock.clone());
        (clock, limiter)
    }

    #[test]
    fn test_open_before_any_record() {
        let (_, limiter) = limiter_at(1_000_000);
        assert!(!limiter.is_limited());
        assert!(limiter.resets_at().is_none());
    }

    #[test]
    fn test_limited_when_exhausted_before_reset() {
        let (_, limiter) = limiter_at(1_000_000);
        limiter.record(0, 2_000);
        assert!(limiter.is_limited());
    }

    #[test]
    fn test_clears_lazily_at_reset_time() {
        let (clock, limiter) = limiter_at(1_000_000);
        limiter.record(0, 2_000);
        assert!(limiter.is_limited());

        clock.set(2_000_000);
        assert!(!limiter.is_limited());

        // The check cleared the recorded state, not just the verdict
        assert!(limiter.resets_at().is_none());
    }

    #[test]
    fn test_state_consistency_scenarios() {
        let now_secs = 1_000;
        let cases = [
            (10, now_secs + 60, false),
            (0, now_secs + 60, true),
            (0, now_secs - 1, false),
            (5, now_secs + 30, false),
        ];

        for (remaining, reset_epoch, expected) in cases {
            let (_, limiter) = limiter_at(now_secs * 1000);
            limiter.record(remaining, reset_epoch);
            assert_eq!(
                limiter.is_limited(),
                expected,
                "remaining={remaining} reset={reset_epoch}"
            );
        }
    }

    #[test]
    fn test_partial_headers_update_only_present_fields() {
        let (_, limiter) = limiter_at(1_000_000);
        limiter.record(5, 2_000);

        limiter.record_headers(&RateLimitHeaders {
            remaining: Some(0),
            reset_epoch: None,
        });
        assert!(limiter.is_limited());

        let resets_at = limiter.resets_at().unwrap();
        assert_eq!(resets_at.timestamp(), 2_000);
    }
}
