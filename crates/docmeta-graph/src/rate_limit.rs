//! Adaptive rate limiting for Microsoft Graph API
//!
//! Provides proactive admission control so that many concurrent workers
//! share one outbound request budget, and adapts that budget to what the
//! service reports (429 throttle / success).
//!
//! ## Architecture
//!
//! - [`AdaptiveRateLimiter`]: sliding one-second window of admission instants
//!   with a self-tuning rate between a floor and twice the configured baseline
//! - [`parse_retry_after`]: `Retry-After` header parsing shared by the client
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docmeta_graph::rate_limit::AdaptiveRateLimiter;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), docmeta_graph::GraphError> {
//! let limiter = AdaptiveRateLimiter::new(20);
//! let cancel = CancellationToken::new();
//! limiter.acquire(&cancel).await?;
//! // ... make API call ...
//! limiter.adjust_rate(false);
//! # Ok(())
//! # }
//! ```

use std::{collections::VecDeque, sync::Mutex, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::GraphError;

/// Length of the admission window
pub const WINDOW: Duration = Duration::from_secs(1);

/// Lowest rate the limiter reduces to, and the smallest baseline it accepts
pub const MIN_RATE: u32 = 5;

/// Amount added to the current rate on each success
pub const RATE_STEP: u32 = 5;

// ============================================================================
// AdaptiveRateLimiter
// ============================================================================

/// Internal mutable state, protected by a Mutex.
#[derive(Debug)]
struct LimiterInner {
    /// Admissions allowed per window right now
    current_rate: u32,
    /// Admission instants inside (or just expired from) the window, oldest first
    admissions: VecDeque<Instant>,
}

/// Sliding-window adaptive rate limiter.
///
/// Thread-safe and designed to be shared via `Arc<AdaptiveRateLimiter>`.
/// The lock is only held for bookkeeping, never across a sleep.
#[derive(Debug)]
pub struct AdaptiveRateLimiter {
    baseline: u32,
    floor: u32,
    ceiling: u32,
    inner: Mutex<LimiterInner>,
}

impl AdaptiveRateLimiter {
    /// Creates a limiter admitting `baseline` requests per second.
    ///
    /// Baselines below [`MIN_RATE`] are raised to it, so reductions can
    /// never take the rate under the floor.
    pub fn new(baseline: u32) -> Self {
        let baseline = baseline.max(MIN_RATE);
        Self {
            baseline,
            floor: MIN_RATE,
            ceiling: baseline.saturating_mul(2),
            inner: Mutex::new(LimiterInner {
                current_rate: baseline,
                admissions: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LimiterInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn evict_expired(inner: &mut LimiterInner, now: Instant) {
        while let Some(&oldest) = inner.admissions.front() {
            if now.duration_since(oldest) >= WINDOW {
                inner.admissions.pop_front();
            } else {
                break;
            }
        }
    }

    /// Waits for a free slot in the window and records one admission.
    ///
    /// Returns [`GraphError::Cancelled`] if `cancel` fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), GraphError> {
        loop {
            if cancel.is_cancelled() {
                return Err(GraphError::Cancelled);
            }

            let wait = {
                let mut inner = self.lock();
                let now = Instant::now();
                Self::evict_expired(&mut inner, now);

                if inner.admissions.len() < inner.current_rate as usize {
                    inner.admissions.push_back(now);
                    return Ok(());
                }

                // Window is full: sleep until the oldest admission expires
                inner
                    .admissions
                    .front()
                    .map(|&oldest| (oldest + WINDOW).saturating_duration_since(now))
                    .unwrap_or(Duration::ZERO)
                    .max(Duration::from_millis(1))
            };

            debug!(wait_ms = wait.as_millis() as u64, "Rate window full, waiting");

            tokio::select! {
                _ = cancel.cancelled() => return Err(GraphError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Feeds back the outcome of a request.
    ///
    /// `reduce = true` (throttled) halves the rate down to the floor;
    /// `reduce = false` (success) adds [`RATE_STEP`] up to twice the baseline.
    pub fn adjust_rate(&self, reduce: bool) {
        let mut inner = self.lock();
        let old = inner.current_rate;

        inner.current_rate = if reduce {
            (old / 2).max(self.floor)
        } else {
            old.saturating_add(RATE_STEP).min(self.ceiling)
        };

        if reduce {
            warn!(old_rate = old, new_rate = inner.current_rate, "Throttled: reducing request rate");
        } else if inner.current_rate != old {
            debug!(old_rate = old, new_rate = inner.current_rate, "Increasing request rate");
        }
    }

    /// Returns `(current_rate, admissions_in_window)` without modifying state.
    pub fn stats(&self) -> (u32, usize) {
        let inner = self.lock();
        let now = Instant::now();
        let in_window = inner
            .admissions
            .iter()
            .filter(|&&t| now.duration_since(t) < WINDOW)
            .count();
        (inner.current_rate, in_window)
    }

    /// Configured baseline rate.
    pub fn baseline(&self) -> u32 {
        self.baseline
    }

    /// Lowest rate reachable through reductions.
    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// Highest rate reachable through increases.
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }
}

// ============================================================================
// Retry-After header parsing helpers
// ============================================================================

/// Parses a Retry-After header value into a Duration.
///
/// The header can be either:
/// - An integer number of seconds (e.g., "30")
/// - An HTTP-date (e.g., "Fri, 31 Dec 2025 23:59:59 GMT") - parsed as seconds from now
///
/// Falls back to the default duration if parsing fails.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            let diff = target - now;
            if let Some(secs) = diff
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= 3600)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
