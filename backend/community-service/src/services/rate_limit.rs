//! Per-caller rate limits on community writes.
//!
//! Uses `governor` keyed token buckets: one bucket per caller key (the actor
//! id when known, otherwise the client address). A quota of zero disables the
//! limit for that action.

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::error::{AppError, Result};
use crate::metrics::RATE_LIMITED_TOTAL;

/// Buckets kept before idle ones are evicted.
const MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Submissions per caller per minute
    pub creates_per_minute: u32,
    /// Upvotes per caller per minute
    pub upvotes_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            creates_per_minute: 10,
            upvotes_per_minute: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            creates_per_minute: 0,
            upvotes_per_minute: 0,
        }
    }
}

pub struct ActionLimiter {
    operation: &'static str,
    limiter: Option<DefaultKeyedRateLimiter<String>>,
}

impl ActionLimiter {
    pub fn per_minute(operation: &'static str, per_minute: u32) -> Self {
        let limiter =
            NonZeroU32::new(per_minute).map(|n| RateLimiter::keyed(Quota::per_minute(n)));
        Self { operation, limiter }
    }

    pub fn check(&self, key: &str) -> Result<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        if limiter.len() > MAX_TRACKED_KEYS {
            limiter.retain_recent();
        }

        match limiter.check_key(&key.to_string()) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                RATE_LIMITED_TOTAL.with_label_values(&[self.operation]).inc();
                tracing::warn!(operation = self.operation, key, "Rate limit exceeded");
                Err(AppError::RateLimited {
                    operation: self.operation,
                    retry_after_secs: wait.as_secs().max(1),
                })
            }
        }
    }
}

/// Limiters for the write paths open to the public.
pub struct RateLimits {
    pub create: ActionLimiter,
    pub upvote: ActionLimiter,
}

impl RateLimits {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            create: ActionLimiter::per_minute("create_content", config.creates_per_minute),
            upvote: ActionLimiter::per_minute("upvote_content", config.upvotes_per_minute),
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new(&RateLimitConfig::disabled())
    }
}
