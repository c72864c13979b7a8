//! Sliding-window rate limiter, per-process and reset-on-restart.
//!
//! Grounded almost directly on `api/auth.rs::enforce_rate_limit`'s
//! bucket-key + `Vec<timestamp>` + `retain` + `len() >= max` shape, extended
//! with per-route-class limits and the `X-RateLimit-*`/`retryAfter`
//! response surface spec.md §4.5/§6 ask for.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::Config;

#[derive(Clone, Copy, Debug)]
pub enum RouteClass {
    Register,
    Authenticated,
    Chat,
    Public,
}

/// Per-minute caps for each route class; defaults match spec.md §6 and are
/// overridable via [`Config`]'s `rate_limit_*` knobs.
#[derive(Clone, Copy, Debug)]
pub struct RateLimits {
    pub register_per_min: u32,
    pub authenticated_per_min: u32,
    pub chat_per_min: u32,
    pub public_per_min: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            register_per_min: 5,
            authenticated_per_min: 60,
            chat_per_min: 10,
            public_per_min: 30,
        }
    }
}

impl From<&Config> for RateLimits {
    fn from(config: &Config) -> Self {
        Self {
            register_per_min: config.rate_limit_register_per_min,
            authenticated_per_min: config.rate_limit_authenticated_per_min,
            chat_per_min: config.rate_limit_chat_per_min,
            public_per_min: config.rate_limit_public_per_min,
        }
    }
}

impl RouteClass {
    fn limit_and_window_secs(self, limits: RateLimits) -> (u32, u64) {
        let limit = match self {
            RouteClass::Register => limits.register_per_min,
            RouteClass::Authenticated => limits.authenticated_per_min,
            RouteClass::Chat => limits.chat_per_min,
            RouteClass::Public => limits.public_per_min,
        };
        (limit, 60)
    }
}

pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_in_secs: u64,
    pub retry_after_secs: Option<u64>,
}

#[derive(Default)]
struct Bucket {
    timestamps: Vec<u64>,
}

pub struct RateLimiter {
    limits: RateLimits,
    buckets: RwLock<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(RateLimits::default())
    }

    pub fn with_limits(limits: RateLimits) -> Self {
        Self {
            limits,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// `key` identifies the caller (IP for `Register`/`Public`, agent id for
    /// `Authenticated`/`Chat`); `now_secs` is the caller-supplied wall clock.
    pub fn check(&self, class: RouteClass, key: &str, now_secs: u64) -> Decision {
        let (limit, window) = class.limit_and_window_secs(self.limits);
        let bucket_key = format!("{}:{:?}", key, window_discriminant(class));
        let mut buckets = self.buckets.write().expect("rate limiter poisoned");
        let bucket = buckets.entry(bucket_key).or_default();
        bucket
            .timestamps
            .retain(|ts| now_secs.saturating_sub(*ts) < window);

        if bucket.timestamps.len() as u32 >= limit {
            let oldest = bucket.timestamps.first().copied().unwrap_or(now_secs);
            let retry_after = window.saturating_sub(now_secs.saturating_sub(oldest));
            return Decision {
                allowed: false,
                limit,
                remaining: 0,
                reset_in_secs: retry_after,
                retry_after_secs: Some(retry_after),
            };
        }

        bucket.timestamps.push(now_secs);
        let remaining = limit - bucket.timestamps.len() as u32;
        Decision {
            allowed: true,
            limit,
            remaining,
            reset_in_secs: window,
            retry_after_secs: None,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn window_discriminant(class: RouteClass) -> u8 {
    match class {
        RouteClass::Register => 0,
        RouteClass::Authenticated => 1,
        RouteClass::Chat => 2,
        RouteClass::Public => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new();
        for i in 0..5 {
            let decision = limiter.check(RouteClass::Register, "1.2.3.4", i);
            assert!(decision.allowed);
        }
    }

    #[test]
    fn rejects_once_the_window_is_exhausted() {
        let limiter = RateLimiter::new();
        for i in 0..5 {
            limiter.check(RouteClass::Register, "1.2.3.4", i);
        }
        let decision = limiter.check(RouteClass::Register, "1.2.3.4", 5);
        assert!(!decision.allowed);
        assert!(decision.retry_after_secs.is_some());
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new();
        for i in 0..5 {
            limiter.check(RouteClass::Register, "1.2.3.4", i);
        }
        let decision = limiter.check(RouteClass::Register, "1.2.3.4", 65);
        assert!(decision.allowed);
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let limiter = RateLimiter::new();
        for i in 0..5 {
            limiter.check(RouteClass::Register, "1.2.3.4", i);
        }
        let decision = limiter.check(RouteClass::Register, "5.6.7.8", 0);
        assert!(decision.allowed);
    }
}
