//! Rate Limiting Infrastructure
//!
//! Token-bucket admission control keyed by caller identity. Buckets refill
//! continuously at a configured rate up to a burst capacity; idle buckets
//! are swept from the map on the hot path, at most once per TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default idle-bucket eviction TTL
pub const BUCKET_TTL: Duration = Duration::from_secs(600);

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Steady-state refill rate in tokens per second
    pub rate: f64,
    /// Maximum bucket capacity
    pub burst: f64,
    /// Buckets idle longer than this are evicted
    pub ttl: Duration,
}

impl RateLimitConfig {
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate,
            burst: f64::from(burst),
            ttl: BUCKET_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Whole tokens left in the bucket after this decision
    pub remaining: u32,
    /// How long until one full token is available (zero when allowed)
    pub retry_after: Duration,
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
struct LimiterInner {
    buckets: HashMap<String, TokenBucket>,
    last_sweep: Instant,
}

/// Per-key token-bucket limiter
///
/// Owns its key→bucket map behind a single lock; the sweep check is a single
/// timestamp comparison, so it runs inline on the request path instead of a
/// separate timer task.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    config: RateLimitConfig,
    inner: Mutex<LimiterInner>,
}

impl TokenBucketLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(LimiterInner {
                buckets: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Admit or deny one operation for `key`
    pub fn allow(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        // periodic sweep of stale buckets
        if now.duration_since(inner.last_sweep) > self.config.ttl {
            let ttl = self.config.ttl;
            inner
                .buckets
                .retain(|_, b| now.duration_since(b.last_refill) <= ttl);
            inner.last_sweep = now;
        }

        let bucket = inner
            .buckets
            .entry(key.to_string())
            .or_insert(TokenBucket {
                tokens: self.config.burst,
                last_refill: now,
            });

        // refill
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.rate).min(self.config.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateLimitDecision {
                allowed: true,
                remaining: bucket.tokens as u32,
                retry_after: Duration::ZERO,
            }
        } else {
            let missing = 1.0 - bucket.tokens;
            RateLimitDecision {
                allowed: false,
                remaining: bucket.tokens as u32,
                retry_after: Duration::from_secs_f64(missing / self.config.rate),
            }
        }
    }
}
