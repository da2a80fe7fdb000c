//! Per-client admission control.
//!
//! One token bucket per client identity (typically the peer address),
//! created lazily on first sight and evicted by a background sweep once the
//! client has been idle for longer than the configured threshold.

pub mod bucket;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use bucket::TokenBucket;

/// Default refill rate: 100 requests per second per client.
pub const DEFAULT_RATE_PER_SEC: f64 = 100.0;

/// Default burst capacity per client.
pub const DEFAULT_BURST: u32 = 200;

/// Buckets untouched for this long are evicted (3 minutes).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// How often the eviction sweep runs.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Invalid limiter settings.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Invalid rate limit settings: {0}")]
    Config(String),
}

/// Refill, burst and eviction parameters.
///
/// The defaults are a safety net sized not to disturb normal traffic, not a
/// strict quota.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub rate_per_sec: f64,
    pub burst: u32,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            rate_per_sec: DEFAULT_RATE_PER_SEC,
            burst: DEFAULT_BURST,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl RateLimitSettings {
    fn validate(&self) -> Result<(), RateLimitError> {
        if !(self.rate_per_sec.is_finite() && self.rate_per_sec > 0.0) {
            return Err(RateLimitError::Config("rate must be positive".into()));
        }
        if self.burst == 0 {
            return Err(RateLimitError::Config("burst must be at least 1".into()));
        }
        if self.idle_timeout.is_zero() || self.sweep_interval.is_zero() {
            return Err(RateLimitError::Config(
                "idle timeout and sweep interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Process-wide per-client rate limiter.
///
/// The map is sharded; a lookup or insert only locks the shard holding the
/// client, and the sweep takes the same shard locks.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Result<Self, RateLimitError> {
        settings.validate()?;
        Ok(Self {
            buckets: DashMap::new(),
            settings,
        })
    }

    pub fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    /// Admit one request from `client` if its bucket has a token.
    ///
    /// Never blocks; a refusal should become a "too many requests" response.
    pub fn allow(&self, client: &str) -> bool {
        let now = Instant::now();
        if let Some(mut bucket) = self.buckets.get_mut(client) {
            return bucket.try_acquire(now);
        }
        let RateLimitSettings {
            rate_per_sec,
            burst,
            ..
        } = self.settings;
        let mut bucket = self
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(rate_per_sec, burst, now));
        bucket.try_acquire(now)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop clients idle for longer than the threshold. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let idle = self.settings.idle_timeout;
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen()) <= idle);
        before.saturating_sub(self.buckets.len())
    }

    /// Spawn the periodic eviction sweep; it exits when `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.settings.sweep_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let evicted = limiter.sweep();
                        if evicted > 0 {
                            debug!(
                                evicted,
                                tracked = limiter.len(),
                                "evicted idle rate-limit buckets"
                            );
                        }
                    }
                }
            }
            debug!("rate-limit sweeper stopped");
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            buckets: DashMap::new(),
            settings: RateLimitSettings::default(),
        }
    }
}
