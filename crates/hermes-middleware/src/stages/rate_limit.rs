//! Rate limiting stage.
//!
//! Limits how often each caller may invoke the targets the stage is bound
//! to. Runs on the receiving side, where the caller identity comes from the
//! payload.
//!
//! ## Algorithm
//!
//! Sliding window over two fixed windows: the previous window's count is
//! weighted by how much of the current window remains, so a burst at a
//! window boundary cannot double the effective limit.
//!
//! ## Example
//!
//! ```ignore
//! use hermes_middleware::stages::RateLimitMiddleware;
//! use std::time::Duration;
//!
//! let rate_limit = RateLimitMiddleware::builder()
//!     .limit(20)
//!     .window(Duration::from_secs(1))
//!     .per_caller()
//!     .build()
//!     .into_stage();
//! ```

use crate::middleware::{MiddlewareStage, StageCall};
use hermes_core::CallerIdentity;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Label of the rate limiting stage.
pub const LABEL: &str = "RateLimit";

/// Rate limiting stage.
#[derive(Debug, Clone)]
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    store: Arc<Mutex<RateLimitStore>>,
}

/// Configuration for the rate limiting stage.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Maximum number of calls allowed per window.
    limit: u64,
    /// Window length.
    window: Duration,
    /// How calls are grouped.
    key_extractor: KeyExtractor,
    /// Overrides the default rejection reason.
    error_message: Option<String>,
}

/// How to group calls for limiting.
#[derive(Clone, Default)]
pub enum KeyExtractor {
    /// One bucket per caller identity.
    #[default]
    Caller,
    /// One bucket shared by every caller.
    Global,
    /// Custom grouping. Returning `None` exempts the call.
    Custom(Arc<dyn Fn(&CallerIdentity) -> Option<String> + Send + Sync>),
}

impl std::fmt::Debug for KeyExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Caller => write!(f, "KeyExtractor::Caller"),
            Self::Global => write!(f, "KeyExtractor::Global"),
            Self::Custom(_) => write!(f, "KeyExtractor::Custom(<fn>)"),
        }
    }
}

impl std::fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("key_extractor", &self.key_extractor)
            .field("error_message", &self.error_message)
            .finish()
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(60),
            key_extractor: KeyExtractor::default(),
            error_message: None,
        }
    }
}

impl RateLimitConfig {
    /// Returns the call limit per window.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns the window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

#[derive(Debug, Default)]
struct RateLimitStore {
    windows: HashMap<String, WindowData>,
    last_sweep: Option<Instant>,
}

impl RateLimitStore {
    /// Drops buckets idle for two or more windows, at most once per window.
    ///
    /// Such a bucket carries no weight into the current window, so removing
    /// it does not change any later decision.
    fn sweep(&mut self, now: Instant, window: Duration) {
        if self
            .last_sweep
            .is_some_and(|last| now.duration_since(last) < window)
        {
            return;
        }
        self.last_sweep = Some(now);

        let horizon = window.saturating_mul(2);
        let before = self.windows.len();
        self.windows.retain(|_, data| now.duration_since(data.window_start) < horizon);

        let evicted = before - self.windows.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.windows.len(), "evicted idle rate limit buckets");
        }
    }
}

#[derive(Debug, Clone)]
struct WindowData {
    count: u64,
    window_start: Instant,
    prev_count: u64,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// The call is within the limit.
    Allowed {
        /// Calls left in the current window.
        remaining: u64,
    },
    /// The call exceeds the limit.
    Limited {
        /// Time until the current window ends.
        reset_in: Duration,
    },
}

/// Builder for [`RateLimitMiddleware`].
#[derive(Debug, Clone, Default)]
pub struct RateLimitBuilder {
    config: RateLimitConfig,
}

impl RateLimitBuilder {
    /// Creates a builder with default settings (100 calls per minute per
    /// caller).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of calls per window.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.config.limit = limit;
        self
    }

    /// Sets the window length.
    #[must_use]
    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    /// Sets the window length in seconds.
    #[must_use]
    pub fn window_secs(self, seconds: u64) -> Self {
        self.window(Duration::from_secs(seconds))
    }

    /// Limits each caller separately.
    #[must_use]
    pub fn per_caller(mut self) -> Self {
        self.config.key_extractor = KeyExtractor::Caller;
        self
    }

    /// Applies one limit across all callers.
    #[must_use]
    pub fn global(mut self) -> Self {
        self.config.key_extractor = KeyExtractor::Global;
        self
    }

    /// Groups calls with a custom function.
    #[must_use]
    pub fn key_extractor<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallerIdentity) -> Option<String> + Send + Sync + 'static,
    {
        self.config.key_extractor = KeyExtractor::Custom(Arc::new(f));
        self
    }

    /// Sets the rejection reason used when a caller is limited.
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.config.error_message = Some(message.into());
        self
    }

    /// Builds the stage.
    #[must_use]
    pub fn build(self) -> RateLimitMiddleware {
        RateLimitMiddleware {
            config: self.config,
            store: Arc::new(Mutex::new(RateLimitStore::default())),
        }
    }
}

impl RateLimitMiddleware {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> RateLimitBuilder {
        RateLimitBuilder::new()
    }

    /// 10 calls per second per caller.
    #[must_use]
    pub fn strict() -> Self {
        RateLimitBuilder::new().limit(10).window_secs(1).per_caller().build()
    }

    /// 100 calls per second per caller.
    #[must_use]
    pub fn lenient() -> Self {
        RateLimitBuilder::new().limit(100).window_secs(1).per_caller().build()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn extract_key(&self, caller: &CallerIdentity) -> Option<String> {
        match &self.config.key_extractor {
            KeyExtractor::Caller => Some(caller.log_id()),
            KeyExtractor::Global => Some("global".to_string()),
            KeyExtractor::Custom(f) => f(caller),
        }
    }

    /// Records a call for `key` and reports whether it is allowed.
    #[allow(clippy::significant_drop_tightening)]
    pub fn check(&self, key: &str) -> RateLimitResult {
        let mut store = self.store.lock();
        let now = Instant::now();
        let window = self.config.window;
        let limit = self.config.limit;

        store.sweep(now, window);

        let data = store
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowData {
                count: 0,
                window_start: now,
                prev_count: 0,
            });

        let elapsed = now.duration_since(data.window_start);
        if elapsed >= window {
            let windows_passed = elapsed.as_nanos() / window.as_nanos().max(1);
            data.prev_count = if windows_passed >= 2 { 0 } else { data.count };
            data.count = 0;
            data.window_start = now;
        }

        let progress = now.duration_since(data.window_start).as_secs_f64() / window.as_secs_f64();
        let prev_weight = (1.0 - progress).max(0.0);

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let weighted = data.count + (data.prev_count as f64 * prev_weight) as u64;

        if weighted >= limit {
            RateLimitResult::Limited {
                reset_in: window.saturating_sub(now.duration_since(data.window_start)),
            }
        } else {
            data.count += 1;
            RateLimitResult::Allowed {
                remaining: limit.saturating_sub(weighted + 1),
            }
        }
    }

    fn reason(&self, target: &str) -> String {
        self.config.error_message.clone().unwrap_or_else(|| {
            format!(
                "{target} rate limit exceeded: {} calls per {}s",
                self.config.limit,
                self.config.window.as_secs_f64()
            )
        })
    }

    /// Wraps this limiter as a receive-side middleware stage.
    #[must_use]
    pub fn into_stage(self) -> Arc<MiddlewareStage> {
        MiddlewareStage::builder(LABEL)
            .on_recv(move |call: StageCall| {
                let limiter = self.clone();
                async move {
                    let Some(key) = limiter.extract_key(&call.caller) else {
                        call.pass();
                        return;
                    };
                    match limiter.check(&key) {
                        RateLimitResult::Allowed { remaining } => {
                            debug!(caller = %key, remaining, "rate limit check passed");
                            call.pass();
                        }
                        RateLimitResult::Limited { reset_in } => {
                            debug!(caller = %key, ?reset_in, "rate limited");
                            call.reject(limiter.reason(call.target.diagnostic_label()));
                        }
                    }
                }
            })
            .build()
    }
}
