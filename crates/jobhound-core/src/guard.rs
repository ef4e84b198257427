//! Request guard for polite, low-profile fetching.
//!
//! Wraps any [`HttpTransport`] and, for every request:
//!
//! 1. stamps a random browser identity (see [`crate::identity`]),
//! 2. spaces requests to the same host by a random delay in
//!    `[min_delay, max_delay)`,
//! 3. retries 429/503 answers with exponential backoff.
//!
//! Every wait is cut short by the caller's [`CancellationToken`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use jobhound_core::guard::{GuardConfig, RetryPolicy, TransportGuard};
//! use jobhound_core::http::HttpRequest;
//! # use jobhound_core::traits::HttpTransport;
//! # use jobhound_core::http::HttpResponse;
//! # #[derive(Clone)] struct MyTransport;
//! # impl HttpTransport for MyTransport {
//! #     async fn send(&self, _: &HttpRequest) -> Result<HttpResponse, jobhound_core::AppError> { todo!() }
//! # }
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GuardConfig::new(Duration::from_secs(2), Duration::from_secs(5))?
//!     .with_retry(RetryPolicy::new(3));
//! let guard = TransportGuard::new(MyTransport, config);
//! let cancel = tokio_util::sync::CancellationToken::new();
//! let response = guard.execute(HttpRequest::get("https://example.com"), &cancel).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::http::{HttpRequest, HttpResponse};
use crate::identity;
use crate::traits::HttpTransport;

/// Retry schedule for throttling answers (429 and 503 only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Wait after the first throttled attempt; doubles on each retry.
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// `backoff_base * 2^attempt`, with `attempt` starting at 0.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    pub fn is_throttled(status: u16) -> bool {
        status == 429 || status == 503
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, waiting 2s then 4s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

/// Longest per-host spacing [`GuardConfig::new`] accepts.
pub const MAX_PACING_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for the [`TransportGuard`].
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Lower bound of the per-host spacing.
    pub min_delay: Duration,
    /// Upper bound (exclusive) of the per-host spacing.
    pub max_delay: Duration,
    pub retry: RetryPolicy,
}

impl GuardConfig {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Result<Self, AppError> {
        if max_delay > MAX_PACING_DELAY {
            return Err(AppError::ConfigError(format!(
                "max delay ({max_delay:?}) must not exceed {MAX_PACING_DELAY:?}"
            )));
        }
        if max_delay < min_delay {
            return Err(AppError::ConfigError(format!(
                "max delay ({max_delay:?}) must not be lower than min delay ({min_delay:?})"
            )));
        }
        Ok(Self {
            min_delay,
            max_delay,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pick the spacing for one request, uniform in `[min_delay, max_delay)`.
    fn pacing_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..self.max_delay)
    }
}

impl Default for GuardConfig {
    /// 2-5s per-host spacing, default retry policy.
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

/// Shared HTTP entry point for all source adapters.
///
/// Tracks the dispatch time of the last request per host. Clones share
/// the same host map, so one guard built at startup paces every adapter.
#[derive(Clone)]
pub struct TransportGuard<T> {
    inner: T,
    config: GuardConfig,
    /// Last (or next reserved) dispatch time per host key.
    last_request: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<T: HttpTransport> TransportGuard<T> {
    pub fn new(inner: T, config: GuardConfig) -> Self {
        Self {
            inner,
            config,
            last_request: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Execute a request with identity rotation, host pacing and
    /// throttling retries.
    ///
    /// Transport failures are returned immediately. A 429/503 that
    /// survives every attempt is returned as a response, so callers must
    /// still check the status.
    pub async fn execute(
        &self,
        mut request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, AppError> {
        identity::apply(&mut request);
        let host = request.host_key()?;

        let wait = self.reserve_slot(&host).await;
        if !wait.is_zero() {
            tracing::debug!(host = %host, wait_ms = %wait.as_millis(), "Pacing request");
            sleep_or_cancel(wait, cancel).await?;
        }

        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            self.stamp_dispatch(&host).await;

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AppError::Cancelled),
                result = self.inner.send(&request) => result?,
            };

            if !RetryPolicy::is_throttled(response.status) {
                return Ok(response);
            }
            if attempt + 1 >= max_attempts {
                tracing::warn!(
                    host = %host,
                    status = response.status,
                    attempts = max_attempts,
                    "Still throttled after all attempts"
                );
                return Ok(response);
            }

            let backoff = self.config.retry.backoff_for(attempt);
            tracing::warn!(
                host = %host,
                status = response.status,
                backoff_ms = %backoff.as_millis(),
                attempt = attempt + 1,
                max_attempts,
                "Throttled, backing off"
            );
            drop(response);
            sleep_or_cancel(backoff, cancel).await?;
            attempt += 1;
        }
    }

    /// Reserve the next dispatch slot for `host` and return how long the
    /// caller must wait for it.
    ///
    /// Read and update happen under one lock acquisition, and the stored
    /// time is the reserved slot, so concurrent callers queue up behind
    /// each other instead of computing their wait from the same value.
    async fn reserve_slot(&self, host: &str) -> Duration {
        let mut map = self.last_request.lock().await;
        let now = Instant::now();
        let wait = match map.get(host) {
            Some(&last) => {
                let delay = self.config.pacing_delay();
                match last.checked_add(delay) {
                    Some(slot) => slot.saturating_duration_since(now),
                    None => delay,
                }
            }
            None => Duration::ZERO,
        };
        // An unrepresentable slot keeps the old stamp; the sleep itself is clamped by tokio.
        if let Some(slot) = now.checked_add(wait) {
            map.insert(host.to_string(), slot);
        }
        wait
    }

    /// Re-stamp the host at the moment a request actually goes out.
    /// Never moves a later reservation backwards.
    async fn stamp_dispatch(&self, host: &str) {
        let mut map = self.last_request.lock().await;
        let now = Instant::now();
        let entry = map.entry(host.to_string()).or_insert(now);
        if *entry < now {
            *entry = now;
        }
    }
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<(), AppError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AppError::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}
