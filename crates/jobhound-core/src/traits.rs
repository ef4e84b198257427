use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::http::{HttpRequest, HttpResponse};
use crate::models::Job;

/// Sends a single HTTP request over the wire.
///
/// Implementations do no pacing or retrying of their own; that is the
/// job of the [`TransportGuard`](crate::guard::TransportGuard) wrapping them.
pub trait HttpTransport: Send + Sync + Clone {
    fn send(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, AppError>> + Send;
}

/// Byte store with per-entry expiry, the backing capability of the
/// [`ResultCache`](crate::cache::ResultCache).
pub trait KeyValueStore: Send + Sync + Clone + 'static {
    /// Returns `Ok(None)` for a missing or expired key.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, AppError>> + Send;

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A no-op store used when caching is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl KeyValueStore for NullStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), AppError> {
        Ok(())
    }
}

/// One job-site integration.
///
/// Adapters are held as trait objects in an ordered registry, so this
/// trait is object safe.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier. Used as the `source` tag on jobs and as part of
    /// the cache key.
    fn name(&self) -> &str;

    /// Query the site and return normalised jobs.
    ///
    /// Must return promptly with [`AppError::Cancelled`] once `cancel`
    /// fires. Malformed responses are errors, never panics.
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        location: &str,
    ) -> Result<Vec<Job>, AppError>;
}

/// Receives the final deduplicated, filtered job list.
#[async_trait]
pub trait ResultWriter: Send + Sync {
    async fn write_jobs(&self, jobs: &[Job]) -> Result<(), AppError>;
}
