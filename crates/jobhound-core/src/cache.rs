//! Per-source result cache keyed by `(adapter, query, location)`.
//!
//! Best effort throughout: read failures, missing keys and undecodable
//! entries all look like a miss to the caller.

use std::time::Duration;

use crate::error::AppError;
use crate::models::{Job, compute_hash};
use crate::traits::KeyValueStore;

/// Default lifetime of a cached result set.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const KEY_PREFIX: &str = "jobhound";

/// Derive the store key for an adapter/query/location triple.
///
/// Case-insensitive and stable across processes:
/// `jobhound:<adapter>:<first 16 hex chars of sha256("adapter:query:location")>`.
pub fn cache_key(adapter: &str, query: &str, location: &str) -> String {
    let raw = format!("{adapter}:{query}:{location}").to_lowercase();
    let hash = compute_hash(&raw);
    format!("{KEY_PREFIX}:{}:{}", adapter.to_lowercase(), &hash[..16])
}

/// JSON-serialized job lists on top of any [`KeyValueStore`].
#[derive(Clone)]
pub struct ResultCache<S> {
    store: S,
    ttl: Duration,
}

impl<S: KeyValueStore> ResultCache<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Cached jobs for the triple, or `None` on any kind of miss.
    pub async fn get(&self, adapter: &str, query: &str, location: &str) -> Option<Vec<Job>> {
        let key = cache_key(adapter, query, location);
        let bytes = match self.store.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(%key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(jobs) => Some(jobs),
            Err(e) => {
                tracing::debug!(%key, error = %e, "Cache entry undecodable, treating as miss");
                None
            }
        }
    }

    /// Store jobs for the triple with the configured TTL.
    pub async fn set(
        &self,
        adapter: &str,
        query: &str,
        location: &str,
        jobs: &[Job],
    ) -> Result<(), AppError> {
        let key = cache_key(adapter, query, location);
        let bytes = serde_json::to_vec(jobs)?;
        self.store.set(&key, bytes, self.ttl).await
    }
}
