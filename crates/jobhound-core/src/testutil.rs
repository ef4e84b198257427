//! Test utilities: mock implementations of the core capabilities.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::http::{HttpRequest, HttpResponse};
use crate::models::Job;
use crate::traits::{HttpTransport, KeyValueStore, SourceAdapter};

/// Build a job with the given source and URL, everything else defaulted.
pub fn job(source: &str, title: &str, url: &str) -> Job {
    Job {
        title: title.to_string(),
        company: "Acme".to_string(),
        url: url.to_string(),
        source: source.to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// A request as seen by the transport, with its dispatch time.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub request: HttpRequest,
    pub at: Instant,
}

/// Mock transport that replays a queue of responses and records every send.
#[derive(Clone)]
pub struct MockTransport {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns `200 ok`.
    responses: Arc<Mutex<Vec<Result<HttpResponse, AppError>>>>,
    sent: Arc<Mutex<Vec<SentRequest>>>,
}

impl MockTransport {
    pub fn new(body: &str) -> Self {
        Self::with_responses(vec![Ok(HttpResponse::ok(body))])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<HttpResponse, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl HttpTransport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, AppError> {
        self.sent.lock().unwrap().push(SentRequest {
            request: request.clone(),
            at: Instant::now(),
        });
        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                None
            } else {
                Some(responses.remove(0))
            }
        };
        next.unwrap_or_else(|| Ok(HttpResponse::ok("ok")))
    }
}

// ---------------------------------------------------------------------------
// MockAdapter
// ---------------------------------------------------------------------------

/// Mock source adapter returning a fixed result after an optional delay.
#[derive(Clone)]
pub struct MockAdapter {
    name: String,
    result: Arc<Mutex<Result<Vec<Job>, String>>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    ignore_cancel: bool,
}

impl MockAdapter {
    pub fn new(name: &str, jobs: Vec<Job>) -> Self {
        Self {
            name: name.to_string(),
            result: Arc::new(Mutex::new(Ok(jobs))),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            ignore_cancel: false,
        }
    }

    /// Adapter whose every search fails with a parse error.
    pub fn failing(name: &str, message: &str) -> Self {
        let adapter = Self::new(name, Vec::new());
        *adapter.result.lock().unwrap() = Err(message.to_string());
        adapter
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Keep sleeping through cancellation, like a badly behaved adapter.
    pub fn ignoring_cancel(mut self) -> Self {
        self.ignore_cancel = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        cancel: &CancellationToken,
        _query: &str,
        _location: &str,
    ) -> Result<Vec<Job>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            if self.ignore_cancel {
                tokio::time::sleep(self.delay).await;
            } else {
                tokio::select! {
                    () = cancel.cancelled() => return Err(AppError::Cancelled),
                    () = tokio::time::sleep(self.delay) => {}
                }
            }
        }
        self.result
            .lock()
            .unwrap()
            .clone()
            .map_err(|message| AppError::parse(&self.name, message))
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory key-value store that records writes and can be told to fail.
///
/// Expiry is not simulated; the stored TTL is recorded for assertions.
#[derive(Clone, Default)]
pub struct MockStore {
    entries: Arc<Mutex<HashMap<String, (Vec<u8>, Duration)>>>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MockStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Store raw bytes directly, bypassing serialization.
    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_vec(), Duration::from_secs(3600)));
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MockStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        if self.fail_reads {
            return Err(AppError::CacheError("connection reset".into()));
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(bytes, _)| bytes.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::CacheError("read-only replica".into()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, ttl));
        Ok(())
    }
}
