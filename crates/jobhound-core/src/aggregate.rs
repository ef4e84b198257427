//! Fan a query out to every source adapter, then merge and deduplicate.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::cache::ResultCache;
use crate::error::AppError;
use crate::models::Job;
use crate::reporter::{AggregateEvent, AggregateReporter, TracingReporter};
use crate::traits::{KeyValueStore, SourceAdapter};

/// Configuration for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Overall deadline shared by every source.
    pub timeout: Duration,
}

impl AggregateConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// What happened to a single source during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Served from the cache without touching the network.
    Cached(usize),
    /// Searched successfully.
    Fetched(usize),
    /// Search failed; the source contributed nothing.
    Failed(String),
    /// The deadline fired before the source finished.
    TimedOut,
}

impl SourceOutcome {
    pub fn job_count(&self) -> usize {
        match self {
            SourceOutcome::Cached(n) | SourceOutcome::Fetched(n) => *n,
            SourceOutcome::Failed(_) | SourceOutcome::TimedOut => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SourceOutcome::Failed(_) | SourceOutcome::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
}

/// Result of an aggregation run. Never an error: failed sources are
/// listed in `sources` and simply contribute no jobs.
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    /// Deduplicated jobs in arrival order.
    pub jobs: Vec<Job>,
    /// One entry per adapter, in registry order.
    pub sources: Vec<SourceReport>,
    /// Jobs dropped as duplicates.
    pub duplicates: usize,
}

impl AggregateReport {
    pub fn failures(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.outcome.is_failure())
    }
}

/// Runs one task per adapter under a shared deadline, consulting the
/// cache first when one is configured.
pub struct Aggregator<S> {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    cache: Option<ResultCache<S>>,
    config: AggregateConfig,
    cache_writes: TaskTracker,
}

impl<S: KeyValueStore> Aggregator<S> {
    /// Create an aggregator without caching.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, config: AggregateConfig) -> Self {
        Self {
            adapters,
            cache: None,
            config,
            cache_writes: TaskTracker::new(),
        }
    }

    /// Create an aggregator backed by a result cache.
    pub fn with_cache(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        cache: ResultCache<S>,
        config: AggregateConfig,
    ) -> Self {
        Self {
            cache: Some(cache),
            ..Self::new(adapters, config)
        }
    }

    /// Search every source and return the deduplicated result.
    pub async fn run(&self, query: &str, location: &str) -> AggregateReport {
        self.run_with_reporter(query, location, &TracingReporter)
            .await
    }

    /// Same as [`run`](Self::run), reporting progress to `reporter`.
    ///
    /// 1. Spawn one task per adapter (cache lookup, then search)
    /// 2. Join tasks as they finish, cancelling the rest at the deadline
    /// 3. Merge in completion order and deduplicate by fingerprint
    pub async fn run_with_reporter<R: AggregateReporter>(
        &self,
        query: &str,
        location: &str,
        reporter: &R,
    ) -> AggregateReport {
        reporter.report(AggregateEvent::Started {
            query,
            location,
            sources: self.adapters.len(),
        });

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        for (index, adapter) in self.adapters.iter().enumerate() {
            let search = search_source(
                Arc::clone(adapter),
                self.cache.clone(),
                self.cache_writes.clone(),
                cancel.clone(),
                query.to_string(),
                location.to_string(),
            );
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let (jobs, outcome) = tokio::select! {
                    biased;
                    () = cancel.cancelled() => (Vec::new(), SourceOutcome::TimedOut),
                    done = search => done,
                };
                (index, jobs, outcome)
            });
        }

        let mut outcomes: Vec<Option<SourceOutcome>> = vec![None; self.adapters.len()];
        let mut merged = Vec::new();
        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((index, jobs, outcome)) => {
                            reporter.report(AggregateEvent::SourceFinished {
                                source: self.adapters[index].name(),
                                outcome: &outcome,
                            });
                            merged.extend(jobs);
                            outcomes[index] = Some(outcome);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Source task aborted");
                        }
                    }
                }
                () = &mut deadline, if !cancel.is_cancelled() => {
                    reporter.report(AggregateEvent::DeadlineExceeded {
                        timeout: self.config.timeout,
                        pending: tasks.len(),
                    });
                    cancel.cancel();
                }
            }
        }

        let sources = self
            .adapters
            .iter()
            .zip(outcomes)
            .map(|(adapter, outcome)| SourceReport {
                source: adapter.name().to_string(),
                outcome: outcome
                    .unwrap_or_else(|| SourceOutcome::Failed("source task panicked".into())),
            })
            .collect();

        let merged_len = merged.len();
        let jobs = dedup(merged);
        reporter.report(AggregateEvent::Finished {
            merged: merged_len,
            unique: jobs.len(),
        });

        AggregateReport {
            duplicates: merged_len - jobs.len(),
            jobs,
            sources,
        }
    }

    /// Wait for background cache writes started by previous runs.
    pub async fn flush_cache_writes(&self) {
        self.cache_writes.close();
        self.cache_writes.wait().await;
        self.cache_writes.reopen();
    }
}

/// Cache lookup, then search, for a single adapter.
async fn search_source<S: KeyValueStore>(
    adapter: Arc<dyn SourceAdapter>,
    cache: Option<ResultCache<S>>,
    cache_writes: TaskTracker,
    cancel: CancellationToken,
    query: String,
    location: String,
) -> (Vec<Job>, SourceOutcome) {
    let name = adapter.name().to_string();

    if let Some(cache) = &cache {
        if let Some(jobs) = cache.get(&name, &query, &location).await {
            let count = jobs.len();
            return (jobs, SourceOutcome::Cached(count));
        }
    }

    tracing::debug!(source = %name, "Searching");
    match adapter.search(&cancel, &query, &location).await {
        Ok(jobs) => {
            if let Some(cache) = cache {
                if !jobs.is_empty() {
                    let snapshot = jobs.clone();
                    cache_writes.spawn(async move {
                        if let Err(e) = cache.set(&name, &query, &location, &snapshot).await {
                            tracing::warn!(source = %name, error = %e, "Failed to cache results");
                        }
                    });
                }
            }
            let count = jobs.len();
            (jobs, SourceOutcome::Fetched(count))
        }
        Err(AppError::Cancelled) => (Vec::new(), SourceOutcome::TimedOut),
        Err(e) => (Vec::new(), SourceOutcome::Failed(e.to_string())),
    }
}

/// Keep the first job for each fingerprint, preserving order.
pub fn dedup(jobs: Vec<Job>) -> Vec<Job> {
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|job| seen.insert(job.fingerprint()))
        .collect()
}
