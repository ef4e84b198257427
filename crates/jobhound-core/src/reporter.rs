use std::time::Duration;

use crate::aggregate::SourceOutcome;

/// Events emitted by the aggregator for monitoring/logging.
#[derive(Debug, Clone)]
pub enum AggregateEvent<'a> {
    Started {
        query: &'a str,
        location: &'a str,
        sources: usize,
    },
    SourceFinished {
        source: &'a str,
        outcome: &'a SourceOutcome,
    },
    DeadlineExceeded {
        timeout: Duration,
        pending: usize,
    },
    Finished {
        merged: usize,
        unique: usize,
    },
}

/// Trait for receiving aggregation events (decoupled logging).
pub trait AggregateReporter: Send + Sync {
    fn report(&self, event: AggregateEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl AggregateReporter for TracingReporter {
    fn report(&self, event: AggregateEvent<'_>) {
        match event {
            AggregateEvent::Started {
                query,
                location,
                sources,
            } => {
                tracing::info!(%query, %location, %sources, "Searching sources");
            }
            AggregateEvent::SourceFinished { source, outcome } => match outcome {
                SourceOutcome::Cached(count) => {
                    tracing::info!(%source, %count, "Served from cache");
                }
                SourceOutcome::Fetched(count) => {
                    tracing::info!(%source, %count, "Source finished");
                }
                SourceOutcome::Failed(error) => {
                    tracing::warn!(%source, %error, "Source failed");
                }
                SourceOutcome::TimedOut => {
                    tracing::warn!(%source, "Source cut off by deadline");
                }
            },
            AggregateEvent::DeadlineExceeded { timeout, pending } => {
                tracing::warn!(
                    timeout_ms = %timeout.as_millis(),
                    %pending,
                    "Deadline reached, cancelling pending sources"
                );
            }
            AggregateEvent::Finished { merged, unique } => {
                tracing::info!(%merged, %unique, "Aggregation complete");
            }
        }
    }
}
