pub mod aggregate;
pub mod cache;
pub mod error;
pub mod filter;
pub mod guard;
pub mod http;
pub mod identity;
pub mod memory_store;
pub mod models;
pub mod reporter;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use aggregate::{AggregateConfig, AggregateReport, Aggregator, SourceOutcome, SourceReport};
pub use cache::{DEFAULT_CACHE_TTL, ResultCache, cache_key};
pub use error::AppError;
pub use filter::FilterCriteria;
pub use guard::{GuardConfig, RetryPolicy, TransportGuard};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use memory_store::MemoryStore;
pub use models::{Job, compute_hash};
pub use reporter::{AggregateEvent, AggregateReporter, TracingReporter};
pub use traits::{HttpTransport, KeyValueStore, NullStore, ResultWriter, SourceAdapter};
