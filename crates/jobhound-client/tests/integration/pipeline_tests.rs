use std::sync::Arc;
use std::time::Duration;

use jobhound_client::{GupyAdapter, ReqwestTransport};
use jobhound_core::aggregate::{AggregateConfig, Aggregator, SourceOutcome};
use jobhound_core::cache::{DEFAULT_CACHE_TTL, ResultCache};
use jobhound_core::filter::{self, FilterCriteria};
use jobhound_core::guard::{GuardConfig, TransportGuard};
use jobhound_core::memory_store::MemoryStore;
use jobhound_core::traits::{NullStore, SourceAdapter};

use crate::common::{TestServer, start_server};

fn gupy(server: &TestServer) -> Arc<dyn SourceAdapter> {
    let guard = TransportGuard::new(
        ReqwestTransport::new().unwrap(),
        GuardConfig::new(Duration::ZERO, Duration::ZERO).unwrap(),
    );
    Arc::new(GupyAdapter::new(guard).with_base_url(server.url("/api/v1/jobs")))
}

#[tokio::test]
async fn gupy_search_over_real_http() {
    let server = start_server(0).await;
    let agg = Aggregator::<NullStore>::new(vec![gupy(&server)], AggregateConfig::default());

    let report = agg.run("rust", "").await;

    assert_eq!(report.sources[0].outcome, SourceOutcome::Fetched(2));
    assert_eq!(report.jobs[0].title, "Rust Backend Engineer");
    assert_eq!(report.jobs[0].work_model, "remoto");
    assert_eq!(report.jobs[1].job_type, "estagio");

    let queries = server.state.queries.lock().unwrap().clone();
    assert_eq!(queries[0].get("jobName").map(String::as_str), Some("rust"));
    assert_eq!(queries[0].get("limit").map(String::as_str), Some("20"));
}

#[tokio::test]
async fn location_and_filters_narrow_the_result() {
    let server = start_server(0).await;
    let agg = Aggregator::<NullStore>::new(vec![gupy(&server)], AggregateConfig::default());

    let report = agg.run("dados", "são paulo").await;
    assert_eq!(report.jobs.len(), 1);

    let remote_only = FilterCriteria::default().with_work_model("remoto");
    assert!(filter::apply(report.jobs, &remote_only).is_empty());
}

#[tokio::test]
async fn second_run_is_served_from_cache() {
    let server = start_server(0).await;
    let cache = ResultCache::new(MemoryStore::default(), DEFAULT_CACHE_TTL);
    let agg = Aggregator::with_cache(vec![gupy(&server)], cache, AggregateConfig::default());

    let first = agg.run("rust", "").await;
    agg.flush_cache_writes().await;
    let second = agg.run("RUST", "").await;

    assert_eq!(first.sources[0].outcome, SourceOutcome::Fetched(2));
    assert_eq!(second.sources[0].outcome, SourceOutcome::Cached(2));
    assert_eq!(first.jobs, second.jobs);
    assert_eq!(server.state.hits(), 1);
}

#[tokio::test]
async fn unreachable_source_is_reported_not_fatal() {
    let server = start_server(0).await;
    let guard = TransportGuard::new(
        ReqwestTransport::new().unwrap(),
        GuardConfig::new(Duration::ZERO, Duration::ZERO).unwrap(),
    );
    let dead: Arc<dyn SourceAdapter> =
        Arc::new(GupyAdapter::new(guard).with_base_url("http://127.0.0.1:9/api/v1/jobs"));

    let agg = Aggregator::<NullStore>::new(
        vec![dead, gupy(&server)],
        AggregateConfig::default(),
    );
    let report = agg.run("rust", "").await;

    assert!(matches!(report.sources[0].outcome, SourceOutcome::Failed(_)));
    assert_eq!(report.jobs.len(), 2);
}
