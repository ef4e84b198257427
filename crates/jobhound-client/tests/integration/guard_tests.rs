use std::time::{Duration, Instant};

use jobhound_client::{ReqwestTransport, TransportOptions};
use jobhound_core::error::AppError;
use jobhound_core::guard::{GuardConfig, RetryPolicy, TransportGuard};
use jobhound_core::http::HttpRequest;
use jobhound_core::identity::USER_AGENTS;
use tokio_util::sync::CancellationToken;

use crate::common::start_server;

fn guard(delay: Duration, retry: RetryPolicy) -> TransportGuard<ReqwestTransport> {
    let config = GuardConfig::new(delay, delay).unwrap().with_retry(retry);
    TransportGuard::new(ReqwestTransport::new().unwrap(), config)
}

#[tokio::test]
async fn throttled_requests_are_retried_until_ok() {
    let server = start_server(2).await;
    let guard = guard(
        Duration::ZERO,
        RetryPolicy::new(3).with_backoff_base(Duration::from_millis(50)),
    );

    let start = Instant::now();
    let response = guard
        .execute(HttpRequest::get(server.url("/flaky")), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "finally");
    assert_eq!(server.state.hits(), 3);
    // 50ms + 100ms of backoff.
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn exhausted_retries_surface_the_throttle_status() {
    let server = start_server(10).await;
    let guard = guard(
        Duration::ZERO,
        RetryPolicy::new(2).with_backoff_base(Duration::from_millis(10)),
    );

    let response = guard
        .execute(HttpRequest::get(server.url("/flaky")), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(server.state.hits(), 2);
}

#[tokio::test]
async fn same_host_requests_are_spaced() {
    let server = start_server(0).await;
    let guard = guard(Duration::from_millis(200), RetryPolicy::default());
    let cancel = CancellationToken::new();

    let start = Instant::now();
    for _ in 0..3 {
        guard
            .execute(HttpRequest::get(server.url("/flaky")), &cancel)
            .await
            .unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(400));
    assert_eq!(server.state.hits(), 3);
}

#[tokio::test]
async fn every_request_carries_a_pooled_user_agent() {
    let server = start_server(0).await;
    let guard = guard(Duration::ZERO, RetryPolicy::default());
    let cancel = CancellationToken::new();

    for _ in 0..5 {
        guard
            .execute(HttpRequest::get(server.url("/flaky")), &cancel)
            .await
            .unwrap();
    }

    let agents = server.state.user_agents.lock().unwrap().clone();
    assert_eq!(agents.len(), 5);
    assert!(agents.iter().all(|ua| USER_AGENTS.contains(&ua.as_str())));
}

#[tokio::test]
async fn slow_server_hits_transport_timeout() {
    let server = start_server(0).await;
    let options = TransportOptions::default().with_timeout(Duration::from_millis(200));
    let guard = TransportGuard::new(
        ReqwestTransport::with_options(&options).unwrap(),
        GuardConfig::new(Duration::ZERO, Duration::ZERO).unwrap(),
    );

    let err = guard
        .execute(HttpRequest::get(server.url("/slow")), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn cancellation_aborts_an_in_flight_request() {
    let server = start_server(0).await;
    let guard = guard(Duration::ZERO, RetryPolicy::default());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = guard
        .execute(HttpRequest::get(server.url("/slow")), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(2));
}
