use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;

pub const GUPY_BODY: &str = r#"{
    "data": [
        {
            "id": 10,
            "name": "Rust Backend Engineer",
            "careerPageName": "Acme",
            "jobUrl": "https://acme.gupy.io/jobs/10",
            "type": "vacancy_type_effective",
            "city": "Curitiba",
            "state": "Paraná",
            "country": "Brasil",
            "workplaceType": "remote",
            "isRemoteWork": true,
            "publishedDate": "2024-06-01T09:00:00Z"
        },
        {
            "id": 11,
            "name": "Estágio em Dados",
            "careerPageName": "Beta",
            "jobUrl": "https://beta.gupy.io/jobs/11",
            "type": "vacancy_type_internship",
            "city": "São Paulo",
            "state": "São Paulo",
            "country": "Brasil",
            "workplaceType": "on-site",
            "isRemoteWork": false,
            "publishedDate": "2024-06-02T09:00:00Z"
        }
    ]
}"#;

/// Requests seen by the fake job site.
#[derive(Default)]
pub struct ServerState {
    pub hits: AtomicUsize,
    /// How many `/flaky` requests still answer 429.
    pub throttle_remaining: AtomicUsize,
    pub user_agents: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<HashMap<String, String>>>,
}

impl ServerState {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn record(&self, headers: &HeaderMap, query: HashMap<String, String>) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let ua = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.user_agents.lock().unwrap().push(ua);
        self.queries.lock().unwrap().push(query);
    }
}

pub struct TestServer {
    pub base_url: String,
    pub state: Arc<ServerState>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn gupy_jobs(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.record(&headers, query);
    ([("content-type", "application/json")], GUPY_BODY)
}

async fn flaky(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.record(&headers, query);
    let throttled = state
        .throttle_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if throttled {
        (StatusCode::TOO_MANY_REQUESTS, "slow down")
    } else {
        (StatusCode::OK, "finally")
    }
}

async fn slow(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> impl IntoResponse {
    state.record(&headers, HashMap::new());
    tokio::time::sleep(Duration::from_secs(5)).await;
    "too late"
}

/// Start the fake job site on an ephemeral port.
pub async fn start_server(throttle_first: usize) -> TestServer {
    let state = Arc::new(ServerState::default());
    state
        .throttle_remaining
        .store(throttle_first, Ordering::SeqCst);

    let app = Router::new()
        .route("/api/v1/jobs", get(gupy_jobs))
        .route("/flaky", get(flaky))
        .route("/slow", get(slow))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    TestServer {
        base_url: format!("http://{addr}"),
        state,
    }
}
