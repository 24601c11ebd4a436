//! Minimal HTTP server speaking the data layer's `get_value` / `get_keys` RPCs.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default)]
struct StubData {
    values: HashMap<(String, String), Value>,
    listings: HashMap<String, Vec<String>>,
    last_authorization: Option<String>,
}

#[derive(Default)]
struct StubState {
    data: Mutex<StubData>,
    requests: AtomicUsize,
}

impl StubState {
    fn record(&self, headers: &HeaderMap) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.data.lock().last_authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }
}

pub struct RpcStub {
    url: String,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl RpcStub {
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/get_value", post(get_value))
            .route("/get_keys", post(get_keys))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { url, state, task }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn insert_value(&self, store: &str, key: &str, value: Value) {
        self.state
            .data
            .lock()
            .values
            .insert((store.to_string(), key.to_string()), value);
    }

    pub fn insert_listing(&self, store: &str, keys: &[&str]) {
        self.state.data.lock().listings.insert(
            store.to_string(),
            keys.iter().map(|k| k.to_string()).collect(),
        );
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.data.lock().last_authorization.clone()
    }
}

impl Drop for RpcStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn get_value(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Json<Value> {
    state.record(&headers);

    let id = request["id"].as_str().unwrap_or_default().to_string();
    let key = request["key"].as_str().unwrap_or_default().to_string();
    let body = match state.data.lock().values.get(&(id, key)) {
        Some(value) => json!({"success": true, "value": value}),
        None => json!({"success": false, "error": "Key not found in store"}),
    };
    Json(body)
}

async fn get_keys(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.record(&headers);

    let id = request["id"].as_str().unwrap_or_default();
    match state.data.lock().listings.get(id) {
        Some(keys) => (StatusCode::OK, Json(json!({"success": true, "keys": keys}))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "unknown store"})),
        ),
    }
}
