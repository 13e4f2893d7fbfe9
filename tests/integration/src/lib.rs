//! In-process stand-in for the data store backend, served over real HTTP.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use datalayer_client::testing::{coin_spend, descriptor};
use datalayer_common::api::SECRET_HEADER;
use datalayer_common::datastore::DataStoreDescriptor;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub mod harness;

/// One request as the backend received it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub path: String,
    pub body: Value,
    pub secret: Option<String>,
}

struct BackendState {
    calls: Vec<Recorded>,
    confirmations: VecDeque<bool>,
    broadcast_error: Option<String>,
    failing_path: Option<String>,
    server_key: Option<String>,
    mint_info: DataStoreDescriptor,
    spend_info: DataStoreDescriptor,
    sync_info: DataStoreDescriptor,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock backend listening on an ephemeral localhost port.
///
/// Every request is recorded. Unscripted confirmation polls answer
/// `confirmed: false`.
pub struct MockBackend {
    pub url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            calls: Vec::new(),
            confirmations: VecDeque::new(),
            broadcast_error: None,
            failing_path: None,
            server_key: Some("a0b1c2d3e4f5".to_string()),
            mint_info: descriptor("minted"),
            spend_info: descriptor("updated"),
            sync_info: descriptor("synced"),
        }));

        let app = Router::new()
            .route("/info", get(info))
            .route("/mint", post(mint))
            .route("/sync", post(sync))
            .route("/update-metadata", post(spend))
            .route("/update-ownership", post(spend))
            .route("/oracle", post(spend))
            .route("/melt", post(melt))
            .route("/add-fee", post(add_fee))
            .route("/sing-and-send", post(sign_and_send))
            .route("/coin-confirmed", post(coin_confirmed))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend crashed");
        });

        Self {
            url: format!("http://{addr}"),
            state,
            server,
        }
    }

    pub fn push_confirmations(&self, script: impl IntoIterator<Item = bool>) {
        lock(&self.state).confirmations.extend(script);
    }

    pub fn set_broadcast_error(&self, err: Option<&str>) {
        lock(&self.state).broadcast_error = err.map(str::to_string);
    }

    /// Answer 500 on `path` until cleared.
    pub fn fail_path(&self, path: Option<&str>) {
        lock(&self.state).failing_path = path.map(str::to_string);
    }

    pub fn mint_info(&self) -> DataStoreDescriptor {
        lock(&self.state).mint_info.clone()
    }

    pub fn spend_info(&self) -> DataStoreDescriptor {
        lock(&self.state).spend_info.clone()
    }

    pub fn sync_info(&self) -> DataStoreDescriptor {
        lock(&self.state).sync_info.clone()
    }

    pub fn calls(&self) -> Vec<Recorded> {
        lock(&self.state).calls.clone()
    }

    /// Request paths in arrival order.
    pub fn paths(&self) -> Vec<String> {
        lock(&self.state).calls.iter().map(|c| c.path.clone()).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        lock(&self.state).calls.iter().filter(|c| c.path == path).count()
    }

    pub fn last_body(&self, path: &str) -> Option<Value> {
        lock(&self.state)
            .calls
            .iter()
            .rev()
            .find(|c| c.path == path)
            .map(|c| c.body.clone())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// Record the request. Returns an error response if the path is scripted to fail.
fn record(state: &Shared, uri: &Uri, headers: &HeaderMap, body: Value) -> Option<Response> {
    let mut st = lock(state);
    let path = uri.path().to_string();
    let secret = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let fail = st.failing_path.as_deref() == Some(path.as_str());
    st.calls.push(Recorded { path, body, secret });
    fail.then(|| (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded").into_response())
}

async fn info(State(state): State<Shared>, uri: Uri, headers: HeaderMap) -> Response {
    if let Some(err) = record(&state, &uri, &headers, Value::Null) {
        return err;
    }
    let key = lock(&state).server_key.clone();
    Json(json!({ "pk": key.map(|k| format!("0x{k}")), "network": "testnet11" })).into_response()
}

async fn mint(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(err) = record(&state, &uri, &headers, body) {
        return err;
    }
    let new_info = lock(&state).mint_info.clone();
    Json(json!({
        "new_info": new_info,
        "coin_spends": [coin_spend("m1"), coin_spend("m2")],
    }))
    .into_response()
}

async fn sync(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(err) = record(&state, &uri, &headers, body) {
        return err;
    }
    let info = lock(&state).sync_info.clone();
    Json(json!({ "info": info })).into_response()
}

async fn spend(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(err) = record(&state, &uri, &headers, body) {
        return err;
    }
    let new_info = lock(&state).spend_info.clone();
    Json(json!({
        "coin_spends": [coin_spend("s1"), coin_spend("s2")],
        "new_info": new_info,
    }))
    .into_response()
}

async fn melt(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(err) = record(&state, &uri, &headers, body) {
        return err;
    }
    Json(json!({ "coin_spends": [coin_spend("x1")] })).into_response()
}

async fn add_fee(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(err) = record(&state, &uri, &headers, body) {
        return err;
    }
    Json(json!({ "coin_spends": [coin_spend("fee")] })).into_response()
}

async fn sign_and_send(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(err) = record(&state, &uri, &headers, body) {
        return err;
    }
    let err = lock(&state).broadcast_error.clone().unwrap_or_default();
    Json(json!({ "err": err })).into_response()
}

async fn coin_confirmed(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(err) = record(&state, &uri, &headers, body) {
        return err;
    }
    let confirmed = lock(&state).confirmations.pop_front().unwrap_or(false);
    Json(json!({ "confirmed": confirmed })).into_response()
}
