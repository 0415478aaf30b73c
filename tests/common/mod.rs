//! Shared mock servers for integration tests.
#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Clone, Default)]
pub struct KvState {
    entries: Arc<Mutex<HashMap<String, (Value, u64)>>>,
}

impl KvState {
    pub fn insert(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (value, unix_now()));
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|(v, _)| v.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

async fn kv_get(State(state): State<KvState>, Path(key): Path<String>) -> Response {
    match state.get(&key) {
        Some(value) => Json(value).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn kv_put(
    State(state): State<KvState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> StatusCode {
    state.insert(&key, value);
    StatusCode::OK
}

async fn kv_delete(State(state): State<KvState>, Path(key): Path<String>) -> StatusCode {
    let mut entries = state.entries.lock().unwrap();
    if entries.remove(&key).is_some() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn kv_list(
    State(state): State<KvState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let since: u64 = params
        .get("changed_since")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let entries = state.entries.lock().unwrap();
    let changed = entries
        .iter()
        .filter(|(_, (_, ts))| *ts >= since)
        .map(|(k, (v, ts))| json!({"key": k, "value": v, "updated_at": ts}))
        .collect();
    Json(changed)
}

fn kv_router(state: KvState) -> Router {
    Router::new()
        .route("/kv", get(kv_list))
        .route("/kv/{key}", get(kv_get).put(kv_put).delete(kv_delete))
        .with_state(state)
}

/// Start a bare KV server (cache tier or replication target).
pub async fn start_kv_server() -> (String, KvState) {
    let state = KvState::default();
    let base = serve(kv_router(state.clone())).await;
    (base, state)
}

/// Start a mock region: `/health` controlled by the returned flag, plus a KV
/// surface for replication.
pub async fn start_region_server() -> (String, Arc<AtomicBool>, KvState) {
    let healthy = Arc::new(AtomicBool::new(true));
    let kv = KvState::default();

    let flag = healthy.clone();
    let health = move || {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
            } else {
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
        }
    };

    let app = Router::new()
        .route("/health", get(health))
        .merge(kv_router(kv.clone()));
    let base = serve(app).await;
    (base, healthy, kv)
}

#[derive(Clone, Default)]
struct RegionState {
    health: Arc<Mutex<HashMap<String, Value>>>,
    active: Arc<Mutex<Option<Value>>>,
}

async fn put_health(
    State(state): State<RegionState>,
    Path(name): Path<String>,
    Json(record): Json<Value>,
) -> StatusCode {
    state.health.lock().unwrap().insert(name, record);
    StatusCode::OK
}

async fn get_health(State(state): State<RegionState>, Path(name): Path<String>) -> Response {
    match state.health.lock().unwrap().get(&name) {
        Some(record) => Json(record.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_health(State(state): State<RegionState>) -> Json<Vec<Value>> {
    Json(state.health.lock().unwrap().values().cloned().collect())
}

async fn put_active(State(state): State<RegionState>, Json(marker): Json<Value>) -> StatusCode {
    *state.active.lock().unwrap() = Some(marker);
    StatusCode::OK
}

async fn get_active(State(state): State<RegionState>) -> Response {
    match state.active.lock().unwrap().clone() {
        Some(marker) => Json(marker).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start a mock state store speaking the `RemoteStateStore` protocol.
pub async fn start_state_server() -> String {
    let state = RegionState::default();
    let app = Router::new()
        .route("/regions/health", get(list_health))
        .route("/regions/active", get(get_active).put(put_active))
        .route("/regions/{name}/health", get(get_health).put(put_health))
        .with_state(state);
    serve(app).await
}
