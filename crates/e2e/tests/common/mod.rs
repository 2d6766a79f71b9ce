//! In-process stand-in for the grid hub, storage API and job API.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use gridrun_common::{Credentials, HarnessConfig};
use md5::{Digest, Md5};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const AUTH_HEADER: &str = "Basic YWxpY2U6c2VjcmV0";

#[derive(Default)]
pub struct MockGrid {
    pub uploads: Mutex<Vec<(String, String, usize)>>,
    pub created: Mutex<Vec<Value>>,
    pub deleted: Mutex<Vec<String>>,
    pub jobs: Mutex<Vec<(String, bool)>>,
    pub auth: Mutex<Vec<Option<String>>>,
    pub md5_override: Mutex<Option<String>>,
    pub reject_device: Mutex<Option<String>>,
    pub refuse_uploads: Mutex<bool>,
    next_id: AtomicUsize,
}

impl MockGrid {
    fn record_auth(&self, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth.lock().push(value);
    }
}

async fn upload(
    State(grid): State<Arc<MockGrid>>,
    UrlPath((user, file)): UrlPath<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    grid.record_auth(&headers);
    if *grid.refuse_uploads.lock() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Not authorized"})));
    }
    grid.uploads.lock().push((user, file.clone(), body.len()));
    let md5 = grid
        .md5_override
        .lock()
        .clone()
        .unwrap_or_else(|| hex::encode(Md5::digest(&body)));
    (
        StatusCode::OK,
        Json(json!({"filename": file, "size": body.len(), "md5": md5, "etag": "x"})),
    )
}

async fn create_session(
    State(grid): State<Arc<MockGrid>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    grid.record_auth(&headers);
    let caps = body["desiredCapabilities"].clone();
    let rejected = grid.reject_device.lock().clone();
    if rejected.as_deref() == caps["deviceName"].as_str() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "sessionId": null,
                "status": 33,
                "value": {"message": "no device available"}
            })),
        );
    }
    grid.created.lock().push(caps);
    let n = grid.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    (
        StatusCode::OK,
        Json(json!({"sessionId": format!("session-{n}"), "status": 0, "value": {}})),
    )
}

async fn delete_session(
    State(grid): State<Arc<MockGrid>>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
) -> Json<Value> {
    grid.record_auth(&headers);
    grid.deleted.lock().push(id);
    Json(json!({"sessionId": null, "status": 0, "value": null}))
}

async fn update_job(
    State(grid): State<Arc<MockGrid>>,
    UrlPath((_user, id)): UrlPath<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let passed = body["passed"].as_bool().unwrap_or(false);
    grid.jobs.lock().push((id.clone(), passed));
    Json(json!({"id": id, "passed": passed}))
}

/// Serve the mock on an ephemeral loopback port
pub async fn spawn() -> (SocketAddr, Arc<MockGrid>) {
    let grid = Arc::new(MockGrid::default());
    let app = Router::new()
        .route("/rest/v1/storage/:user/:file", post(upload))
        .route("/rest/v1/:user/jobs/:id", put(update_job))
        .route("/wd/hub/session", post(create_session))
        .route("/wd/hub/session/:id", delete(delete_session))
        .with_state(grid.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, grid)
}

pub fn credentials() -> Credentials {
    Credentials::new("alice", "secret")
}

/// Write a small application bundle into `dir`
pub fn app_zip(dir: &Path) -> PathBuf {
    let path = dir.join("app.zip");
    std::fs::write(&path, b"PK\x03\x04 not really a zip, but bytes all the same").unwrap();
    path
}

/// Configuration pointing every endpoint at the mock
pub fn config(addr: SocketAddr, artifact: Option<PathBuf>) -> HarnessConfig {
    let mut config = HarnessConfig::new(credentials());
    config.artifact_path = artifact;
    config.grid_host = addr.ip().to_string();
    config.grid_port = addr.port();
    config.rest_endpoint = format!("http://{}", addr);
    config.workers = 2;
    config.request_timeout = Duration::from_secs(5);
    config
}
