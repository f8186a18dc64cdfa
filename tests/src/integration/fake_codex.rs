//! In-process stand-in for the Codex REST API.
//!
//! Serves the endpoints the cache node uses and counts every call, so tests
//! can assert on which outbound requests were (or were not) made.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

/// How the fake answers a manifest query for one content identifier.
#[derive(Clone, Debug)]
pub enum ManifestReply {
    Size(u64),
    Status(u16),
    Garbage,
}

#[derive(Default)]
struct Inner {
    manifests: Mutex<HashMap<String, ManifestReply>>,
    trigger_status: Mutex<u16>,
    trigger_delay: Mutex<Duration>,
    triggered: Mutex<Vec<String>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    announce_addresses: Mutex<Vec<String>>,
    manifest_calls: AtomicUsize,
    data_calls: AtomicUsize,
    trigger_calls: AtomicUsize,
    info_calls: AtomicUsize,
}

/// Handle to a running fake Codex node.
#[derive(Clone)]
pub struct FakeCodex {
    inner: Arc<Inner>,
    addr: SocketAddr,
}

impl FakeCodex {
    /// Start the fake on an ephemeral port. Unknown identifiers answer 404
    /// and replication requests answer 200.
    pub async fn start() -> Self {
        let inner = Arc::new(Inner::default());
        *inner.trigger_status.lock().unwrap() = 200;
        *inner.announce_addresses.lock().unwrap() =
            vec!["/ip4/127.0.0.1/tcp/8070".to_string()];

        let router = Router::new()
            .route("/api/codex/v1/data/:cid", get(data))
            .route("/api/codex/v1/data/:cid/network/manifest", get(manifest))
            .route("/api/codex/v1/data/:cid/network", post(trigger))
            .route("/api/codex/v1/debug/info", get(info))
            .with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { inner, addr }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn with_manifest(self, cid: &str, reply: ManifestReply) -> Self {
        self.inner
            .manifests
            .lock()
            .unwrap()
            .insert(cid.to_string(), reply);
        self
    }

    pub fn with_dataset(self, cid: &str, size_bytes: u64) -> Self {
        self.with_manifest(cid, ManifestReply::Size(size_bytes))
    }

    pub fn with_trigger_status(self, status: u16) -> Self {
        *self.inner.trigger_status.lock().unwrap() = status;
        self
    }

    /// Serve `bytes` as the content of `cid`.
    pub fn with_content(self, cid: &str, bytes: &[u8]) -> Self {
        self.inner
            .contents
            .lock()
            .unwrap()
            .insert(cid.to_string(), bytes.to_vec());
        self
    }

    pub fn with_announce_addresses(self, addresses: &[&str]) -> Self {
        *self.inner.announce_addresses.lock().unwrap() =
            addresses.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_trigger_delay(self, delay: Duration) -> Self {
        *self.inner.trigger_delay.lock().unwrap() = delay;
        self
    }

    pub fn manifest_calls(&self) -> usize {
        self.inner.manifest_calls.load(Ordering::SeqCst)
    }

    pub fn trigger_calls(&self) -> usize {
        self.inner.trigger_calls.load(Ordering::SeqCst)
    }

    pub fn data_calls(&self) -> usize {
        self.inner.data_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.inner.info_calls.load(Ordering::SeqCst)
    }

    /// Total requests made against the storage API (node info excluded).
    pub fn storage_calls(&self) -> usize {
        self.manifest_calls() + self.trigger_calls()
    }

    pub fn triggered(&self) -> Vec<String> {
        self.inner.triggered.lock().unwrap().clone()
    }
}

async fn manifest(State(inner): State<Arc<Inner>>, Path(cid): Path<String>) -> Response {
    inner.manifest_calls.fetch_add(1, Ordering::SeqCst);
    let reply = inner.manifests.lock().unwrap().get(&cid).cloned();

    match reply {
        Some(ManifestReply::Size(size)) => Json(json!({
            "cid": cid,
            "manifest": {
                "datasetSize": size,
                "blockSize": 65536,
                "protected": false,
                "treeCid": format!("zTree{cid}"),
                "uploadedAt": 1700000000
            }
        }))
        .into_response(),
        Some(ManifestReply::Status(status)) => status_code(status).into_response(),
        Some(ManifestReply::Garbage) => "<html>not a manifest</html>".into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn trigger(State(inner): State<Arc<Inner>>, Path(cid): Path<String>) -> Response {
    inner.trigger_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *inner.trigger_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    inner.triggered.lock().unwrap().push(cid.clone());

    let status = status_code(*inner.trigger_status.lock().unwrap());
    if status == StatusCode::NO_CONTENT {
        status.into_response()
    } else if status.is_success() {
        (status, Json(json!({ "cid": cid }))).into_response()
    } else {
        (status, "replication refused").into_response()
    }
}

async fn data(State(inner): State<Arc<Inner>>, Path(cid): Path<String>) -> Response {
    inner.data_calls.fetch_add(1, Ordering::SeqCst);
    match inner.contents.lock().unwrap().get(&cid).cloned() {
        Some(bytes) => {
            ([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response()
        }
        None => (StatusCode::NOT_FOUND, "dataset not found").into_response(),
    }
}

async fn info(State(inner): State<Arc<Inner>>) -> Json<serde_json::Value> {
    inner.info_calls.fetch_add(1, Ordering::SeqCst);
    let addresses = inner.announce_addresses.lock().unwrap().clone();
    Json(json!({
        "id": "16Uiu2HAmFakeCodexNode",
        "announceAddresses": addresses
    }))
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
