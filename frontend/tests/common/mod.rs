//! Common test utilities: an in-process fake backend

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use shared::SupervisorState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use frontend::FrontendAdapter;

/// Fake backend speaking the same envelope as the real one
pub struct FakeBackend {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/health", get(health))
            .route("/api/analyze", post(analyze))
            .route("/api/generate", post(generate))
            .route("/api/templates", get(templates))
            .route("/api/data", get(list_data))
            .route("/api/data/:id", get(get_data).delete(delete_data))
            .route("/api/status/:id", get(status))
            .with_state(Arc::clone(&hits));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Adapter plus the sender that drives its readiness gate
    pub fn adapter(
        &self,
        state: SupervisorState,
    ) -> (FrontendAdapter, watch::Sender<SupervisorState>) {
        let (tx, rx) = watch::channel(state);
        let adapter = FrontendAdapter::new(&self.base_url, rx, Duration::from_secs(5)).unwrap();
        (adapter, tx)
    }
}

type Hits = State<Arc<AtomicUsize>>;

fn count(hits: &Hits) {
    hits.fetch_add(1, Ordering::SeqCst);
}

async fn health(hits: Hits) -> Json<Value> {
    count(&hits);
    Json(json!({ "status": "healthy", "service": "fake-backend" }))
}

async fn analyze(hits: Hits, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    count(&hits);
    match body.get("content").and_then(Value::as_str) {
        Some(content) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "analysis": { "word_count": content.split_whitespace().count() }
            })),
        ),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "No content provided" })),
        ),
    }
}

async fn generate(hits: Hits, Json(body): Json<Value>) -> Json<Value> {
    count(&hits);
    Json(json!({
        "success": true,
        "xml_output": format!("<output id=\"{}\"/>", body["output_id"].as_str().unwrap_or("")),
        "output_id": body["output_id"]
    }))
}

async fn templates(hits: Hits) -> Json<Value> {
    count(&hits);
    Json(json!({ "success": true, "templates": [{ "name": "default", "description": "Default template" }] }))
}

async fn list_data(hits: Hits) -> Json<Value> {
    count(&hits);
    Json(json!({ "success": true, "data": [] }))
}

async fn get_data(hits: Hits, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    count(&hits);
    if id == "missing" {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Data missing not found" })),
        )
    } else {
        (StatusCode::OK, Json(json!({ "success": true, "data": { "id": id } })))
    }
}

async fn delete_data(hits: Hits, Path(id): Path<String>) -> Json<Value> {
    count(&hits);
    Json(json!({ "success": true, "message": format!("Data {id} deleted") }))
}

async fn status(hits: Hits, Path(id): Path<String>) -> Json<Value> {
    count(&hits);
    Json(json!({ "success": true, "status": "completed", "result": { "processing_id": id } }))
}
