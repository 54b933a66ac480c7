//! HTTP routes of the backend service
//!
//! Every `/api` response carries `success`; failures add `error` and use the
//! status code of the underlying [`BackendError`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Map, Value};
use shared::{process_info, AnalyzeRequest, GenerateRequest, ProcessId, ProcessRequest};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::{BackendError, BackendResult};
use crate::processor::{analyze, render_xml, Template};
use crate::store::DataStore;

pub const SERVICE_NAME: &str = "xml-mcp-backend";

/// State shared by all handlers
#[derive(Debug)]
pub struct AppState {
    pub store: DataStore,
    started_at: Instant,
}

impl AppState {
    /// State with an in-memory store
    pub fn new() -> Self {
        Self::with_store(DataStore::new())
    }

    pub fn with_store(store: DataStore) -> Self {
        Self {
            store,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedState = Arc<AppState>;

/// Build the router with all routes
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/analyze", post(analyze_input))
        .route("/api/generate", post(generate_xml))
        .route("/api/process", post(process_input))
        .route("/api/status/:processing_id", get(get_status))
        .route("/api/data", get(list_data))
        .route("/api/data/:data_id", get(get_data).delete(delete_data))
        .route("/api/templates", get(list_templates))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> BackendResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| BackendError::InvalidRequest {
            details: rejection.body_text(),
        })
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

async fn index() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "analyze": "/api/analyze",
            "generate": "/api/generate",
            "process": "/api/process",
            "status": "/api/status/:processing_id",
            "data": "/api/data",
            "templates": "/api/templates"
        }
    }))
}

/// Liveness endpoint probed by the supervisor
async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "uptime_seconds": state.uptime_seconds(),
        "records": state.store.len().await
    }))
}

async fn analyze_input(
    State(state): State<SharedState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> BackendResult<Json<Value>> {
    let request = body(payload)?;
    if request.content.is_empty() {
        return Err(BackendError::MissingField { field: "content" });
    }

    let processing_id = Uuid::new_v4().to_string();
    process_info!(
        ProcessId::current(),
        "🔍 Analyzing input {} ({})",
        processing_id,
        request.input_type
    );
    let analysis = serde_json::to_value(analyze(&request.content, &request.input_type, &request.options))?;

    state
        .store
        .insert(
            &processing_id,
            object(json!({
                "processing_id": processing_id,
                "input_type": request.input_type,
                "analysis": analysis
            })),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "analysis": analysis,
        "processing_id": processing_id
    })))
}

async fn generate_xml(
    State(state): State<SharedState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> BackendResult<Json<Value>> {
    let request = body(payload)?;
    if is_blank(&request.analysis) {
        return Err(BackendError::MissingField { field: "analysis" });
    }
    if request.output_id.is_empty() {
        return Err(BackendError::MissingField { field: "output_id" });
    }
    let template: Template = request.template.parse()?;

    process_info!(
        ProcessId::current(),
        "📝 Generating XML {} (template: {})",
        request.output_id,
        template.name()
    );
    let xml_output = render_xml(&request.analysis, &request.output_id, template)?;

    state
        .store
        .insert(
            &request.output_id,
            object(json!({
                "output_id": request.output_id,
                "template": template.name(),
                "analysis": request.analysis,
                "xml_output": xml_output
            })),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "xml_output": xml_output,
        "output_id": request.output_id,
        "template": template.name()
    })))
}

async fn process_input(
    State(state): State<SharedState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> BackendResult<Json<Value>> {
    let request = body(payload)?;
    if request.content.is_empty() {
        return Err(BackendError::MissingField { field: "content" });
    }
    let template: Template = request.template.parse()?;
    let output_id = request
        .output_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let processing_id = Uuid::new_v4().to_string();

    process_info!(
        ProcessId::current(),
        "⚙️ Processing {} -> {} (template: {})",
        processing_id,
        output_id,
        template.name()
    );
    let analysis = serde_json::to_value(analyze(&request.content, &request.input_type, &request.options))?;
    let xml_output = render_xml(&analysis, &output_id, template)?;

    state
        .store
        .insert(
            &processing_id,
            object(json!({
                "processing_id": processing_id,
                "output_id": output_id,
                "input_type": request.input_type,
                "template": template.name(),
                "analysis": analysis,
                "xml_output": xml_output
            })),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "processing_id": processing_id,
        "output_id": output_id,
        "analysis": analysis,
        "xml_output": xml_output
    })))
}

async fn get_status(
    State(state): State<SharedState>,
    Path(processing_id): Path<String>,
) -> BackendResult<Json<Value>> {
    let record = state
        .store
        .get(&processing_id)
        .await
        .ok_or(BackendError::NotFound {
            kind: "Processing ID",
            id: processing_id,
        })?;

    Ok(Json(json!({
        "success": true,
        "status": record.status,
        "result": record
    })))
}

async fn list_data(State(state): State<SharedState>) -> Json<Value> {
    let data = state.store.list().await;
    Json(json!({
        "success": true,
        "count": data.len(),
        "data": data
    }))
}

async fn get_data(
    State(state): State<SharedState>,
    Path(data_id): Path<String>,
) -> BackendResult<Json<Value>> {
    let record = state
        .store
        .get(&data_id)
        .await
        .ok_or(BackendError::NotFound {
            kind: "Data",
            id: data_id,
        })?;

    Ok(Json(json!({ "success": true, "data": record })))
}

async fn delete_data(
    State(state): State<SharedState>,
    Path(data_id): Path<String>,
) -> BackendResult<Json<Value>> {
    if !state.store.remove(&data_id).await? {
        return Err(BackendError::NotFound {
            kind: "Data",
            id: data_id,
        });
    }

    process_info!(ProcessId::current(), "🗑️ Deleted {}", data_id);
    Ok(Json(json!({
        "success": true,
        "message": format!("Data {data_id} deleted")
    })))
}

async fn list_templates() -> Json<Value> {
    let templates: Vec<_> = Template::ALL.iter().map(Template::info).collect();
    Json(json!({ "success": true, "templates": templates }))
}
