//! Readiness-gated HTTP client for the supervised backend
//!
//! Every call checks the supervisor's state first and fails closed with
//! `BackendUnavailable` unless it is `READY`; no network I/O happens in that
//! case. Backend-reported errors are surfaced with their original message.

use serde::Serialize;
use serde_json::Value;
use shared::{
    process_debug, AnalyzeRequest, ApiEnvelope, GenerateRequest, ProcessId, ProcessRequest,
    SharedError, SupervisorState,
};
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

use crate::error::{FrontendError, FrontendResult};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct FrontendAdapter {
    base_url: Url,
    readiness: watch::Receiver<SupervisorState>,
    client: reqwest::Client,
}

impl FrontendAdapter {
    /// Create an adapter for `base_url`, gated on the supervisor state seen
    /// through `readiness`
    pub fn new(
        base_url: &str,
        readiness: watch::Receiver<SupervisorState>,
        request_timeout: Duration,
    ) -> FrontendResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|_| SharedError::invalid_config("base_url", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(SharedError::invalid_config("base_url", base_url.as_str()).into());
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| FrontendError::Transport {
                message: format!("could not build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url,
            readiness,
            client,
        })
    }

    /// True only while the supervisor reports `READY`
    pub fn ready(&self) -> bool {
        *self.readiness.borrow() == SupervisorState::Ready
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn ensure_ready(&self) -> FrontendResult<()> {
        let state = *self.readiness.borrow();
        if state == SupervisorState::Ready {
            Ok(())
        } else {
            Err(FrontendError::BackendUnavailable { state })
        }
    }

    /// Build `base_url` + segments, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> FrontendResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SharedError::invalid_config("base_url", self.base_url.as_str()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn path_endpoint(&self, path: &str) -> FrontendResult<Url> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.endpoint(&segments)
    }

    pub async fn get(&self, path: &str) -> FrontendResult<Value> {
        self.ensure_ready()?;
        let url = self.path_endpoint(path)?;
        self.send(self.client.get(url)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> FrontendResult<Value> {
        self.ensure_ready()?;
        let url = self.path_endpoint(path)?;
        self.send(self.client.post(url).json(body)).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> FrontendResult<Value> {
        let response = request.send().await.map_err(|e| FrontendError::Transport {
            message: e.to_string(),
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| FrontendError::Transport {
            message: e.to_string(),
        })?;
        process_debug!(ProcessId::current(), "📨 Backend replied {} ({} bytes)", status, text.len());

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(FrontendError::Backend {
                    status: status.as_u16(),
                    message: text,
                });
            }
            Err(e) => {
                return Err(FrontendError::UnexpectedResponse {
                    message: format!("invalid JSON: {e}"),
                });
            }
        };

        let reported_failure = body.get("success").and_then(Value::as_bool) == Some(false);
        if !status.is_success() || reported_failure {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            return Err(FrontendError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn get_envelope(&self, segments: &[&str]) -> FrontendResult<ApiEnvelope> {
        self.ensure_ready()?;
        let url = self.endpoint(segments)?;
        envelope(self.send(self.client.get(url)).await?)
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> FrontendResult<ApiEnvelope> {
        envelope(self.post("/api/analyze", request).await?)
    }

    pub async fn generate(&self, request: &GenerateRequest) -> FrontendResult<ApiEnvelope> {
        envelope(self.post("/api/generate", request).await?)
    }

    pub async fn process(&self, request: &ProcessRequest) -> FrontendResult<ApiEnvelope> {
        envelope(self.post("/api/process", request).await?)
    }

    pub async fn status(&self, processing_id: &str) -> FrontendResult<ApiEnvelope> {
        self.get_envelope(&["api", "status", processing_id]).await
    }

    pub async fn list_data(&self) -> FrontendResult<ApiEnvelope> {
        self.get_envelope(&["api", "data"]).await
    }

    pub async fn get_data(&self, data_id: &str) -> FrontendResult<ApiEnvelope> {
        self.get_envelope(&["api", "data", data_id]).await
    }

    pub async fn delete_data(&self, data_id: &str) -> FrontendResult<ApiEnvelope> {
        self.ensure_ready()?;
        let url = self.endpoint(&["api", "data", data_id])?;
        envelope(self.send(self.client.delete(url)).await?)
    }

    pub async fn list_templates(&self) -> FrontendResult<ApiEnvelope> {
        self.get_envelope(&["api", "templates"]).await
    }

    /// Liveness document; not wrapped in the `success` envelope
    pub async fn health(&self) -> FrontendResult<Value> {
        self.get("/health").await
    }
}

fn envelope(body: Value) -> FrontendResult<ApiEnvelope> {
    serde_json::from_value(body).map_err(|e| FrontendError::UnexpectedResponse {
        message: format!("missing response envelope: {e}"),
    })
}
