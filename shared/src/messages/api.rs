//! Backend HTTP API request bodies and response envelope

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_INPUT_TYPE: &str = "text";
pub const DEFAULT_TEMPLATE: &str = "default";

fn default_input_type() -> String {
    DEFAULT_INPUT_TYPE.to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

/// Body of `POST /api/analyze`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalyzeRequest {
    pub content: String,
    #[serde(default = "default_input_type")]
    pub input_type: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Body of `POST /api/generate`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerateRequest {
    pub analysis: Value,
    pub output_id: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Body of `POST /api/process`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProcessRequest {
    pub content: String,
    #[serde(default)]
    pub output_id: Option<String>,
    #[serde(default = "default_input_type")]
    pub input_type: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Entry of `GET /api/templates`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TemplateInfo {
    pub name: String,
    pub description: String,
}

/// Every backend response carries `success` and, on failure, `error`.
/// Remaining fields are route specific and kept as raw JSON.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl ApiEnvelope {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analyze_request_defaults() {
        let req: AnalyzeRequest = serde_json::from_value(json!({ "content": "hello" })).unwrap();
        assert_eq!(req.input_type, "text");
        assert!(req.options.is_empty());
    }

    #[test]
    fn test_process_request_output_id_optional() {
        let req: ProcessRequest =
            serde_json::from_value(json!({ "content": "x", "template": "task_packet" })).unwrap();
        assert!(req.output_id.is_none());
        assert_eq!(req.template, "task_packet");
    }

    #[test]
    fn test_envelope_keeps_route_fields() {
        let env: ApiEnvelope = serde_json::from_value(json!({
            "success": true,
            "xml_output": "<output/>",
            "output_id": "abc"
        }))
        .unwrap();
        assert!(env.success);
        assert!(env.error.is_none());
        assert_eq!(env.field("xml_output"), Some(&json!("<output/>")));
    }

    #[test]
    fn test_envelope_error_message() {
        let env: ApiEnvelope =
            serde_json::from_value(json!({ "success": false, "error": "Processing ID not found" })).unwrap();
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("Processing ID not found"));
    }
}
