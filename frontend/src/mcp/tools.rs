//! Tool catalogue and dispatch onto the backend adapter

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{AnalyzeRequest, ApiEnvelope, GenerateRequest, ProcessRequest};

use super::protocol::ToolDefinition;
use crate::adapter::FrontendAdapter;
use crate::error::{FrontendError, FrontendResult};

pub const ANALYZE_INPUT: &str = "analyze_input";
pub const GENERATE_XML: &str = "generate_xml";
pub const PROCESS_INPUT: &str = "process_input";
pub const GET_STATUS: &str = "get_status";
pub const LIST_DATA: &str = "list_data";
pub const GET_DATA: &str = "get_data";
pub const DELETE_DATA: &str = "delete_data";
pub const LIST_TEMPLATES: &str = "list_templates";
pub const HEALTH_CHECK: &str = "health_check";

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn id_argument(field: &str) -> Value {
    json!({
        "type": "object",
        "properties": { field: { "type": "string" } },
        "required": [field]
    })
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            ANALYZE_INPUT,
            "Analyze input content and extract information",
            json!({
                "type": "object",
                "properties": {
                    "content": { "type": "string", "description": "Content to analyze" },
                    "input_type": {
                        "type": "string",
                        "description": "Type of input (text, markdown, json, etc.)",
                        "default": "text"
                    },
                    "options": { "type": "object", "default": {} }
                },
                "required": ["content"]
            }),
        ),
        tool(
            GENERATE_XML,
            "Generate XML output from analysis results",
            json!({
                "type": "object",
                "properties": {
                    "analysis": { "type": "object", "description": "Analysis results" },
                    "output_id": { "type": "string", "description": "Unique identifier for output" },
                    "template": {
                        "type": "string",
                        "description": "XML template to use (default, task_packet, analysis_report)",
                        "default": "default"
                    },
                    "options": { "type": "object", "description": "Additional generation options", "default": {} }
                },
                "required": ["analysis", "output_id"]
            }),
        ),
        tool(
            PROCESS_INPUT,
            "Complete workflow: analyze input and generate XML",
            json!({
                "type": "object",
                "properties": {
                    "content": { "type": "string", "description": "Content to process" },
                    "input_type": { "type": "string", "description": "Type of input", "default": "text" },
                    "output_id": {
                        "type": "string",
                        "description": "Unique identifier for output (generated when omitted)"
                    },
                    "template": { "type": "string", "description": "XML template to use", "default": "default" },
                    "options": { "type": "object", "description": "Processing options", "default": {} }
                },
                "required": ["content"]
            }),
        ),
        tool(GET_STATUS, "Get processing status by ID", id_argument("processing_id")),
        tool(LIST_DATA, "List all saved data entries", no_arguments()),
        tool(GET_DATA, "Get data by ID", id_argument("data_id")),
        tool(DELETE_DATA, "Delete data by ID", id_argument("data_id")),
        tool(LIST_TEMPLATES, "List available XML templates", no_arguments()),
        tool(HEALTH_CHECK, "Check backend server health", no_arguments()),
    ]
}

pub fn is_known(name: &str) -> bool {
    definitions().iter().any(|t| t.name == name)
}

#[derive(Deserialize)]
struct ProcessingIdArgs {
    processing_id: String,
}

#[derive(Deserialize)]
struct DataIdArgs {
    data_id: String,
}

fn arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> FrontendResult<T> {
    serde_json::from_value(arguments).map_err(|e| FrontendError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn field<'a>(envelope: &'a ApiEnvelope, name: &str) -> FrontendResult<&'a Value> {
    envelope
        .field(name)
        .ok_or_else(|| FrontendError::UnexpectedResponse {
            message: format!("response has no '{name}' field"),
        })
}

fn pretty(value: &impl serde::Serialize) -> FrontendResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Run one tool against the backend and render its result as text
pub async fn call(adapter: &FrontendAdapter, name: &str, args: Value) -> FrontendResult<String> {
    match name {
        ANALYZE_INPUT => {
            let request: AnalyzeRequest = arguments(name, args)?;
            let envelope = adapter.analyze(&request).await?;
            pretty(field(&envelope, "analysis")?)
        }
        GENERATE_XML => {
            let request: GenerateRequest = arguments(name, args)?;
            let envelope = adapter.generate(&request).await?;
            match field(&envelope, "xml_output")? {
                Value::String(xml) => Ok(xml.clone()),
                other => pretty(other),
            }
        }
        PROCESS_INPUT => {
            let request: ProcessRequest = arguments(name, args)?;
            pretty(&adapter.process(&request).await?)
        }
        GET_STATUS => {
            let ProcessingIdArgs { processing_id } = arguments(name, args)?;
            pretty(&adapter.status(&processing_id).await?)
        }
        LIST_DATA => {
            let envelope = adapter.list_data().await?;
            pretty(field(&envelope, "data")?)
        }
        GET_DATA => {
            let DataIdArgs { data_id } = arguments(name, args)?;
            let envelope = adapter.get_data(&data_id).await?;
            pretty(field(&envelope, "data")?)
        }
        DELETE_DATA => {
            let DataIdArgs { data_id } = arguments(name, args)?;
            let envelope = adapter.delete_data(&data_id).await?;
            match field(&envelope, "message")? {
                Value::String(message) => Ok(message.clone()),
                other => pretty(other),
            }
        }
        LIST_TEMPLATES => {
            let envelope = adapter.list_templates().await?;
            pretty(field(&envelope, "templates")?)
        }
        HEALTH_CHECK => pretty(&adapter.health().await?),
        _ => Err(FrontendError::UnknownTool {
            name: name.to_string(),
        }),
    }
}
