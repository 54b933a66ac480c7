//! Message types exchanged between the front-end and the backend
//!
//! - `api`: request bodies and the response envelope of the backend HTTP API

pub mod api;

pub use api::{
    AnalyzeRequest, ApiEnvelope, GenerateRequest, ProcessRequest, TemplateInfo, DEFAULT_INPUT_TYPE,
    DEFAULT_TEMPLATE,
};
