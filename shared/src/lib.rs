//! Shared types for the supervised front-end/backend system
//!
//! Contains only what both processes need: process identity for logging,
//! lifecycle enums reported by the supervisor, and the request/response
//! messages exchanged over the backend HTTP API.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{
    AnalyzeRequest, ApiEnvelope, GenerateRequest, ProcessRequest, TemplateInfo, DEFAULT_INPUT_TYPE,
    DEFAULT_TEMPLATE,
};
