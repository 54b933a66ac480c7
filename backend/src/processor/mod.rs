//! Content analysis and XML rendering

pub mod analysis;
pub mod templates;

pub use analysis::{analyze, Analysis, Structure};
pub use templates::{render_xml, Template};
