//! XML templates rendered from an analysis document
//!
//! Templates read the analysis as plain JSON so that `POST /api/generate` can
//! render analyses produced elsewhere, not only by [`super::analyze`].

use chrono::Utc;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use shared::TemplateInfo;
use std::str::FromStr;

use crate::error::{BackendError, BackendResult};

const MAX_LIST_ITEMS: usize = 10;
const MAX_SECTION_TASKS: usize = 5;
const MAX_TASK_TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Default,
    TaskPacket,
    AnalysisReport,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Default, Template::TaskPacket, Template::AnalysisReport];

    pub fn name(&self) -> &'static str {
        match self {
            Template::Default => "default",
            Template::TaskPacket => "task_packet",
            Template::AnalysisReport => "analysis_report",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Template::Default => "Generic XML output with analysis results",
            Template::TaskPacket => "Structured task breakdown with effort estimates",
            Template::AnalysisReport => "Detailed analysis report with summary",
        }
    }

    pub fn info(&self) -> TemplateInfo {
        TemplateInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }

    fn root_element(&self) -> &'static str {
        match self {
            Template::Default => "Output",
            Template::TaskPacket => "TaskPacket",
            Template::AnalysisReport => "AnalysisReport",
        }
    }
}

impl FromStr for Template {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| BackendError::UnknownTemplate { name: s.to_string() })
    }
}

/// Indenting XML writer; text and attribute values are escaped on write
struct XmlDoc {
    writer: Writer<Vec<u8>>,
}

impl XmlDoc {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> BackendResult<()> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.writer
            .write_event(Event::Start(start))
            .map_err(BackendError::render)
    }

    fn close(&mut self, name: &str) -> BackendResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(BackendError::render)
    }

    fn text(&mut self, name: &str, text: &str) -> BackendResult<()> {
        self.open(name, &[])?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(BackendError::render)?;
        self.close(name)
    }

    fn finish(self) -> BackendResult<String> {
        String::from_utf8(self.writer.into_inner()).map_err(BackendError::render)
    }
}

/// `word_count` -> `WordCount`; anything that cannot start an XML name is prefixed
fn element_name(key: &str) -> String {
    let name: String = key
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect();

    match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => name,
        _ => format!("Field{name}"),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn field_text(analysis: &Value, key: &str, default: &str) -> String {
    analysis
        .get(key)
        .map(scalar_text)
        .unwrap_or_else(|| default.to_string())
}

fn complexity(analysis: &Value) -> u64 {
    analysis
        .get("complexity_score")
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn structure_list<'a>(analysis: &'a Value, key: &str) -> &'a [Value] {
    analysis
        .get("structure")
        .and_then(|s| s.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn estimate_effort(complexity: u64) -> &'static str {
    match complexity {
        0..=5 => "Low (1-2 days)",
        6..=10 => "Medium (3-5 days)",
        11..=15 => "High (1-2 weeks)",
        _ => "Very High (2+ weeks)",
    }
}

/// Render `analysis` with `template`, stamped with `output_id`
pub fn render_xml(analysis: &Value, output_id: &str, template: Template) -> BackendResult<String> {
    let generated = Utc::now().to_rfc3339();
    let root = template.root_element();
    let mut doc = XmlDoc::new();

    doc.open(
        root,
        &[("id", output_id), ("generated", generated.as_str()), ("template", template.name())],
    )?;
    match template {
        Template::Default => {
            doc.open("Metadata", &[])?;
            doc.text("InputType", &field_text(analysis, "input_type", "unknown"))?;
            doc.text("WordCount", &field_text(analysis, "word_count", "0"))?;
            doc.text("ComplexityScore", &complexity(analysis).to_string())?;
            doc.close("Metadata")?;

            doc.open("Analysis", &[])?;
            write_analysis(&mut doc, analysis)?;
            doc.close("Analysis")?;
        }
        Template::TaskPacket => {
            let score = complexity(analysis);
            doc.open("Metadata", &[])?;
            doc.text("ComplexityScore", &score.to_string())?;
            doc.text("EstimatedEffort", estimate_effort(score))?;
            doc.close("Metadata")?;

            doc.open("Tasks", &[])?;
            write_tasks(&mut doc, analysis, score)?;
            doc.close("Tasks")?;
        }
        Template::AnalysisReport => {
            doc.open("Summary", &[])?;
            doc.text("WordCount", &field_text(analysis, "word_count", "0"))?;
            doc.text("InputType", &field_text(analysis, "input_type", "unknown"))?;
            doc.text("ComplexityScore", &complexity(analysis).to_string())?;
            doc.text("SectionCount", &structure_list(analysis, "sections").len().to_string())?;
            doc.text("ListCount", &structure_list(analysis, "lists").len().to_string())?;
            doc.close("Summary")?;

            doc.open("DetailedAnalysis", &[])?;
            write_analysis(&mut doc, analysis)?;
            doc.close("DetailedAnalysis")?;
        }
    }
    doc.close(root)?;

    doc.finish()
}

fn write_analysis(doc: &mut XmlDoc, analysis: &Value) -> BackendResult<()> {
    let Some(fields) = analysis.as_object() else {
        return doc.text("Value", &scalar_text(analysis));
    };

    for (key, value) in fields {
        if key == "timestamp" || key == "processing_options" {
            continue;
        }
        let name = element_name(key);
        match value {
            Value::Object(children) => {
                doc.open(&name, &[])?;
                for (child_key, child) in children {
                    let child_name = element_name(child_key);
                    match child {
                        Value::Array(items) => write_items(doc, &child_name, items)?,
                        other => doc.text(&child_name, &scalar_text(other))?,
                    }
                }
                doc.close(&name)?;
            }
            Value::Array(items) => write_items(doc, &name, items)?,
            scalar => doc.text(&name, &scalar_text(scalar))?,
        }
    }
    Ok(())
}

fn write_items(doc: &mut XmlDoc, name: &str, items: &[Value]) -> BackendResult<()> {
    doc.open(name, &[])?;
    for item in items.iter().take(MAX_LIST_ITEMS) {
        doc.text("Item", &scalar_text(item))?;
    }
    doc.close(name)
}

fn write_tasks(doc: &mut XmlDoc, analysis: &Value, complexity: u64) -> BackendResult<()> {
    let mut tasks: Vec<(String, &str, u64)> = vec![
        ("Analysis and Planning".to_string(), "high", 4),
        ("Implementation".to_string(), "medium", 8),
        ("Testing and Review".to_string(), "medium", 4),
    ];
    for section in structure_list(analysis, "sections").iter().take(MAX_SECTION_TASKS) {
        let title: String = scalar_text(section).chars().take(MAX_TASK_TITLE_CHARS).collect();
        tasks.push((format!("Process: {title}"), "medium", (complexity / 3).max(2)));
    }

    for (index, (title, priority, hours)) in tasks.iter().enumerate() {
        let id = format!("task_{}", index + 1);
        doc.open("Task", &[("id", id.as_str())])?;
        doc.text("Title", title)?;
        doc.text("Priority", priority)?;
        doc.text("EstimatedHours", &hours.to_string())?;
        doc.close("Task")?;
    }
    Ok(())
}
