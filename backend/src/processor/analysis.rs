//! Lightweight content heuristics
//!
//! Every input gets the same counts and line classification. `markdown`,
//! `json` and `xml` inputs additionally get a block describing their shape.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const METADATA_SCAN_LINES: usize = 20;
const MAX_METADATA_KEY_LEN: usize = 50;
const MAX_METADATA_VALUE_LEN: usize = 200;
const MAX_COMPLEXITY: u32 = 20;

/// Keyword weights contributing to the complexity score
const COMPLEXITY_KEYWORDS: &[(&str, u32)] = &[
    ("complex", 1),
    ("integrate", 1),
    ("system", 1),
    ("process", 1),
    ("workflow", 2),
    ("automation", 2),
    ("api", 2),
    ("database", 2),
    ("security", 2),
    ("performance", 2),
    ("scalability", 3),
    ("architecture", 2),
    ("framework", 1),
    ("algorithm", 2),
];

/// Result of `POST /api/analyze`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub timestamp: DateTime<Utc>,
    pub input_type: String,
    pub content_length: usize,
    pub word_count: usize,
    pub basic_stats: BasicStats,
    pub line_count: usize,
    pub non_empty_lines: usize,
    pub sentence_count: usize,
    pub structure: Structure,
    pub metadata: BTreeMap<String, String>,
    pub complexity_score: u32,
    pub processing_options: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_features: Option<MarkdownFeatures>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_structure: Option<JsonStructure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_structure: Option<XmlStructure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BasicStats {
    pub lines: usize,
    pub characters: usize,
    pub characters_no_spaces: usize,
    pub words: usize,
    /// Blocks separated by a blank line
    pub paragraphs: usize,
    pub sentences: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarkdownFeatures {
    pub headers: HeaderCounts,
    pub formatting: FormattingCounts,
    pub links: usize,
    pub images: usize,
    /// More than two `|` characters anywhere
    pub tables: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeaderCounts {
    pub h1: usize,
    pub h2: usize,
    pub h3: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormattingCounts {
    pub bold: usize,
    pub italic: usize,
    pub code_inline: usize,
    pub code_blocks: usize,
}

/// Shape of a JSON document, or the parse error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonStructure {
    pub valid: bool,
    #[serde(flatten)]
    pub shape: Option<JsonShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonShape {
    /// `object`, `array`, `string`, `number`, `boolean` or `null`
    #[serde(rename = "type")]
    pub kind: String,
    /// Top-level keys of an object
    pub keys: Option<Vec<String>>,
    /// Entry count of an object or array
    pub length: Option<usize>,
    pub depth: usize,
    pub has_arrays: bool,
    pub has_objects: bool,
}

/// Shape of an XML document, or the parse error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XmlStructure {
    pub valid: bool,
    #[serde(flatten)]
    pub shape: Option<XmlShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XmlShape {
    pub root_tag: String,
    /// All elements, root included
    pub elements: usize,
    /// Attributes on all elements, namespace declarations excluded
    pub attributes: usize,
    /// Nesting below the root; a childless root is 0
    pub depth: usize,
    /// Prefixes declared on the root, `""` for the default namespace
    pub namespaces: Vec<String>,
}

/// Lines classified by their leading markup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Structure {
    pub sections: Vec<String>,
    pub lists: Vec<String>,
    pub code_blocks: Vec<String>,
    pub links: Vec<String>,
}

pub fn analyze(content: &str, input_type: &str, options: &Map<String, Value>) -> Analysis {
    let lines: Vec<&str> = content.split('\n').collect();

    Analysis {
        timestamp: Utc::now(),
        input_type: input_type.to_string(),
        content_length: content.chars().count(),
        word_count: content.split_whitespace().count(),
        basic_stats: basic_stats(content, &lines),
        line_count: lines.len(),
        non_empty_lines: lines.iter().filter(|l| !l.trim().is_empty()).count(),
        sentence_count: sentence_count(content),
        structure: structure(&lines),
        metadata: metadata(&lines),
        complexity_score: complexity(content, &lines),
        processing_options: options.clone(),
        markdown_features: (input_type == "markdown").then(|| markdown_features(content)),
        json_structure: (input_type == "json").then(|| json_structure(content)),
        xml_structure: (input_type == "xml").then(|| xml_structure(content)),
    }
}

fn sentence_count(content: &str) -> usize {
    content.chars().filter(|c| matches!(c, '.' | '!' | '?')).count()
}

fn basic_stats(content: &str, lines: &[&str]) -> BasicStats {
    BasicStats {
        lines: lines.len(),
        characters: content.chars().count(),
        characters_no_spaces: content.chars().filter(|c| *c != ' ').count(),
        words: content.split_whitespace().count(),
        paragraphs: content.split("\n\n").filter(|p| !p.trim().is_empty()).count(),
        sentences: sentence_count(content),
    }
}

fn markdown_features(content: &str) -> MarkdownFeatures {
    let count = |pattern: &str| content.matches(pattern).count();
    let fences = count("```");
    let bold = count("**");

    MarkdownFeatures {
        headers: HeaderCounts {
            h1: count("\n# "),
            h2: count("\n## "),
            h3: count("\n### "),
            total: content.split('\n').filter(|l| l.starts_with('#')).count(),
        },
        formatting: FormattingCounts {
            bold,
            italic: count("*").saturating_sub(bold * 2),
            code_inline: count("`").saturating_sub(fences * 3),
            code_blocks: fences / 2,
        },
        links: count("]("),
        images: count("!["),
        tables: count("|") > 2,
    }
}

fn json_structure(content: &str) -> JsonStructure {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => JsonStructure {
            valid: true,
            shape: Some(JsonShape {
                kind: json_kind(&value).to_string(),
                keys: value.as_object().map(|map| map.keys().cloned().collect()),
                length: match &value {
                    Value::Object(map) => Some(map.len()),
                    Value::Array(items) => Some(items.len()),
                    _ => None,
                },
                depth: json_depth(&value, 0),
                has_arrays: json_contains(&value, &|v: &Value| v.is_array()),
                has_objects: json_contains(&value, &|v: &Value| v.is_object()),
            }),
            error: None,
        },
        Err(e) => JsonStructure {
            valid: false,
            shape: None,
            error: Some(e.to_string()),
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

/// Containers add a level for their children; an empty one adds nothing
fn json_depth(value: &Value, depth: usize) -> usize {
    let children: Box<dyn Iterator<Item = &Value>> = match value {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return depth,
    };
    children.map(|child| json_depth(child, depth + 1)).max().unwrap_or(depth)
}

/// Whether `value` or any container nested in it satisfies `matches`,
/// looking through arrays and objects alike
fn json_contains(value: &Value, matches: &dyn Fn(&Value) -> bool) -> bool {
    if matches(value) {
        return true;
    }
    match value {
        Value::Object(map) => map.values().any(|v| json_contains(v, matches)),
        Value::Array(items) => items.iter().any(|v| json_contains(v, matches)),
        _ => false,
    }
}

fn xml_structure(content: &str) -> XmlStructure {
    match xml_shape(content) {
        Ok(shape) => XmlStructure {
            valid: true,
            shape: Some(shape),
            error: None,
        },
        Err(error) => XmlStructure {
            valid: false,
            shape: None,
            error: Some(error),
        },
    }
}

fn xml_shape(content: &str) -> Result<XmlShape, String> {
    let mut reader = Reader::from_str(content);
    let mut root: Option<XmlShape> = None;
    // Elements currently open
    let mut open: usize = 0;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(element) => {
                xml_element(&mut root, &element, open)?;
                open += 1;
            }
            Event::Empty(element) => xml_element(&mut root, &element, open)?,
            Event::End(_) => open = open.saturating_sub(1),
            Event::Text(text) if open == 0 && !text.iter().all(u8::is_ascii_whitespace) => {
                return Err("text outside the root element".to_string());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if open > 0 {
        return Err("unexpected end of document: unclosed element".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

/// Count one element seen with `open` ancestors
fn xml_element(root: &mut Option<XmlShape>, element: &BytesStart<'_>, open: usize) -> Result<(), String> {
    let mut attributes = 0;
    let mut namespaces = Vec::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = attribute.key.as_ref();
        if key == b"xmlns" {
            namespaces.push(String::new());
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            namespaces.push(String::from_utf8_lossy(prefix).into_owned());
        } else {
            attributes += 1;
        }
    }

    match root {
        Some(_) if open == 0 => Err("multiple root elements".to_string()),
        Some(shape) => {
            shape.elements += 1;
            shape.attributes += attributes;
            shape.depth = shape.depth.max(open);
            Ok(())
        }
        None => {
            *root = Some(XmlShape {
                root_tag: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
                elements: 1,
                attributes,
                depth: 0,
                namespaces,
            });
            Ok(())
        }
    }
}

fn is_list_item(line: &str) -> bool {
    line.starts_with(['-', '*', '+'])
}

fn structure(lines: &[&str]) -> Structure {
    let mut structure = Structure::default();

    for line in lines.iter().map(|l| l.trim()) {
        if line.starts_with('#') {
            structure.sections.push(line.to_string());
        } else if is_list_item(line) || ["1.", "2.", "3."].iter().any(|p| line.starts_with(p)) {
            structure.lists.push(line.to_string());
        } else if line.starts_with("```") {
            structure.code_blocks.push(line.to_string());
        } else if line.contains('[') && line.contains("](") {
            structure.links.push(line.to_string());
        }
    }

    structure
}

/// `key: value` pairs near the top of the content
fn metadata(lines: &[&str]) -> BTreeMap<String, String> {
    lines
        .iter()
        .take(METADATA_SCAN_LINES)
        .filter(|line| !line.trim().starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.chars().count() < MAX_METADATA_KEY_LEN)
        .filter_map(|(key, value)| {
            let key = key.trim().to_lowercase().replace(' ', "_");
            let value = value.trim();
            let usable = !key.is_empty()
                && !value.is_empty()
                && value.chars().count() < MAX_METADATA_VALUE_LEN;
            usable.then(|| (key, value.to_string()))
        })
        .collect()
}

fn complexity(content: &str, lines: &[&str]) -> u32 {
    let mut score: u32 = match content.split_whitespace().count() {
        n if n > 1000 => 3,
        n if n > 500 => 2,
        n if n > 200 => 1,
        _ => 0,
    };

    let sections = lines.iter().filter(|l| l.trim().starts_with('#')).count() as u32;
    let list_items = lines.iter().filter(|l| is_list_item(l.trim())).count() as u32;
    score += sections.min(5);
    score += (list_items / 3).min(3);

    let lower = content.to_lowercase();
    for (keyword, weight) in COMPLEXITY_KEYWORDS {
        score = score.saturating_add(lower.matches(keyword).count() as u32 * weight);
    }

    score.min(MAX_COMPLEXITY)
}
