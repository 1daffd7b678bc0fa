//! Parse a fragment file into its named entries. All formats are normalised to a JSON value tree
//! so merging and typed decoding work the same way regardless of the source format.

use crate::error::RegistryError;
use crate::registry::discovery::FragmentFile;
use crate::registry::role::{Format, Role};
use serde_json::{Map, Value};
use std::path::Path;

/// Read and parse one fragment, returning its entries keyed by logical name.
pub fn load(file: &FragmentFile) -> Result<Map<String, Value>, RegistryError> {
    let content = std::fs::read_to_string(&file.path).map_err(|source| RegistryError::Io {
        path: file.path.clone(),
        source,
    })?;
    let doc = parse_document(&content, file.format, &file.path)?;
    entries(doc, file.role, &file.path)
}

/// Parse raw text into a value tree, mapping each format's error location onto line/column.
pub fn parse_document(content: &str, format: Format, path: &Path) -> Result<Value, RegistryError> {
    if is_blank(content, format) {
        return Ok(Value::Null);
    }
    match format {
        Format::Json => serde_json::from_str(content).map_err(|e| RegistryError::FragmentParse {
            path: path.to_path_buf(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        }),
        Format::Yaml => serde_yaml::from_str(content).map_err(|e| {
            let loc = e.location();
            RegistryError::FragmentParse {
                path: path.to_path_buf(),
                line: loc.as_ref().map(|l| l.line()),
                column: loc.as_ref().map(|l| l.column()),
                message: e.to_string(),
            }
        }),
        Format::Toml => toml::from_str(content).map_err(|e| {
            let (line, column) = match e.span() {
                Some(span) => {
                    let (l, c) = line_column(content, span.start);
                    (Some(l), Some(c))
                }
                None => (None, None),
            };
            RegistryError::FragmentParse {
                path: path.to_path_buf(),
                line,
                column,
                message: e.message().to_string(),
            }
        }),
    }
}

/// Pull the role's entry map out of a parsed document.
pub fn entries(doc: Value, role: Role, path: &Path) -> Result<Map<String, Value>, RegistryError> {
    let shape_err = |message: String| RegistryError::FragmentParse {
        path: path.to_path_buf(),
        line: None,
        column: None,
        message,
    };
    let mut top = match doc {
        Value::Null => return Ok(Map::new()),
        Value::Object(m) => m,
        other => {
            return Err(shape_err(format!(
                "expected a document with a '{}' key, got {}",
                role.document_key(),
                json_type(&other)
            )))
        }
    };
    if let Some(unknown) = top.keys().find(|k| k.as_str() != role.document_key()) {
        return Err(shape_err(format!(
            "unknown top-level key '{}' (expected '{}')",
            unknown,
            role.document_key()
        )));
    }
    match top.remove(role.document_key()) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(m)) => {
            if m.keys().any(|k| k.trim().is_empty()) {
                return Err(shape_err("entry names must not be empty".into()));
            }
            Ok(m)
        }
        Some(other) => Err(shape_err(format!(
            "'{}' must be a map of named entries, got {}",
            role.document_key(),
            json_type(&other)
        ))),
    }
}

fn is_blank(content: &str, format: Format) -> bool {
    let comment = match format {
        Format::Json => None,
        Format::Yaml | Format::Toml => Some('#'),
    };
    content.lines().all(|l| {
        let t = l.trim();
        t.is_empty() || comment.map(|c| t.starts_with(c)).unwrap_or(false) || t == "---"
    })
}

/// 1-based line and column of a byte offset.
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map(|s| s.chars().count()).unwrap_or(0) + 1;
    (line, column)
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
