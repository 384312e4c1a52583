//! Extraction results and export formats.
//!
//! Results carry no identity and no persistence — the caller chooses an
//! export (JSON or CSV) or consumes the value directly. File writes are
//! atomic (temp file + rename) so a crash never leaves a partial export.

use crate::error::ExtractError;
use crate::models::{Contract, DocumentKind, Invoice};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

/// What the extraction produced.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExtractedData {
    /// Free-form model text or raw OCR text.
    Text(String),
    /// Schema-constrained field map.
    Fields(Map<String, Value>),
    /// Typed invoice result.
    Invoice(Invoice),
    /// Typed contract result.
    Contract(Contract),
}

impl ExtractedData {
    /// The data as a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Plain text when this is a text result.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExtractedData::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Wall-clock accounting for one extraction call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages actually rasterised and sent.
    pub selected_pages: usize,
    pub render_ms: u64,
    /// Present only on the OCR path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_ms: Option<u64>,
    pub model_ms: u64,
    pub total_ms: u64,
}

/// Result of a single extraction call.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    pub kind: DocumentKind,
    pub data: ExtractedData,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// Pretty JSON of the full output (kind + data + stats).
    pub fn to_json_string(&self) -> Result<String, ExtractError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ExtractError::Internal(format!("serialise output: {}", e)))
    }

    /// Pretty JSON of the extracted data only.
    pub fn data_json_string(&self) -> Result<String, ExtractError> {
        serde_json::to_string_pretty(&self.data)
            .map_err(|e| ExtractError::Internal(format!("serialise data: {}", e)))
    }

    /// Single-record CSV of the extracted data: a header row and one value
    /// row. Lists flatten to their element count, one level of nesting to
    /// `parent_child` columns.
    pub fn to_csv_string(&self) -> String {
        let flat = flatten_for_csv(&self.data.to_value());
        let header: Vec<String> = flat.iter().map(|(k, _)| csv_escape(k)).collect();
        let row: Vec<String> = flat.iter().map(|(_, v)| csv_escape(v)).collect();
        format!("{}\n{}\n", header.join(","), row.join(","))
    }

    /// Write the full output as pretty JSON, atomically.
    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ExtractError> {
        write_atomic(path.as_ref(), self.to_json_string()?.as_bytes()).await
    }

    /// Write the CSV export, atomically.
    pub async fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ExtractError> {
        write_atomic(path.as_ref(), self.to_csv_string().as_bytes()).await
    }
}

/// Atomic write: temp file in the target directory, then rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExtractError> {
    fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExtractError + '_ {
        move |source| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(write_err(path))?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(write_err(path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_err(path))
}

/// Flatten a JSON object into ordered `(column, value)` pairs.
///
/// Lists become their length; one level of object nesting becomes
/// `parent_child` columns; anything deeper is rendered as compact JSON.
/// A non-object value becomes a single `value` column.
fn flatten_for_csv(value: &Value) -> Vec<(String, String)> {
    let mut flat = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                match v {
                    Value::Array(items) => flat.push((key.clone(), items.len().to_string())),
                    Value::Object(nested) => {
                        for (sub_key, sub_v) in nested {
                            flat.push((format!("{key}_{sub_key}"), scalar_string(sub_v)));
                        }
                    }
                    other => flat.push((key.clone(), scalar_string(other))),
                }
            }
        }
        other => flat.push(("value".to_string(), scalar_string(other))),
    }
    flat
}

fn scalar_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// RFC-4180 quoting: fields containing separators, quotes, or newlines are
/// wrapped in double quotes with inner quotes doubled.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields_output(data: Value) -> ExtractionOutput {
        let map = match data {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        };
        ExtractionOutput {
            kind: DocumentKind::Generic,
            data: ExtractedData::Fields(map),
            stats: ExtractionStats::default(),
        }
    }

    #[test]
    fn csv_flattens_lists_to_counts() {
        let out = fields_output(json!({
            "invoice_number": "F-1",
            "line_items": [{"description": "a"}, {"description": "b"}]
        }));
        let csv = out.to_csv_string();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "invoice_number,line_items");
        assert_eq!(lines.next().unwrap(), "F-1,2");
    }

    #[test]
    fn csv_flattens_nested_objects() {
        let out = fields_output(json!({
            "supplier": {"name": "Acme", "city": "Paris"}
        }));
        let csv = out.to_csv_string();
        assert!(csv.starts_with("supplier_name,supplier_city\n"));
        assert!(csv.contains("Acme,Paris"));
    }

    #[test]
    fn csv_quotes_awkward_fields() {
        let out = fields_output(json!({"memo": "a, \"quoted\" note"}));
        let csv = out.to_csv_string();
        assert!(csv.contains(r#""a, ""quoted"" note""#));
    }

    #[test]
    fn csv_null_is_empty_cell() {
        let out = fields_output(json!({"total": null, "vendor": "Acme"}));
        assert_eq!(out.to_csv_string(), "total,vendor\n,Acme\n");
    }

    #[test]
    fn text_data_exports_single_column() {
        let out = ExtractionOutput {
            kind: DocumentKind::Generic,
            data: ExtractedData::Text("hello".into()),
            stats: ExtractionStats::default(),
        };
        assert_eq!(out.to_csv_string(), "value\nhello\n");
    }

    #[test]
    fn json_output_carries_kind_and_stats() {
        let out = fields_output(json!({"total": 9}));
        let json = out.to_json_string().unwrap();
        assert!(json.contains("\"kind\": \"generic\""));
        assert!(json.contains("\"total_ms\""));
    }

    #[tokio::test]
    async fn write_json_is_atomic_and_complete() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out/result.json");
        let out = fields_output(json!({"total": 9}));
        out.write_json(&path).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"total\": 9"));
        assert!(!path.with_extension("tmp").exists());
    }
}
