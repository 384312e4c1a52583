//! Extraction schemas: the caller's description of the fields to extract.
//!
//! A schema is an ordered JSON object mapping field names to a type
//! description the model can follow, e.g.
//! `{"invoice_number": "string or null", "total": "number"}`. Nesting is
//! allowed (arrays of objects for line items). The schema shapes the prompt
//! only — the model is *asked* to return a matching object, and the
//! "result keys are a subset of schema keys" invariant is checked
//! best-effort, never enforced.

use crate::error::ExtractError;
use serde_json::{json, Map, Value};
use std::path::Path;

/// A field schema supplied by the caller or built in for a document kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSchema {
    fields: Map<String, Value>,
}

impl ExtractionSchema {
    /// Build a schema from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::Object(fields) if !fields.is_empty() => Ok(Self { fields }),
            Value::Object(_) => Err(ExtractError::InvalidSchema {
                path: Path::new("<inline>").to_path_buf(),
                detail: "schema object is empty".to_string(),
            }),
            other => Err(ExtractError::InvalidSchema {
                path: Path::new("<inline>").to_path_buf(),
                detail: format!("expected a JSON object, got {}", type_name(&other)),
            }),
        }
    }

    /// Load a schema from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ExtractError::InvalidSchema {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| ExtractError::InvalidSchema {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        Self::from_value(value).map_err(|e| match e {
            ExtractError::InvalidSchema { detail, .. } => ExtractError::InvalidSchema {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })
    }

    /// The top-level field names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Pretty-printed JSON used inside the prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&Value::Object(self.fields.clone()))
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// Keys present in `result` that the schema never asked for.
    ///
    /// Supports the best-effort subset invariant: violations are worth a
    /// warning, not an error.
    pub fn unknown_keys(&self, result: &Map<String, Value>) -> Vec<String> {
        result
            .keys()
            .filter(|k| !self.fields.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Built-in invoice schema.
    pub fn invoice() -> Self {
        Self {
            fields: invoice_fields(),
        }
    }

    /// Built-in contract schema.
    pub fn contract() -> Self {
        Self {
            fields: contract_fields(),
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn invoice_fields() -> Map<String, Value> {
    let value = json!({
        "invoice_number": "invoice number or null",
        "invoice_date": "date in YYYY-MM-DD format or null",
        "due_date": "payment due date in YYYY-MM-DD format or null",
        "supplier_name": "supplier name or null",
        "supplier_address": "full supplier address or null",
        "supplier_siret": "SIRET number (14 digits) or null",
        "supplier_vat_number": "intra-community VAT number or null",
        "client_name": "client name or null",
        "client_address": "full client address or null",
        "client_siret": "client SIRET number or null",
        "total_excl_tax": "amount excluding tax as a decimal number or null",
        "total_tax": "tax amount as a decimal number or null",
        "total_incl_tax": "amount including tax as a decimal number or null",
        "line_items": [{
            "description": "product or service description",
            "quantity": "quantity as a number or null",
            "unit_price": "unit price excluding tax as a number or null",
            "total_excl_tax": "line total excluding tax as a number or null",
            "tax_rate": "tax rate as a percentage or null"
        }],
        "confidence_score": "confidence between 0 and 1"
    });
    match value {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}

fn contract_fields() -> Map<String, Value> {
    let value = json!({
        "contract_type": "one of: service|employment|lease|sale|nda|partnership|other",
        "contract_number": "contract reference or null",
        "title": "contract title or null",
        "parties": [{
            "name": "party name",
            "role": "role (seller, buyer, employer, employee, lessor, lessee, ...)",
            "address": "address or null",
            "siret": "SIRET number or null",
            "representative": "legal representative or null"
        }],
        "signature_date": "signature date in YYYY-MM-DD format or null",
        "effective_date": "effective date in YYYY-MM-DD format or null",
        "end_date": "end date in YYYY-MM-DD format or null",
        "duration": "contract duration (e.g. '12 months', '3 years') or null",
        "total_amount": "total amount as a decimal number or null",
        "payment_terms": "payment terms or null",
        "currency": "currency code (EUR, USD, ...), EUR when unstated",
        "key_clauses": [{
            "title": "clause type (confidentiality, non-compete, termination, ...)",
            "content": "clause summary",
            "importance": "high|medium|low"
        }],
        "termination_conditions": "termination conditions or null",
        "renewal_terms": "renewal terms or null",
        "signatures": ["list of identified signatories"],
        "confidence_score": "confidence between 0 and 1"
    });
    match value {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}
