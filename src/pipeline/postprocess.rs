//! Post-processing of model replies: fence stripping and JSON parsing.
//!
//! Models wrap JSON in markdown code fences despite being told not to. The
//! stripping rule is deliberately narrow: after trimming, remove one leading
//! ```` ```json ```` or ```` ``` ```` and one trailing ```` ``` ````.
//! Partially- or multiply-fenced replies are left alone beyond that —
//! anything cleverer guesses at behaviour the models do not promise.

use crate::error::ExtractError;
use crate::schema::ExtractionSchema;
use serde_json::{Map, Value};
use tracing::warn;

/// Strip one layer of outer markdown fencing from a model reply.
///
/// A reply with no fences comes back unchanged (modulo trimming), so fenced
/// and unfenced variants of the same payload parse identically.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse a schema-constrained reply into a field map.
///
/// Malformed JSON or a non-object reply is a [`ExtractError::ResponseNotJson`]
/// — an extraction failure distinct from any transport failure. Keys the
/// schema never asked for are logged, not removed: the subset invariant is
/// best-effort by design.
pub fn parse_structured(
    raw: &str,
    schema: &ExtractionSchema,
) -> Result<Map<String, Value>, ExtractError> {
    let cleaned = strip_code_fences(raw);

    let not_json = |detail: String| ExtractError::ResponseNotJson {
        detail,
        snippet: cleaned.chars().take(80).collect(),
    };

    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| not_json(e.to_string()))?;

    let fields = match value {
        Value::Object(map) => map,
        other => {
            return Err(not_json(format!(
                "expected a JSON object, got {}",
                match other {
                    Value::Array(_) => "an array",
                    Value::String(_) => "a string",
                    Value::Number(_) => "a number",
                    Value::Bool(_) => "a boolean",
                    _ => "null",
                }
            )))
        }
    };

    let extras = schema.unknown_keys(&fields);
    if !extras.is_empty() {
        warn!("Model returned fields outside the schema: {:?}", extras);
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ExtractionSchema {
        ExtractionSchema::from_value(json!({"total": "number", "vendor": "string"})).unwrap()
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(
            strip_code_fences("```json\n{\"a\": 1}\n```"),
            "{\"a\": 1}"
        );
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn unfenced_passthrough() {
        assert_eq!(strip_code_fences("  {\"a\": 1} \n"), "{\"a\": 1}");
    }

    #[test]
    fn fenced_and_unfenced_parse_identically() {
        let bare = r#"{"total": 99.5, "vendor": "Acme"}"#;
        let fenced = format!("```json\n{bare}\n```");
        let a = parse_structured(bare, &schema()).unwrap();
        let b = parse_structured(&fenced, &schema()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_json_is_response_error() {
        let err = parse_structured("Sure! The total is 99.5", &schema()).unwrap_err();
        assert!(err.is_response_error());
        assert!(err.to_string().contains("Sure!"));
    }

    #[test]
    fn non_object_json_is_response_error() {
        let err = parse_structured("[1, 2, 3]", &schema()).unwrap_err();
        assert!(err.is_response_error());
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn extra_keys_survive_with_warning() {
        let result =
            parse_structured(r#"{"total": 1, "bonus": true}"#, &schema()).unwrap();
        assert!(result.contains_key("bonus"));
    }

    #[test]
    fn null_fields_are_preserved() {
        let result = parse_structured(r#"{"total": null}"#, &schema()).unwrap();
        assert_eq!(result.get("total"), Some(&Value::Null));
    }
}
