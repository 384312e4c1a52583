//! Prompt templates for extraction, classification, and structuring.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how the model is instructed
//!    requires editing exactly one place.
//! 2. **Testability** — unit tests can inspect prompts directly without a
//!    live model.

use crate::schema::ExtractionSchema;

/// Default free-form prompt used when the caller supplies none.
pub const DEFAULT_PROMPT: &str = "Extract all important information from this document.";

/// Build the schema-constrained prompt.
///
/// The instruction to answer with *only* a JSON object is load-bearing: the
/// response is fed straight into a JSON parser after fence stripping.
pub fn structured_prompt(schema: &ExtractionSchema) -> String {
    format!(
        "Analyse this document and extract the information according to this JSON schema.\n\
         Respond ONLY with a valid JSON object, with no additional text.\n\n\
         Expected schema:\n{}\n\n\
         If a piece of information is not found, use null.\n",
        schema.to_prompt_json()
    )
}

/// Invoice extraction prompt over OCR text.
pub fn invoice_prompt(ocr_text: &str) -> String {
    format!(
        "You are an expert at extracting data from invoices. Analyse the following OCR text \
         and extract structured information.\n\n\
         DOCUMENT TEXT:\n```\n{ocr_text}\n```\n\n\
         Extract the following information as strict JSON:\n\n{schema}\n\n\
         IMPORTANT RULES:\n\
         1. Return ONLY the JSON, with no text before or after\n\
         2. Use null for fields that are not found\n\
         3. Amounts must be numbers, not strings\n\
         4. Dates must be in YYYY-MM-DD format\n\
         5. The confidence score reflects extraction quality (1.0 = very confident)\n\
         6. Extract as much line-item detail as possible\n\n\
         JSON:",
        schema = ExtractionSchema::invoice().to_prompt_json(),
    )
}

/// Contract extraction prompt over OCR text.
pub fn contract_prompt(ocr_text: &str) -> String {
    format!(
        "You are an expert at legal analysis of contracts. Analyse the following OCR text \
         and extract structured information.\n\n\
         DOCUMENT TEXT:\n```\n{ocr_text}\n```\n\n\
         Extract the following information as strict JSON:\n\n{schema}\n\n\
         IMPORTANT RULES:\n\
         1. Return ONLY the JSON, with no text before or after\n\
         2. Use null for fields that are not found\n\
         3. Amounts must be numbers, not strings\n\
         4. Dates must be in YYYY-MM-DD format\n\
         5. Identify the important clauses (confidentiality, penalties, termination, ...)\n\
         6. The confidence score reflects extraction quality\n\n\
         JSON:",
        schema = ExtractionSchema::contract().to_prompt_json(),
    )
}

/// Document-type classification prompt over OCR text.
pub fn classification_prompt(ocr_text: &str) -> String {
    format!(
        "Analyse the following text and determine the document type.\n\n\
         TEXT:\n```\n{ocr_text}\n```\n\n\
         Respond with EXACTLY one of the following words:\n\
         - invoice\n\
         - contract\n\
         - unknown\n\n\
         Type:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_prompt_embeds_schema_and_null_rule() {
        let schema = ExtractionSchema::from_value(json!({"total": "number"})).unwrap();
        let prompt = structured_prompt(&schema);
        assert!(prompt.contains("\"total\""));
        assert!(prompt.contains("ONLY with a valid JSON object"));
        assert!(prompt.contains("use null"));
    }

    #[test]
    fn typed_prompts_carry_document_text() {
        let prompt = invoice_prompt("INVOICE #123");
        assert!(prompt.contains("INVOICE #123"));
        assert!(prompt.contains("invoice_number"));

        let prompt = contract_prompt("LEASE AGREEMENT");
        assert!(prompt.contains("LEASE AGREEMENT"));
        assert!(prompt.contains("parties"));
    }

    #[test]
    fn classification_prompt_lists_labels() {
        let prompt = classification_prompt("some text");
        for label in ["invoice", "contract", "unknown"] {
            assert!(prompt.contains(label));
        }
    }
}
