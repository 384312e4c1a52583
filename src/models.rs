//! Typed extraction results for the built-in document kinds.
//!
//! Vision models return JSON that is *mostly* right: dates arrive as
//! `"15/03/2024"` instead of ISO, amounts as `"1 234,56 €"` instead of
//! numbers. Construction from the raw JSON map is therefore lenient — a
//! field that cannot be coerced becomes `None` with a warning rather than
//! failing the whole extraction.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// The document types with dedicated prompts and typed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Contract,
    /// No dedicated prompt; free-form extraction or raw OCR text.
    Generic,
}

impl DocumentKind {
    /// Lenient parse, used on classifier replies. Anything unrecognised is
    /// [`DocumentKind::Generic`].
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => DocumentKind::Invoice,
            "contract" => DocumentKind::Contract,
            _ => DocumentKind::Generic,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Contract => "contract",
            DocumentKind::Generic => "generic",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

// ── Invoice ──────────────────────────────────────────────────────────────

/// One line of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total_excl_tax: Option<f64>,
    pub tax_rate: Option<f64>,
}

/// An extracted invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,

    pub supplier_name: Option<String>,
    pub supplier_address: Option<String>,
    pub supplier_siret: Option<String>,
    pub supplier_vat_number: Option<String>,

    pub client_name: Option<String>,
    pub client_address: Option<String>,
    pub client_siret: Option<String>,

    pub total_excl_tax: Option<f64>,
    pub total_tax: Option<f64>,
    pub total_incl_tax: Option<f64>,

    pub line_items: Vec<LineItem>,

    pub confidence_score: Option<f64>,
}

impl Invoice {
    /// Build from the model's JSON object, coercing field formats leniently.
    pub fn from_json(data: &Map<String, Value>) -> Self {
        let line_items = data
            .get("line_items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|item| LineItem {
                        description: string_field(item, "description").unwrap_or_default(),
                        quantity: number_field(item, "quantity"),
                        unit_price: number_field(item, "unit_price"),
                        total_excl_tax: number_field(item, "total_excl_tax"),
                        tax_rate: number_field(item, "tax_rate"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Invoice {
            invoice_number: string_field(data, "invoice_number"),
            invoice_date: date_field(data, "invoice_date"),
            due_date: date_field(data, "due_date"),
            supplier_name: string_field(data, "supplier_name"),
            supplier_address: string_field(data, "supplier_address"),
            supplier_siret: string_field(data, "supplier_siret"),
            supplier_vat_number: string_field(data, "supplier_vat_number"),
            client_name: string_field(data, "client_name"),
            client_address: string_field(data, "client_address"),
            client_siret: string_field(data, "client_siret"),
            total_excl_tax: number_field(data, "total_excl_tax"),
            total_tax: number_field(data, "total_tax"),
            total_incl_tax: number_field(data, "total_incl_tax"),
            line_items,
            confidence_score: number_field(data, "confidence_score"),
        }
    }
}

// ── Contract ─────────────────────────────────────────────────────────────

/// Contract categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Service,
    Employment,
    Lease,
    Sale,
    Nda,
    Partnership,
    Other,
}

impl ContractType {
    fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => ContractType::Service,
            "employment" => ContractType::Employment,
            "lease" => ContractType::Lease,
            "sale" => ContractType::Sale,
            "nda" => ContractType::Nda,
            "partnership" => ContractType::Partnership,
            _ => ContractType::Other,
        }
    }
}

/// A contracting party.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub role: Option<String>,
    pub address: Option<String>,
    pub siret: Option<String>,
    pub representative: Option<String>,
}

/// A notable contract clause.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub title: String,
    pub content: String,
    pub importance: Option<String>,
}

/// An extracted contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub contract_type: Option<ContractType>,
    pub contract_number: Option<String>,
    pub title: Option<String>,

    pub parties: Vec<Party>,

    pub signature_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration: Option<String>,

    pub total_amount: Option<f64>,
    pub payment_terms: Option<String>,
    pub currency: Option<String>,

    pub key_clauses: Vec<Clause>,

    pub termination_conditions: Option<String>,
    pub renewal_terms: Option<String>,
    pub signatures: Vec<String>,

    pub confidence_score: Option<f64>,
}

impl Contract {
    /// Build from the model's JSON object, coercing field formats leniently.
    pub fn from_json(data: &Map<String, Value>) -> Self {
        let parties = data
            .get("parties")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|p| Party {
                        name: string_field(p, "name").unwrap_or_default(),
                        role: string_field(p, "role"),
                        address: string_field(p, "address"),
                        siret: string_field(p, "siret"),
                        representative: string_field(p, "representative"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let key_clauses = data
            .get("key_clauses")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|c| Clause {
                        title: string_field(c, "title").unwrap_or_default(),
                        content: string_field(c, "content").unwrap_or_default(),
                        importance: string_field(c, "importance"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let signatures = data
            .get("signatures")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Contract {
            contract_type: string_field(data, "contract_type")
                .map(|s| ContractType::from_label(&s)),
            contract_number: string_field(data, "contract_number"),
            title: string_field(data, "title"),
            parties,
            signature_date: date_field(data, "signature_date"),
            effective_date: date_field(data, "effective_date"),
            end_date: date_field(data, "end_date"),
            duration: string_field(data, "duration"),
            total_amount: number_field(data, "total_amount"),
            payment_terms: string_field(data, "payment_terms"),
            currency: string_field(data, "currency"),
            key_clauses,
            termination_conditions: string_field(data, "termination_conditions"),
            renewal_terms: string_field(data, "renewal_terms"),
            signatures,
            confidence_score: number_field(data, "confidence_score"),
        }
    }
}

// ── Lenient field coercion ───────────────────────────────────────────────

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(data: &Map<String, Value>, key: &str) -> Option<f64> {
    match data.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let parsed = parse_amount(s);
            if parsed.is_none() {
                warn!("Could not parse amount for '{}': {:?}", key, s);
            }
            parsed
        }
        _ => None,
    }
}

fn date_field(data: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    match data.get(key) {
        Some(Value::String(s)) => {
            let parsed = parse_date(s);
            if parsed.is_none() {
                warn!("Could not parse date for '{}': {:?}", key, s);
            }
            parsed
        }
        _ => None,
    }
}

static RE_AMOUNT_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s€$£]|EUR|USD").unwrap());

/// Parse an amount from a string: strips currency symbols and spaces,
/// accepts a decimal comma.
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned = RE_AMOUNT_NOISE.replace_all(s, "");
    let cleaned = cleaned.replace(',', ".");
    cleaned.parse::<f64>().ok()
}

/// Parse a date from the formats models actually produce: ISO `YYYY-MM-DD`,
/// `DD/MM/YYYY`, `YYYY/MM/DD`, with `-` or `/` separators.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let normalized = s.replace('-', "/");
    for fmt in ["%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(&normalized, fmt) {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn kind_from_label_is_lenient() {
        assert_eq!(DocumentKind::from_label(" Invoice \n"), DocumentKind::Invoice);
        assert_eq!(DocumentKind::from_label("contract"), DocumentKind::Contract);
        assert_eq!(DocumentKind::from_label("receipt"), DocumentKind::Generic);
    }

    #[test]
    fn parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15"), Some(expected));
        assert_eq!(parse_date("15/03/2024"), Some(expected));
        assert_eq!(parse_date("15-03-2024"), Some(expected));
        assert_eq!(parse_date("2024/03/15"), Some(expected));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn parse_amount_formats() {
        assert_eq!(parse_amount("1234.56"), Some(1234.56));
        assert_eq!(parse_amount("1 234,56 €"), Some(1234.56));
        assert_eq!(parse_amount("120EUR"), Some(120.0));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn invoice_from_json_coerces_fields() {
        let data = as_map(json!({
            "invoice_number": "F-2024-001",
            "invoice_date": "15/03/2024",
            "total_incl_tax": "1 200,00 €",
            "total_excl_tax": 1000.0,
            "line_items": [
                {"description": "Consulting", "quantity": 2, "unit_price": "500"}
            ],
            "confidence_score": 0.9
        }));
        let invoice = Invoice::from_json(&data);
        assert_eq!(invoice.invoice_number.as_deref(), Some("F-2024-001"));
        assert_eq!(
            invoice.invoice_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(invoice.total_incl_tax, Some(1200.0));
        assert_eq!(invoice.total_excl_tax, Some(1000.0));
        assert_eq!(invoice.line_items.len(), 1);
        assert_eq!(invoice.line_items[0].unit_price, Some(500.0));
        // absent field stays absent, never fabricated
        assert!(invoice.due_date.is_none());
        assert!(invoice.total_tax.is_none());
    }

    #[test]
    fn invoice_null_fields_stay_none() {
        let data = as_map(json!({
            "invoice_number": null,
            "total_incl_tax": null
        }));
        let invoice = Invoice::from_json(&data);
        assert!(invoice.invoice_number.is_none());
        assert!(invoice.total_incl_tax.is_none());
    }

    #[test]
    fn contract_from_json_parses_nested() {
        let data = as_map(json!({
            "contract_type": "LEASE",
            "title": "Office lease",
            "parties": [
                {"name": "Acme SARL", "role": "lessor"},
                {"name": "Widget SAS", "role": "lessee", "siret": "12345678901234"}
            ],
            "signature_date": "2023-01-10",
            "total_amount": "24 000",
            "key_clauses": [
                {"title": "termination", "content": "3 months notice", "importance": "high"}
            ],
            "signatures": ["A. Dupont", "B. Martin"]
        }));
        let contract = Contract::from_json(&data);
        assert_eq!(contract.contract_type, Some(ContractType::Lease));
        assert_eq!(contract.parties.len(), 2);
        assert_eq!(contract.parties[1].siret.as_deref(), Some("12345678901234"));
        assert_eq!(contract.total_amount, Some(24000.0));
        assert_eq!(contract.key_clauses[0].importance.as_deref(), Some("high"));
        assert_eq!(contract.signatures.len(), 2);
    }

    #[test]
    fn unknown_contract_type_is_other() {
        let data = as_map(json!({"contract_type": "barter"}));
        assert_eq!(
            Contract::from_json(&data).contract_type,
            Some(ContractType::Other)
        );
    }
}
