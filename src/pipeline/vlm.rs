//! Vision-model adapter: one batched multimodal request per call.
//!
//! The request body carries **all page images first and the instruction text
//! as the final part** of a single user turn. That ordering is part of the
//! adapter's contract — trailing instructions are followed more reliably —
//! and must not be rearranged.
//!
//! There is exactly one request/response exchange per call: no retry, no
//! backoff, no independently enforced timeout. Failures surface as-is.
//!
//! [`MockModel`] provides an offline stand-in that answers classification
//! and extraction prompts deterministically, so the whole pipeline can be
//! exercised without credentials.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::encode::PagePayload;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A model that accepts an ordered list of page images plus a trailing
/// prompt and returns raw text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Issue a single generate call. `images` may be empty for text-only
    /// prompts (classification, OCR-text extraction).
    async fn generate(&self, images: &[PagePayload], prompt: &str)
        -> Result<String, ExtractError>;
}

/// Pick the model implementation for a config: the mock when `use_mock` is
/// set, the Gemini client otherwise.
pub fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn VisionModel>, ExtractError> {
    if config.use_mock {
        info!("Using offline mock model");
        return Ok(Arc::new(MockModel::default()));
    }
    Ok(Arc::new(GeminiClient::from_config(config)?))
}

// ── Gemini client ────────────────────────────────────────────────────────

/// Where the `generateContent` call goes and how it authenticates.
#[derive(Debug)]
enum Endpoint {
    /// Public generative-language endpoint, `?key=` auth.
    ApiKey(String),
    /// Regional Vertex endpoint for a project, caller-supplied bearer token.
    Vertex {
        project_id: String,
        location: String,
        token: String,
    },
}

/// Client for the Gemini `generateContent` REST surface.
///
/// The transport/auth handshake itself is not reimplemented: API-key mode
/// sends the key as a query parameter; Vertex mode expects an OAuth bearer
/// token in `GOOGLE_VERTEX_TOKEN` (e.g. from `gcloud auth
/// print-access-token`).
#[derive(Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    model_name: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Build a client from the extraction config.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let endpoint = if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Endpoint::ApiKey(key.to_string())
        } else if let Some(project) = config.project_id.as_deref().filter(|p| !p.is_empty()) {
            let token = std::env::var("GOOGLE_VERTEX_TOKEN").map_err(|_| {
                ExtractError::ModelNotConfigured {
                    hint: "Vertex mode needs an access token in GOOGLE_VERTEX_TOKEN \
                           (gcloud auth print-access-token)."
                        .to_string(),
                }
            })?;
            Endpoint::Vertex {
                project_id: project.to_string(),
                location: config.location.clone(),
                token,
            }
        } else {
            return Err(ExtractError::ModelNotConfigured {
                hint: "Set an API key (GEMINI_API_KEY / --api-key), a project ID \
                       (GOOGLE_CLOUD_PROJECT / --project), or --mock."
                    .to_string(),
            });
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            model_name: config.model_name.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn url(&self) -> String {
        match &self.endpoint {
            Endpoint::ApiKey(_) => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                self.model_name
            ),
            Endpoint::Vertex {
                project_id,
                location,
                ..
            } => format!(
                "https://{location}-aiplatform.googleapis.com/v1/projects/{project_id}/locations/{location}/publishers/google/models/{model}:generateContent",
                model = self.model_name
            ),
        }
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(
        &self,
        images: &[PagePayload],
        prompt: &str,
    ) -> Result<String, ExtractError> {
        // Image parts first, the instruction text as the last part.
        let mut parts: Vec<Part> = images
            .iter()
            .map(|img| Part::InlineData {
                inline_data: InlineData {
                    mime_type: img.mime_type.to_string(),
                    data: img.data.clone(),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: prompt.to_string(),
        });

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        debug!(
            model = %self.model_name,
            images = images.len(),
            prompt_len = prompt.len(),
            "Sending generateContent request"
        );

        let mut builder = self.http.post(self.url()).json(&request);
        builder = match &self.endpoint {
            Endpoint::ApiKey(key) => builder.query(&[("key", key.as_str())]),
            Endpoint::Vertex { token, .. } => builder.bearer_auth(token),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ExtractError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(ExtractError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let reply: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ExtractError::RequestFailed {
                    reason: format!("malformed API response: {}", e),
                })?;

        let text = reply.text();
        if text.is_empty() {
            let message = reply
                .block_reason()
                .map(|r| format!("empty reply, block reason: {}", r))
                .unwrap_or_else(|| "empty reply with no candidates".to_string());
            return Err(ExtractError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inline_data")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

// ── Mock model ───────────────────────────────────────────────────────────

static RE_INVOICE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    // The captured token must contain a digit so prose like "invoice number"
    // never matches.
    Regex::new(r"(?i)(?:INVOICE|FACTURE)\s*(?:N[°o]?\s*)?[#:]?\s*([A-Z]{0,3}-?\d[\w/-]*)")
        .unwrap()
});
static RE_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)TOTAL[^\d\n]*([\d][\d\s]*[.,]?\d*)").unwrap());
static RE_FENCED_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap());

/// Offline model for tests and demos.
///
/// Answers are derived from the prompt text alone (the OCR-text prompts
/// embed the document, so the answers track the document content). JSON
/// replies are wrapped in ```json fences the way real models often do, which
/// keeps the fence stripper honest.
#[derive(Debug, Default)]
pub struct MockModel;

impl MockModel {
    /// The document text embedded between ``` fences in a prompt, or the
    /// whole prompt when there are no fences. The templates themselves
    /// mention "invoice" and "contract", so keyword scans must not see them.
    fn embedded_text(prompt: &str) -> &str {
        RE_FENCED_TEXT
            .captures(prompt)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(prompt)
    }

    fn classify(prompt: &str) -> &'static str {
        let lower = Self::embedded_text(prompt).to_ascii_lowercase();
        if lower.contains("invoice") || lower.contains("facture") {
            "invoice"
        } else if lower.contains("contract")
            || lower.contains("contrat")
            || lower.contains("agreement")
            || lower.contains("lease")
        {
            "contract"
        } else {
            "unknown"
        }
    }

    fn invoice_reply(prompt: &str) -> String {
        let text = Self::embedded_text(prompt);
        let number = RE_INVOICE_NUMBER
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| format!("\"{}\"", m.as_str()))
            .unwrap_or_else(|| "null".to_string());
        let total = RE_TOTAL
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().replace(' ', "").replace(',', "."))
            .unwrap_or_else(|| "null".to_string());
        format!(
            "```json\n{{\n  \"invoice_number\": {number},\n  \"total_incl_tax\": {total},\n  \"confidence_score\": 0.75\n}}\n```"
        )
    }

    fn contract_reply() -> String {
        "```json\n{\n  \"contract_type\": \"service\",\n  \"title\": \"Service agreement\",\n  \"parties\": [{\"name\": \"Party A\", \"role\": \"provider\"}, {\"name\": \"Party B\", \"role\": \"client\"}],\n  \"confidence_score\": 0.6\n}\n```"
            .to_string()
    }
}

#[async_trait]
impl VisionModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        _images: &[PagePayload],
        prompt: &str,
    ) -> Result<String, ExtractError> {
        // Classification prompts ask for exactly one word.
        if prompt.contains("Respond with EXACTLY one") {
            return Ok(Self::classify(prompt).to_string());
        }

        let wants_json = prompt.contains("JSON");
        if wants_json {
            if prompt.contains("invoice_number") {
                return Ok(Self::invoice_reply(prompt));
            }
            if prompt.contains("contract_type") {
                return Ok(Self::contract_reply());
            }
            // Unrecognised schema: an honest empty object, still fenced.
            return Ok("```json\n{}\n```".to_string());
        }

        // Free-form: echo anything that looks like an identifier, else a
        // fixed phrase.
        if let Some(c) = RE_INVOICE_NUMBER.captures(prompt) {
            return Ok(format!("The invoice number is {}.", &c[1]));
        }
        Ok("No notable fields were found in the document.".to_string())
    }
}
