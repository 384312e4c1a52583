//! Configuration for document extraction.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`] or seeded from a TOML file with
//! [`ExtractionConfig::from_file`]. Keeping every knob in one struct makes it
//! trivial to share configs across calls and to diff two runs.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for an extraction run.
///
/// # Example
/// ```rust
/// use docfields::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .model_name("gemini-2.0-flash-001")
///     .use_mock(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 150.
    ///
    /// DPI is a zoom factor relative to the PDF's base 72-DPI coordinate
    /// space. Higher values improve small-text legibility at the cost of
    /// payload size and per-call latency.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI so an oversized page cannot exhaust
    /// memory or blow past the API's upload limits.
    pub max_rendered_pixels: u32,

    /// Vision model identifier. Default: "gemini-2.0-flash-001".
    pub model_name: String,

    /// Google Cloud project ID for the Vertex endpoint. Optional when an
    /// API key is used instead.
    pub project_id: Option<String>,

    /// Vertex AI region. Default: "europe-west1".
    pub location: String,

    /// API key for the public generative-language endpoint. Takes precedence
    /// over `project_id` when both are set.
    pub api_key: Option<String>,

    /// Use the offline mock model instead of a remote API. Default: false.
    pub use_mock: bool,

    /// Sampling temperature. Default: 0.1 — extraction wants the model
    /// faithful to what is on the page, not creative.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_output_tokens: u32,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// OCR engine settings.
    pub ocr: OcrSettings,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            model_name: "gemini-2.0-flash-001".to_string(),
            project_id: None,
            location: "europe-west1".to_string(),
            api_key: None,
            use_mock: false,
            temperature: 0.1,
            max_output_tokens: 4096,
            pages: PageSelection::default(),
            ocr: OcrSettings::default(),
        }
    }
}

impl ExtractionConfig {
    /// Create a new builder.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Seed a builder from a TOML configuration file.
    ///
    /// Missing sections and keys keep their defaults; CLI flags applied on
    /// top of the returned builder win over file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<ExtractionConfigBuilder, ExtractError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ExtractError::ConfigLoadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let file: FileConfig = toml::from_str(&raw).map_err(|e| ExtractError::ConfigLoadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let mut builder = Self::builder();
        if let Some(model) = file.model {
            if let Some(v) = model.project_id {
                builder = builder.project_id(v);
            }
            if let Some(v) = model.location {
                builder = builder.location(v);
            }
            if let Some(v) = model.model_name {
                builder = builder.model_name(v);
            }
            if let Some(v) = model.api_key {
                builder = builder.api_key(v);
            }
            if let Some(v) = model.use_mock {
                builder = builder.use_mock(v);
            }
        }
        if let Some(ocr) = file.ocr {
            if let Some(v) = ocr.lang {
                builder = builder.ocr_lang(v);
            }
            if let Some(v) = ocr.psm {
                builder.config.ocr.psm = v;
            }
            if let Some(v) = ocr.oem {
                builder.config.ocr.oem = v;
            }
        }
        if let Some(render) = file.render {
            if let Some(v) = render.dpi {
                builder = builder.dpi(v);
            }
            if let Some(v) = render.max_rendered_pixels {
                builder = builder.max_rendered_pixels(v);
            }
        }
        Ok(builder)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.config.model_name = name.into();
        self
    }

    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.config.project_id = Some(id.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config.location = location.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn use_mock(mut self, v: bool) -> Self {
        self.config.use_mock = v;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.lang = lang.into();
        self
    }

    pub fn ocr(mut self, settings: OcrSettings) -> Self {
        self.config.ocr = settings;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.ocr.lang.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Tesseract engine settings.
///
/// `lang` accepts a single language ("eng", "fra") or a combined set
/// ("fra+eng"). `psm` and `oem` map to the engine's `--psm` / `--oem` flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    pub lang: String,
    pub psm: u8,
    pub oem: u8,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            lang: "eng".to_string(),
            psm: 6,
            oem: 3,
        }
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the document to process. Indices are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Process all pages (default).
    #[default]
    All,
    /// Process specific pages.
    Set(Vec<usize>),
    /// Process a contiguous inclusive range.
    Range(usize, usize),
}

impl PageSelection {
    /// Parse a selector string: `"all"`, `"a,b,c"`, `"a-b"`, or a mixed form
    /// such as `"0,2-4,7"`. Indices are 0-based.
    pub fn parse(s: &str) -> Result<Self, ExtractError> {
        let trimmed = s.trim();
        let invalid = |detail: &str| ExtractError::InvalidPageSelector {
            selector: s.to_string(),
            detail: detail.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty selector"));
        }
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        // Pure range with no commas keeps its own representation so callers
        // can see what was asked for.
        if !trimmed.contains(',') {
            if let Some((start, end)) = trimmed.split_once('-') {
                let start: usize = start
                    .trim()
                    .parse()
                    .map_err(|_| invalid("range start is not a number"))?;
                let end: usize = end
                    .trim()
                    .parse()
                    .map_err(|_| invalid("range end is not a number"))?;
                if start > end {
                    return Err(invalid("range start must be <= end"));
                }
                return Ok(PageSelection::Range(start, end));
            }
            let page: usize = trimmed.parse().map_err(|_| invalid("not a number"))?;
            return Ok(PageSelection::Set(vec![page]));
        }

        let mut pages = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: usize = start
                    .trim()
                    .parse()
                    .map_err(|_| invalid("range start is not a number"))?;
                let end: usize = end
                    .trim()
                    .parse()
                    .map_err(|_| invalid("range end is not a number"))?;
                if start > end {
                    return Err(invalid("range start must be <= end"));
                }
                pages.extend(start..=end);
            } else {
                pages.push(part.parse().map_err(|_| invalid("not a number"))?);
            }
        }
        Ok(PageSelection::Set(pages))
    }

    /// Expand the selection into a sorted, deduplicated list of 0-based page
    /// indices. Out-of-range indices are dropped; a zero-page document yields
    /// an empty list.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Set(pages) => {
                pages.iter().copied().filter(|&p| p < total_pages).collect()
            }
            PageSelection::Range(start, end) => (*start..=*end)
                .filter(|&p| p < total_pages)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl std::str::FromStr for PageSelection {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageSelection::parse(s)
    }
}

// ── File config ──────────────────────────────────────────────────────────

/// On-disk TOML configuration.
///
/// ```toml
/// [model]
/// project_id = "my-project"
/// location   = "europe-west1"
/// model_name = "gemini-2.0-flash-001"
/// use_mock   = false
///
/// [ocr]
/// lang = "fra+eng"
/// psm  = 6
/// oem  = 3
///
/// [render]
/// dpi = 150
/// ```
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    model: Option<FileModelConfig>,
    ocr: Option<FileOcrConfig>,
    render: Option<FileRenderConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileModelConfig {
    project_id: Option<String>,
    location: Option<String>,
    model_name: Option<String>,
    api_key: Option<String>,
    use_mock: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FileOcrConfig {
    lang: Option<String>,
    psm: Option<u8>,
    oem: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct FileRenderConfig {
    dpi: Option<u32>,
    max_rendered_pixels: Option<u32>,
}
