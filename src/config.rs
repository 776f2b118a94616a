//! Configuration types for PDF-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, serialise them for logging, and
//! diff two runs to understand why their outputs differ.

use crate::error::StitchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for a PDF-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pagestitch::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(150)
///     .concurrency(10)
///     .text_similarity_threshold(0.6)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 150.
    ///
    /// 150 DPI is the sweet spot: text is sharp enough for a VLM to read
    /// reliably while image sizes stay well below typical API upload limits.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI, so an oversized page never produces a
    /// multi-hundred-megapixel render.
    pub max_rendered_pixels: u32,

    /// Number of concurrent vision-model API calls. Default: 10.
    ///
    /// Inference is network-bound; pages are independent until the seam
    /// sweep, so parallel calls cut wall-clock time almost linearly until
    /// the endpoint rate-limits.
    pub concurrency: usize,

    /// Model identifier sent to the inference endpoint, e.g. "gpt-4o".
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible inference endpoint.
    /// If None, read from `PAGESTITCH_BASE_URL` at client construction.
    pub base_url: Option<String>,

    /// API key for the inference endpoint.
    /// If None, read from `PAGESTITCH_API_KEY` at client construction.
    pub api_key: Option<String>,

    /// Sampling temperature for the model completion. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to what it sees on the page,
    /// which is what transcription wants.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient model API failure. Default: 3.
    ///
    /// Permanent errors (bad API key, 400) are not retried; after the final
    /// attempt the page surfaces empty output, never an abort.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    // ── Seam reconciliation knobs ─────────────────────────────────────────
    /// Paragraph continuation threshold in [0,1]. Default: 0.5.
    ///
    /// A tail/head paragraph pair merges only when its continuation score is
    /// strictly above this value; exactly-at-threshold resolves to no-merge.
    /// Raise it to merge less aggressively.
    pub text_similarity_threshold: f64,

    /// Table column-signature distance threshold in [0,1]. Default: 0.25.
    ///
    /// A continuation table's first row is treated as a repeated header when
    /// its distance to the tail's header is at or below this value.
    pub table_distance_threshold: f64,

    /// Drop detected page furniture (running headers/footers, page numbers).
    /// Default: true. When false, furniture blocks are kept in the output
    /// (tagged) but still never participate in merges.
    pub drop_furniture: bool,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            concurrency: 10,
            model: None,
            base_url: None,
            api_key: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            password: None,
            system_prompt: None,
            pages: PageSelection::default(),
            text_similarity_threshold: 0.5,
            table_distance_threshold: 0.25,
            drop_furniture: true,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("pages", &self.pages)
            .field("text_similarity_threshold", &self.text_similarity_threshold)
            .field("table_distance_threshold", &self.table_distance_threshold)
            .field("drop_furniture", &self.drop_furniture)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The seam thresholds in the form the matcher consumes.
    pub fn seam_thresholds(&self) -> crate::matcher::SeamThresholds {
        crate::matcher::SeamThresholds {
            text_similarity: self.text_similarity_threshold,
            table_distance: self.table_distance_threshold,
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn text_similarity_threshold(mut self, t: f64) -> Self {
        self.config.text_similarity_threshold = t.clamp(0.0, 1.0);
        self
    }

    pub fn table_distance_threshold(mut self, t: f64) -> Self {
        self.config.table_distance_threshold = t.clamp(0.0, 1.0);
        self
    }

    pub fn drop_furniture(mut self, v: bool) -> Self {
        self.config.drop_furniture = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, StitchError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(StitchError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(StitchError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.text_similarity_threshold) {
            return Err(StitchError::InvalidConfig(format!(
                "text similarity threshold must be in [0,1], got {}",
                c.text_similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&c.table_distance_threshold) {
            return Err(StitchError::InvalidConfig(format!(
                "table distance threshold must be in [0,1], got {}",
                c.table_distance_threshold
            )));
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 150);
        assert_eq!(c.concurrency, 10);
        assert_eq!(c.text_similarity_threshold, 0.5);
        assert_eq!(c.table_distance_threshold, 0.25);
        assert!(c.drop_furniture);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = ConversionConfig::builder()
            .dpi(9999)
            .concurrency(0)
            .text_similarity_threshold(1.5)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.text_similarity_threshold, 1.0);
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(9).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 3).to_indices(5), vec![1, 2]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3, 7]).to_indices(5),
            vec![0, 2]
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ConversionConfig::builder().api_key("secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
    }
}
