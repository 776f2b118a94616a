//! Vision-model boundary: the [`VisionModel`] trait, the shipped
//! OpenAI-compatible HTTP client, and the per-page retry loop.
//!
//! The trait keeps inference injectable — tests and embedders supply their
//! own impl, the CLI uses [`OpenAiCompatibleClient`]. All prompt engineering
//! lives in [`crate::prompts`] so it can be changed without touching retry
//! or error-handling logic here.
//!
//! ## Retry strategy
//!
//! HTTP 429 / 5xx errors from inference APIs are transient and frequent
//! under concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! avoids thundering-herd: with 500 ms base and 3 retries the wait sequence
//! is 500 ms → 1 s → 2 s, totalling < 4 s of back-off per page.
//!
//! ## Failure contract
//!
//! [`transcribe_page`] always returns a transcript — after the final retry a
//! failed page surfaces as an **empty string** plus a [`PageError`], never an
//! abort. Downstream, an empty transcript parses to an empty page and its
//! adjacent seams naturally resolve to no-merge.

use crate::config::ConversionConfig;
use crate::error::{PageError, StitchError};
use crate::pipeline::encode::PageImage;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// One page image → raw Markdown-ish transcript.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Transcribe a single page. `page` is the 0-based index, for logging.
    async fn transcribe(
        &self,
        page: usize,
        image: &PageImage,
        system_prompt: &str,
    ) -> Result<String, ModelCallError>;
}

/// A single failed model call, before retry policy is applied.
#[derive(Debug)]
pub struct ModelCallError {
    pub detail: String,
    pub timed_out: bool,
}

impl std::fmt::Display for ModelCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Result of one page's transcription, error included rather than propagated.
pub struct PageTranscript {
    pub page: usize,
    pub raw: String,
    pub duration_ms: u64,
    pub error: Option<PageError>,
}

/// Run one page through the model with the configured retry policy.
pub async fn transcribe_page(
    model: &dyn VisionModel,
    page: usize,
    image: &PageImage,
    config: &ConversionConfig,
) -> PageTranscript {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let mut last_err: Option<ModelCallError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page + 1,
                attempt,
                config.max_retries,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match model.transcribe(page, image, system_prompt).await {
            Ok(raw) => {
                let duration = start.elapsed();
                debug!("Page {}: {} chars in {:?}", page + 1, raw.len(), duration);
                return PageTranscript {
                    page,
                    raw,
                    duration_ms: duration.as_millis() as u64,
                    error: None,
                };
            }
            Err(e) => {
                warn!("Page {}: attempt {} failed — {}", page + 1, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    // All retries exhausted: empty transcript, recorded error, no abort.
    let duration = start.elapsed();
    let error = match last_err {
        Some(e) if e.timed_out => PageError::Timeout {
            page,
            secs: config.api_timeout_secs,
        },
        Some(e) => PageError::ModelFailed {
            page,
            retries: config.max_retries,
            detail: e.detail,
        },
        None => PageError::ModelFailed {
            page,
            retries: config.max_retries,
            detail: "unknown error".into(),
        },
    };

    PageTranscript {
        page,
        raw: String::new(),
        duration_ms: duration.as_millis() as u64,
        error: Some(error),
    }
}

// ── OpenAI-compatible client ─────────────────────────────────────────────

/// Vision client for any `/v1/chat/completions`-shaped endpoint.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAiCompatibleClient {
    /// Build a client from the config, falling back to `PAGESTITCH_BASE_URL`
    /// and `PAGESTITCH_API_KEY` for endpoint details.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, StitchError> {
        let base_url = config
            .base_url
            .clone()
            .or_else(|| std::env::var("PAGESTITCH_BASE_URL").ok())
            .ok_or_else(|| StitchError::ModelNotConfigured {
                hint: "Set --base-url or PAGESTITCH_BASE_URL to an OpenAI-compatible endpoint."
                    .into(),
            })?;
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("PAGESTITCH_API_KEY").ok())
            .unwrap_or_default();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| StitchError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone().unwrap_or_else(|| "gpt-4o".into()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl VisionModel for OpenAiCompatibleClient {
    async fn transcribe(
        &self,
        page: usize,
        image: &PageImage,
        system_prompt: &str,
    ) -> Result<String, ModelCallError> {
        // The empty user text is intentional: the API requires at least one
        // user turn to respond to, but the image carries all the content.
        let body = json!({
            "model": self.model.as_str(),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": [
                    { "type": "text", "text": "" },
                    { "type": "image_url", "image_url": { "url": image.data_uri.as_str(), "detail": "high" } }
                ]}
            ]
        });

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| ModelCallError {
            timed_out: e.is_timeout(),
            detail: format!("page {}: {e}", page + 1),
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ModelCallError {
                timed_out: false,
                detail: format!("HTTP {status}: {}", text.chars().take(200).collect::<String>()),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ModelCallError {
            timed_out: false,
            detail: format!("malformed response: {e}"),
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }
}
