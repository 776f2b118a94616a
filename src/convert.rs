//! Top-level conversion entry points.
//!
//! Orchestrates the full pipeline: resolve input, rasterise, encode, run
//! per-page inference concurrently, parse each transcript, then sweep the
//! seams sequentially through the [`DocumentAssembler`]. Inference is the
//! only parallel stage — pages are independent owned data until the sweep,
//! which is inherently ordered.

use crate::assemble::DocumentAssembler;
use crate::block::Block;
use crate::config::ConversionConfig;
use crate::error::{PageError, StitchError};
use crate::output::{ConversionStats, Document, PageOutcome};
use crate::parse;
use crate::pipeline::llm::{transcribe_page, OpenAiCompatibleClient, VisionModel};
use crate::pipeline::{encode, input, render};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a PDF file or URL to a stitched [`Document`].
///
/// This is the primary entry point for the library. The shipped
/// OpenAI-compatible client is constructed from the config; use
/// [`convert_with_model`] to inject a different [`VisionModel`].
///
/// # Errors
/// Returns `Err(StitchError)` only for fatal errors:
/// - File not found / permission denied / not a valid PDF
/// - Zero pages selected or rendered
/// - All pages failed after retries
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<Document, StitchError> {
    let model = OpenAiCompatibleClient::from_config(config)?;
    convert_with_model(input_str, &model, config).await
}

/// Convert a PDF with a caller-supplied vision model.
pub async fn convert_with_model(
    input_str: impl AsRef<str>,
    model: &dyn VisionModel,
    config: &ConversionConfig,
) -> Result<Document, StitchError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Compute page indices ─────────────────────────────────────
    let total_pages = render::page_count(&pdf_path, config.password.as_deref()).await?;
    info!("PDF has {} pages", total_pages);
    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(StitchError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    debug!("Selected {} pages for conversion", page_indices.len());

    // ── Step 3: Rasterise pages ──────────────────────────────────────────
    let rendered = render::render_pages(&pdf_path, config, &page_indices).await?;
    if rendered.is_empty() {
        return Err(StitchError::EmptyDocument);
    }

    // ── Step 4: Encode images ────────────────────────────────────────────
    let encoded: Vec<(usize, encode::PageImage)> = rendered
        .iter()
        .filter_map(|(idx, img)| match encode::encode_page(img) {
            Ok(data) => Some((*idx, data)),
            Err(e) => {
                warn!("Failed to encode page {}: {}", idx + 1, e);
                None
            }
        })
        .collect();

    // ── Step 5: Inference + parse, concurrently per page ─────────────────
    let mut parsed = transcribe_and_parse(model, &encoded, config).await;

    // The seam sweep needs strict page order; inference completes in
    // arbitrary order under buffer_unordered.
    parsed.sort_by_key(|p| p.page);

    // Genuinely empty pages are tolerated; only hard failures (model/render)
    // across the board make the run fatal.
    let is_hard_failure = |o: &PageOutcome| {
        matches!(o.error, Some(ref e) if !matches!(e, PageError::EmptyOutput { .. }))
    };
    if parsed.iter().all(|p| is_hard_failure(&p.outcome)) {
        let first_error = parsed
            .iter()
            .find_map(|p| p.outcome.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".into());
        return Err(StitchError::AllPagesFailed {
            total: parsed.len(),
            retries: config.max_retries,
            first_error,
        });
    }

    // ── Step 6: Sequential seam sweep ────────────────────────────────────
    let mut assembler = DocumentAssembler::new(config.seam_thresholds(), config.drop_furniture);
    let mut outcomes = Vec::with_capacity(parsed.len());
    for mut page in parsed {
        page.outcome.furniture_dropped = assembler.push_page(page.page, page.blocks);
        outcomes.push(page.outcome);
    }
    let assembly = assembler.finish()?;

    // ── Step 7: Stats ────────────────────────────────────────────────────
    let failed = outcomes.iter().filter(|o| is_hard_failure(o)).count();
    let empty = outcomes
        .iter()
        .filter(|o| o.block_count == 0 && !is_hard_failure(o))
        .count();
    let stats = ConversionStats {
        total_pages: outcomes.len(),
        failed_pages: failed,
        empty_pages: empty,
        output_blocks: assembly.blocks.len(),
        input_blocks: assembly.input_blocks,
        merges: assembly.merges,
        furniture_dropped: assembly.furniture_dropped,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        pages: outcomes,
    };

    info!(
        "Conversion complete: {} pages, {} blocks, {} merges, {}ms total",
        stats.total_pages, stats.output_blocks, stats.merges, stats.total_duration_ms
    );

    Ok(Document {
        blocks: assembly.blocks,
        stats,
    })
}

/// Convert a PDF and write Markdown output directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, StitchError> {
    let document = convert(input_str, config).await?;
    let path = output_path.as_ref();
    write_atomic(path, &document.to_markdown()).await?;
    Ok(document.stats)
}

/// Atomic write: write to temp, then rename.
async fn write_atomic(path: &Path, content: &str) -> Result<(), StitchError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StitchError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(|e| StitchError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| StitchError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<Document, StitchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StitchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Convert PDF bytes in memory.
///
/// Internally the library writes `bytes` to a managed [`tempfile`] and cleans
/// it up automatically on return or panic. This is the recommended API when
/// PDF data comes from a database, network stream, or in-memory buffer.
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<Document, StitchError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| StitchError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| StitchError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(&path, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// A page after inference and parsing, ready for the sweep.
struct ParsedPage {
    page: usize,
    blocks: Vec<Block>,
    outcome: PageOutcome,
}

/// Run inference and parsing for all pages with bounded concurrency.
///
/// Every failure mode lands in the page's [`PageOutcome`]: a failed or empty
/// transcript becomes a zero-block page, never an error.
async fn transcribe_and_parse(
    model: &dyn VisionModel,
    pages: &[(usize, encode::PageImage)],
    config: &ConversionConfig,
) -> Vec<ParsedPage> {
    stream::iter(pages.iter().map(|(idx, image)| async move {
        let transcript = transcribe_page(model, *idx, image, config).await;

        let (blocks, error) = match transcript.error {
            Some(e) => (Vec::new(), Some(e)),
            None => match parse::parse_page(&transcript.raw, *idx) {
                Ok(blocks) => (blocks, None),
                Err(parse::EmptyPage) => {
                    (Vec::new(), Some(PageError::EmptyOutput { page: *idx }))
                }
            },
        };

        ParsedPage {
            page: *idx,
            outcome: PageOutcome {
                page: *idx,
                block_count: blocks.len(),
                furniture_dropped: 0,
                inference_ms: transcript.duration_ms,
                error,
            },
            blocks,
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}
