//! # pagestitch
//!
//! Convert PDF documents to one coherent Markdown document using Vision
//! Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! A VLM reads one page image at a time, so per-page transcription produces
//! per-page fragments: a paragraph cut mid-sentence by the page edge, a table
//! whose rows continue on the next page with the header re-emitted, page
//! numbers and running headers sprinkled through the text. This crate runs
//! the per-page inference and then reconciles the fragments — it stitches
//! split paragraphs and tables back together across page boundaries and
//! suppresses page furniture, emitting a single document with provenance.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode    PNG → base64 data URI
//!  ├─ 4. Model     concurrent per-page vision calls (failures → empty page)
//!  ├─ 5. Parse     tolerant Markdown/HTML-table → Block sequences
//!  ├─ 6. Stitch    sequential seam sweep: classify, match, merge
//!  └─ 7. Output    one Document → Markdown or JSON, with stats
//! ```
//!
//! Stages 1–4 are external boundaries; stages 5–7 are deterministic and run
//! without any network access, which is how the whole reconciliation core is
//! tested.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagestitch::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint from PAGESTITCH_BASE_URL / PAGESTITCH_API_KEY
//!     let config = ConversionConfig::default();
//!     let document = convert("document.pdf", &config).await?;
//!     println!("{}", document.to_markdown());
//!     eprintln!(
//!         "{} pages, {} cross-page merges",
//!         document.stats.total_pages, document.stats.merges
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagestitch` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pagestitch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod block;
pub mod classify;
pub mod config;
pub mod convert;
pub mod error;
pub mod matcher;
pub mod merge;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{Assembly, DocumentAssembler};
pub use block::{Block, BlockKind, Cell, TableGrid};
pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection};
pub use convert::{convert, convert_from_bytes, convert_sync, convert_to_file, convert_with_model};
pub use error::{PageError, StitchError};
pub use matcher::{SeamDecision, SeamThresholds};
pub use output::{ConversionStats, Document, PageOutcome};
pub use pipeline::llm::{OpenAiCompatibleClient, VisionModel};
