//! Output types: the assembled [`Document`], per-page outcomes, and stats.

use crate::block::Block;
use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// The single output artifact of a conversion.
///
/// Exists only in fully-assembled form: the assembler's `finish()` either
/// returns a complete `Document` or a fatal error, never a partial one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// All blocks in document order, cross-page merges already applied.
    pub blocks: Vec<Block>,
    pub stats: ConversionStats,
}

impl Document {
    /// Render the document to Markdown.
    ///
    /// Tables render as GFM pipe grids; blocks merged across a page boundary
    /// are preceded by an origin-pages comment so provenance survives into
    /// the text form.
    pub fn to_markdown(&self) -> String {
        crate::assemble::render_markdown(&self.blocks)
    }
}

/// Outcome of processing one page, kept for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOutcome {
    /// 0-based page index.
    pub page: usize,
    /// Blocks parsed from this page before seam merging.
    pub block_count: usize,
    /// Furniture blocks dropped from this page.
    pub furniture_dropped: usize,
    /// Milliseconds spent on inference for this page.
    pub inference_ms: u64,
    /// Set when the page failed or came back empty; the page still occupies
    /// its slot in the order with zero blocks.
    pub error: Option<PageError>,
}

impl PageOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate statistics for one conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub failed_pages: usize,
    pub empty_pages: usize,
    /// Blocks in the final document (after merging and furniture removal).
    pub output_blocks: usize,
    /// Blocks parsed across all pages before merging.
    pub input_blocks: usize,
    /// Cross-page merges applied.
    pub merges: usize,
    /// Furniture blocks dropped.
    pub furniture_dropped: usize,
    pub total_duration_ms: u64,
    /// Per-page outcomes in page order.
    pub pages: Vec<PageOutcome>,
}
