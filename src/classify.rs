//! Element Classifier: seam candidates and page-furniture detection.
//!
//! Runs on each parsed page before seam matching. Two jobs: tag which blocks
//! near the page edges may participate in a cross-page merge, and detect
//! page decoration (running headers/footers, page numbers) so it can be
//! suppressed. Furniture detection favours precision — a false positive
//! silently deletes body text, a false negative only leaves a stray page
//! number in the output.

use crate::block::{Block, BlockKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// How far from a page edge a block may sit and still be a seam candidate.
const CANDIDATE_WINDOW: usize = 2;

/// A page after classification: furniture separated out, seam candidates
/// identified by position.
#[derive(Debug)]
pub struct ClassifiedPage {
    /// Body blocks in reading order, furniture removed when enabled.
    pub blocks: Vec<Block>,
    /// Blocks dropped as furniture (kept for stats/debugging).
    pub furniture: Vec<Block>,
}

/// Classify one parsed page.
///
/// When `drop_furniture` is false the heuristic still runs (the blocks are
/// re-tagged as [`BlockKind::Furniture`]) but nothing is removed; furniture
/// blocks are never seam candidates either way.
pub fn classify_page(blocks: Vec<Block>, page: usize, drop_furniture: bool) -> ClassifiedPage {
    let total = blocks.len();
    let mut body = Vec::with_capacity(total);
    let mut furniture = Vec::new();

    for (idx, mut block) in blocks.into_iter().enumerate() {
        let edge = idx < CANDIDATE_WINDOW || idx + CANDIDATE_WINDOW >= total;
        if edge && is_furniture(&block.kind) {
            tracing::debug!(
                page,
                order = block.order,
                text = %truncate_for_log(&block.kind),
                "dropping page furniture"
            );
            if let BlockKind::Paragraph { text } | BlockKind::Header { text, .. } = block.kind {
                block.kind = BlockKind::Furniture { text };
            }
            if drop_furniture {
                furniture.push(block);
                continue;
            }
        }
        body.push(block);
    }

    ClassifiedPage { blocks: body, furniture }
}

impl ClassifiedPage {
    /// Tail seam candidate: the last boundary-eligible block sitting within
    /// the final window of the page, if any.
    pub fn tail_candidate(&self) -> Option<usize> {
        let n = self.blocks.len();
        self.blocks
            .iter()
            .enumerate()
            .rev()
            .take(CANDIDATE_WINDOW.min(n))
            .find(|(_, b)| is_boundary_eligible(&b.kind))
            .map(|(i, _)| i)
    }

    /// Head seam candidate: the first boundary-eligible block within the
    /// leading window of the page, if any.
    pub fn head_candidate(&self) -> Option<usize> {
        self.blocks
            .iter()
            .enumerate()
            .take(CANDIDATE_WINDOW)
            .find(|(_, b)| is_boundary_eligible(&b.kind))
            .map(|(i, _)| i)
    }
}

/// Whether a block kind may participate in a cross-page merge at all.
///
/// Captions are terminal: a paragraph that reads as "Figure 3: ..." belongs
/// to its figure and must not be glued to the next page's opening text.
pub fn is_boundary_eligible(kind: &BlockKind) -> bool {
    match kind {
        BlockKind::Paragraph { text } => !RE_CAPTION.is_match(text.trim_start()),
        BlockKind::Header { .. } | BlockKind::Table(_) | BlockKind::List { .. } => true,
        BlockKind::Image { .. } | BlockKind::Furniture { .. } => false,
    }
}

// ── Furniture heuristic ──────────────────────────────────────────────────

/// A standalone page number in its common dressings: "12", "- 12 -",
/// "— 12 —", "Page 12", "Page 12 of 345", "12 / 345".
static RE_PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^ \s*
          (?: [-–—]\s*\d{1,4}\s*[-–—]
            | (?:page|p\.?|seite)\s+\d{1,4} (?:\s+(?:of|/)\s*\d{1,4})?
            | \d{1,4}\s*/\s*\d{1,4}
            | \d{1,4}
          ) \s*$",
    )
    .unwrap()
});

static RE_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(figure|fig\.|table|tbl\.)\s+\d+[A-Za-z]?\s*[:.]").unwrap());

/// Maximum length for a running header/footer line. Real body sentences are
/// almost always longer; keeping this tight is what makes the heuristic
/// precision-favouring.
const FURNITURE_MAX_LEN: usize = 60;

fn is_furniture(kind: &BlockKind) -> bool {
    let text = match kind {
        BlockKind::Paragraph { text } => text,
        BlockKind::Header { text, .. } => text,
        BlockKind::Furniture { .. } => return true,
        _ => return false,
    };
    let t = text.trim();

    if t.lines().count() > 1 || t.chars().count() > FURNITURE_MAX_LEN {
        return false;
    }
    if RE_PAGE_NUMBER.is_match(t) {
        return true;
    }

    // Short line that is mostly a repeated title fragment plus a page
    // number, e.g. "Annual Report 2023   17". Require the trailing number;
    // a bare short line is too often a real heading.
    static RE_TRAILING_NUMBER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\s\d{1,4}\s*$").unwrap());
    if RE_TRAILING_NUMBER.is_match(t) && !t.ends_with(':') {
        let words = t.split_whitespace().count();
        if words <= 8 && !t.ends_with('.') {
            return true;
        }
    }

    false
}

fn truncate_for_log(kind: &BlockKind) -> String {
    let text = match kind {
        BlockKind::Paragraph { text }
        | BlockKind::Header { text, .. }
        | BlockKind::Furniture { text } => text.as_str(),
        _ => return kind.name().to_string(),
    };
    text.chars().take(40).collect()
}
