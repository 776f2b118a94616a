//! Document Assembler: the linear seam sweep and Markdown rendering.
//!
//! Push-based state machine: pages go in strictly in page order via
//! [`DocumentAssembler::push_page`], each seam is evaluated exactly once
//! against the previous page, and [`DocumentAssembler::finish`] emits the
//! assembled block list atomically. Holding only one unsealed page at a time
//! is what lets the caller stream pages through without buffering the whole
//! document, while the buffered path simply pushes everything then finishes.

use crate::block::Block;
use crate::classify::{classify_page, ClassifiedPage};
use crate::error::StitchError;
use crate::matcher::{evaluate_seam, SeamDecision, SeamThresholds};
use crate::merge::apply_merge;

/// Result of a completed assembly sweep.
#[derive(Debug)]
pub struct Assembly {
    /// All blocks in document order, merges applied.
    pub blocks: Vec<Block>,
    /// Cross-page merges performed.
    pub merges: usize,
    /// Furniture blocks removed across all pages.
    pub furniture_dropped: usize,
    /// Blocks parsed across all pages before merging/removal.
    pub input_blocks: usize,
}

/// Sequential cross-page assembler.
pub struct DocumentAssembler {
    thresholds: SeamThresholds,
    drop_furniture: bool,
    sealed: Vec<Block>,
    /// The most recently pushed page; its tail may still merge with the next
    /// page's head, so it is not sealed yet.
    pending: Option<ClassifiedPage>,
    pages_pushed: usize,
    merges: usize,
    furniture_dropped: usize,
    input_blocks: usize,
}

impl DocumentAssembler {
    pub fn new(thresholds: SeamThresholds, drop_furniture: bool) -> Self {
        Self {
            thresholds,
            drop_furniture,
            sealed: Vec::new(),
            pending: None,
            pages_pushed: 0,
            merges: 0,
            furniture_dropped: 0,
            input_blocks: 0,
        }
    }

    /// Push the next page's parsed blocks. Pages must arrive in page order;
    /// an empty/failed page is pushed as an empty `Vec` so it still counts
    /// and its adjacent seams resolve to no-merge naturally.
    ///
    /// Returns the number of furniture blocks dropped from this page.
    pub fn push_page(&mut self, page: usize, blocks: Vec<Block>) -> usize {
        self.pages_pushed += 1;
        self.input_blocks += blocks.len();

        let mut current = classify_page(blocks, page, self.drop_furniture);
        let dropped = current.furniture.len();
        self.furniture_dropped += dropped;

        if let Some(mut prev) = self.pending.take() {
            self.evaluate_and_merge(&mut prev, &mut current, page);
            self.sealed.append(&mut prev.blocks);
        }
        self.pending = Some(current);
        dropped
    }

    fn evaluate_and_merge(&mut self, prev: &mut ClassifiedPage, current: &mut ClassifiedPage, page: usize) {
        let (Some(tail_idx), Some(head_idx)) = (prev.tail_candidate(), current.head_candidate())
        else {
            return;
        };

        let tail = &prev.blocks[tail_idx];
        let head = &current.blocks[head_idx];
        let decision = evaluate_seam(&tail.kind, &head.kind, &self.thresholds);
        if decision == SeamDecision::Keep {
            return;
        }

        // The tail must actually close its page and the head must open its
        // page for the pair to be two halves of one element. Retained
        // furniture (when dropping is disabled) is decoration and does not
        // count as intervening content; anything else does.
        let is_furniture =
            |b: &Block| matches!(b.kind, crate::block::BlockKind::Furniture { .. });
        let tail_closes = prev.blocks[tail_idx + 1..].iter().all(is_furniture);
        let head_opens = current.blocks[..head_idx].iter().all(is_furniture);
        if !tail_closes || !head_opens {
            tracing::trace!(page, "seam candidates not adjacent to the boundary, kept");
            return;
        }

        let head_block = current.blocks.remove(head_idx);
        apply_merge(&mut prev.blocks[tail_idx], head_block, &decision);
        self.merges += 1;
        tracing::debug!(page, merges = self.merges, "cross-page merge applied");
    }

    /// Seal the final page and emit the document's blocks.
    ///
    /// Zero pushed pages is the one fatal assembly condition.
    pub fn finish(mut self) -> Result<Assembly, StitchError> {
        if self.pages_pushed == 0 {
            return Err(StitchError::EmptyDocument);
        }
        if let Some(mut last) = self.pending.take() {
            self.sealed.append(&mut last.blocks);
        }
        tracing::info!(
            pages = self.pages_pushed,
            blocks = self.sealed.len(),
            merges = self.merges,
            furniture = self.furniture_dropped,
            "assembly complete"
        );
        Ok(Assembly {
            blocks: self.sealed,
            merges: self.merges,
            furniture_dropped: self.furniture_dropped,
            input_blocks: self.input_blocks,
        })
    }
}

// ── Markdown rendering ───────────────────────────────────────────────────

/// Render assembled blocks to one Markdown string.
pub fn render_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        if block.is_merged() {
            // Origin provenance for blocks stitched across a boundary,
            // 1-indexed for human readers.
            out.push_str(&format!(
                "<!-- pages {}-{} -->\n",
                block.page_span.0 + 1,
                block.page_span.1 + 1
            ));
        }
        render_block(&mut out, block);
    }
    out
}

fn render_block(out: &mut String, block: &Block) {
    use crate::block::BlockKind;
    match &block.kind {
        BlockKind::Paragraph { text } | BlockKind::Furniture { text } => out.push_str(text),
        BlockKind::Header { level, text } => {
            for _ in 0..*level {
                out.push('#');
            }
            out.push(' ');
            out.push_str(text);
        }
        BlockKind::Table(grid) => render_table(out, grid),
        BlockKind::List { items, ordered } => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                if *ordered {
                    out.push_str(&format!("{}. {item}", i + 1));
                } else {
                    out.push_str(&format!("- {item}"));
                }
            }
        }
        BlockKind::Image { reference } => out.push_str(reference),
    }
}

fn render_table(out: &mut String, grid: &crate::block::TableGrid) {
    let cols = grid.cols();
    let separator = {
        let mut s = String::from("|");
        for _ in 0..cols {
            s.push_str(" --- |");
        }
        s
    };

    let mut rows = grid.rows().iter();
    if grid.has_header {
        if let Some(header) = rows.next() {
            render_row(out, header);
            out.push('\n');
        }
    } else {
        // GFM needs a header row; emit an empty one so no data row gets
        // promoted to a header it never was.
        out.push('|');
        for _ in 0..cols {
            out.push_str("   |");
        }
        out.push('\n');
    }
    out.push_str(&separator);
    for row in rows {
        out.push('\n');
        render_row(out, row);
    }
}

fn render_row(out: &mut String, row: &[crate::block::Cell]) {
    out.push('|');
    for cell in row {
        out.push(' ');
        out.push_str(&cell.text.replace('|', "\\|").replace('\n', " "));
        out.push_str(" |");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, Cell, TableGrid};

    const T: SeamThresholds = SeamThresholds {
        text_similarity: 0.5,
        table_distance: 0.25,
    };

    fn para(text: &str, page: usize, order: usize) -> Block {
        Block::new(BlockKind::Paragraph { text: text.into() }, page, order)
    }

    fn table(rows: &[&[&str]], has_header: bool, page: usize, order: usize) -> Block {
        let raw = rows
            .iter()
            .map(|r| r.iter().map(|c| Cell::new(*c)).collect())
            .collect();
        Block::new(
            BlockKind::Table(TableGrid::new(raw, has_header).unwrap()),
            page,
            order,
        )
    }

    #[test]
    fn zero_pages_is_fatal() {
        let asm = DocumentAssembler::new(T, true);
        assert!(matches!(asm.finish(), Err(StitchError::EmptyDocument)));
    }

    #[test]
    fn single_empty_page_yields_empty_document() {
        let mut asm = DocumentAssembler::new(T, true);
        asm.push_page(0, vec![]);
        let assembly = asm.finish().unwrap();
        assert!(assembly.blocks.is_empty());
        assert_eq!(assembly.merges, 0);
    }

    #[test]
    fn hyphen_split_paragraph_is_stitched() {
        let mut asm = DocumentAssembler::new(T, true);
        asm.push_page(0, vec![para("The policy saw continu-", 0, 0)]);
        asm.push_page(1, vec![para("ation of policy.", 1, 0)]);
        let assembly = asm.finish().unwrap();

        assert_eq!(assembly.blocks.len(), 1);
        assert_eq!(assembly.merges, 1);
        assert_eq!(
            assembly.blocks[0].kind,
            BlockKind::Paragraph {
                text: "The policy saw continuation of policy.".into()
            }
        );
        assert_eq!(assembly.blocks[0].page_span, (0, 1));
    }

    #[test]
    fn empty_middle_page_breaks_the_seam_chain() {
        let mut asm = DocumentAssembler::new(T, true);
        asm.push_page(0, vec![para("An open ended line without terminal", 0, 0)]);
        asm.push_page(1, vec![]);
        asm.push_page(2, vec![para("which might have continued.", 2, 0)]);
        let assembly = asm.finish().unwrap();
        // Pages 0 and 2 are not adjacent; no merge across the gap.
        assert_eq!(assembly.blocks.len(), 2);
        assert_eq!(assembly.merges, 0);
    }

    #[test]
    fn non_edge_tail_does_not_merge() {
        // Tail candidate exists but a caption follows it, so the candidate
        // does not close the page.
        let mut asm = DocumentAssembler::new(T, true);
        asm.push_page(
            0,
            vec![
                para("Running text that clearly keeps going with many words", 0, 0),
                para("Figure 2: apparatus.", 0, 1),
            ],
        );
        asm.push_page(1, vec![para("continued on the next page.", 1, 0)]);
        let assembly = asm.finish().unwrap();
        assert_eq!(assembly.blocks.len(), 3);
        assert_eq!(assembly.merges, 0);
    }

    #[test]
    fn furniture_is_removed_and_counted() {
        let mut asm = DocumentAssembler::new(T, true);
        asm.push_page(0, vec![para("Body text.", 0, 0), para("— 12 —", 0, 1)]);
        let assembly = asm.finish().unwrap();
        assert_eq!(assembly.blocks.len(), 1);
        assert_eq!(assembly.furniture_dropped, 1);
        assert_eq!(assembly.input_blocks, 2);
    }

    #[test]
    fn table_continuation_is_stitched_with_header_dropped() {
        let mut asm = DocumentAssembler::new(T, true);
        asm.push_page(0, vec![table(&[&["Name", "Age"], &["Alice", "30"]], true, 0, 0)]);
        asm.push_page(1, vec![table(&[&["Name", "Age"], &["Bob", "25"]], false, 1, 0)]);
        let assembly = asm.finish().unwrap();

        assert_eq!(assembly.blocks.len(), 1);
        let BlockKind::Table(grid) = &assembly.blocks[0].kind else {
            panic!("expected table");
        };
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.rows()[1][0].text, "Alice");
        assert_eq!(grid.rows()[2][0].text, "Bob");
    }

    #[test]
    fn markdown_renders_provenance_comment_for_merged_blocks() {
        let mut b = para("stitched text", 0, 0);
        b.page_span = (0, 1);
        let md = render_markdown(&[b]);
        assert!(md.starts_with("<!-- pages 1-2 -->\n"), "got: {md}");
    }

    #[test]
    fn markdown_renders_table_with_header() {
        let b = table(&[&["Name", "Age"], &["Alice", "30"]], true, 0, 0);
        let md = render_markdown(&[b]);
        assert_eq!(md, "| Name | Age |\n| --- | --- |\n| Alice | 30 |");
    }

    #[test]
    fn markdown_headerless_table_gets_blank_header() {
        let b = table(&[&["Alice", "30"]], false, 0, 0);
        let md = render_markdown(&[b]);
        assert!(md.starts_with("|   |   |\n| --- | --- |\n"), "got: {md}");
        assert!(md.contains("| Alice | 30 |"));
    }

    #[test]
    fn markdown_escapes_pipes_in_cells() {
        let b = table(&[&["a|b"]], false, 0, 0);
        let md = render_markdown(&[b]);
        assert!(md.contains("a\\|b"));
    }

    #[test]
    fn markdown_renders_lists_and_headers() {
        let blocks = vec![
            Block::new(
                BlockKind::Header {
                    level: 2,
                    text: "Results".into(),
                },
                0,
                0,
            ),
            Block::new(
                BlockKind::List {
                    items: vec!["one".into(), "two".into()],
                    ordered: true,
                },
                0,
                1,
            ),
        ];
        assert_eq!(render_markdown(&blocks), "## Results\n\n1. one\n2. two");
    }
}
