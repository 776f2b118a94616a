//! Structural block model for parsed page content.
//!
//! A page's raw model output is parsed into an ordered sequence of [`Block`]s.
//! The block kind is a tagged enum rather than a trait hierarchy so that seam
//! decisions in the matcher are exhaustive `match`es the compiler checks, and
//! table shape invariants (uniform row length) are enforceable at
//! construction time instead of being discovered mid-merge.

use serde::{Deserialize, Serialize};

/// One structural unit of document content.
///
/// `page`/`order` define the total order: pages in document order, blocks in
/// reading order within a page. `page_span` records provenance — for a block
/// merged across a seam it covers both origin pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    /// 0-based index of the page this block starts on.
    pub page: usize,
    /// Reading-order index within the originating page.
    pub order: usize,
    /// Inclusive range of origin pages `(first, last)`.
    pub page_span: (usize, usize),
}

impl Block {
    pub fn new(kind: BlockKind, page: usize, order: usize) -> Self {
        Self {
            kind,
            page,
            order,
            page_span: (page, page),
        }
    }

    /// Whether this block spans more than one origin page (i.e. was merged).
    pub fn is_merged(&self) -> bool {
        self.page_span.0 != self.page_span.1
    }
}

/// Tagged variant over the structural kinds a page can contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph {
        text: String,
    },
    Header {
        /// Markdown heading level, 1–6.
        level: u8,
        text: String,
    },
    Table(TableGrid),
    List {
        items: Vec<String>,
        ordered: bool,
    },
    Image {
        /// Opaque reference token, e.g. the original `![alt](url)` text.
        reference: String,
    },
    /// Page decoration (running header/footer, page number). Carried through
    /// classification so suppression can be disabled, but never merged.
    Furniture {
        text: String,
    },
}

impl BlockKind {
    /// Short kind name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Paragraph { .. } => "paragraph",
            BlockKind::Header { .. } => "header",
            BlockKind::Table(_) => "table",
            BlockKind::List { .. } => "list",
            BlockKind::Image { .. } => "image",
            BlockKind::Furniture { .. } => "furniture",
        }
    }
}

/// One table cell. `padded` marks cells inserted by row-length normalisation
/// so a merge can tell normalisation artefacts from genuinely empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    pub row_span: u32,
    pub col_span: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub padded: bool,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            row_span: 1,
            col_span: 1,
            padded: false,
        }
    }

    fn padding() -> Self {
        Self {
            text: String::new(),
            row_span: 1,
            col_span: 1,
            padded: true,
        }
    }
}

/// An explicit 2-D grid of cells: ordered rows, each an ordered cell
/// sequence, normalised to a uniform column count at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGrid {
    rows: Vec<Vec<Cell>>,
    cols: usize,
    /// Whether the first row was recognised as a header row at parse time.
    pub has_header: bool,
}

impl TableGrid {
    /// Build a grid from raw rows, padding short rows to the widest row.
    ///
    /// Returns `None` for an entirely empty table (no rows, or rows with no
    /// cells) — callers degrade that region to a paragraph instead.
    pub fn new(raw_rows: Vec<Vec<Cell>>, has_header: bool) -> Option<Self> {
        let cols = raw_rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if cols == 0 {
            return None;
        }
        let rows = raw_rows
            .into_iter()
            .map(|mut row| {
                while row.len() < cols {
                    row.push(Cell::padding());
                }
                row
            })
            .collect();
        Some(Self {
            rows,
            cols,
            has_header,
        })
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The header row when one was recognised, else the first row.
    ///
    /// The fallback matters for seam matching: a table fragment continued
    /// from a previous page often re-emits the header without a separator
    /// row, so its "first row" is the only column signature available.
    pub fn signature_row(&self) -> Option<&[Cell]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// Append rows from another grid, padding either side defensively to the
    /// wider column count. Used only by the merger, which has already
    /// verified column-count equality; the padding is a guard, not a policy.
    pub fn append_rows(&mut self, rows: Vec<Vec<Cell>>) {
        for mut row in rows {
            if row.len() > self.cols {
                let grow = row.len();
                for existing in &mut self.rows {
                    while existing.len() < grow {
                        existing.push(Cell::padding());
                    }
                }
                self.cols = grow;
            }
            while row.len() < self.cols {
                row.push(Cell::padding());
            }
            self.rows.push(row);
        }
    }

    /// Drop the first row (used when the head table re-emits the header).
    pub fn drop_first_row(&mut self) {
        if !self.rows.is_empty() {
            self.rows.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(texts: &[&str]) -> Vec<Cell> {
        texts.iter().map(|t| Cell::new(*t)).collect()
    }

    #[test]
    fn grid_pads_short_rows() {
        let grid = TableGrid::new(
            vec![cells(&["Name", "Age", "City"]), cells(&["Alice", "30"])],
            true,
        )
        .unwrap();

        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.rows()[1].len(), 3);
        assert!(grid.rows()[1][2].padded, "padding must be marked");
        assert!(!grid.rows()[1][1].padded, "real cell must not be marked");
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert!(TableGrid::new(vec![], true).is_none());
        assert!(TableGrid::new(vec![vec![]], false).is_none());
    }

    #[test]
    fn append_rows_pads_both_sides() {
        let mut grid = TableGrid::new(vec![cells(&["A", "B"])], true).unwrap();
        grid.append_rows(vec![cells(&["1", "2", "3"])]);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.rows()[0].len(), 3);
        assert!(grid.rows()[0][2].padded);

        grid.append_rows(vec![cells(&["x"])]);
        assert_eq!(grid.rows()[2].len(), 3);
    }

    #[test]
    fn merged_flag_follows_page_span() {
        let mut b = Block::new(
            BlockKind::Paragraph {
                text: "hello".into(),
            },
            2,
            0,
        );
        assert!(!b.is_merged());
        b.page_span = (2, 3);
        assert!(b.is_merged());
    }
}
