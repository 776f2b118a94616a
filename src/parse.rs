//! Page Parser: one page's raw model output → ordered [`Block`] sequence.
//!
//! The raw text is Markdown-ish prose mixed with two table dialects the
//! model emits: GFM pipe tables and embedded `<table>` HTML. Output from a
//! vision model is best-effort — truncated mid-table, unbalanced tags,
//! separator rows in odd places — so parsing is tolerant by contract:
//! a malformed table region degrades to a raw-text paragraph block rather
//! than failing the page, and a failed page must never abort the document.
//!
//! The only parse failure is completely empty input, which signals an empty
//! page that the assembler treats as zero blocks.

use crate::block::{Block, BlockKind, Cell, TableGrid};
use once_cell::sync::Lazy;
use regex::Regex;

/// Parse one page's raw output.
///
/// Returns the blocks in reading order, exactly as they appear — no
/// reordering happens here or anywhere downstream within a page.
/// `Err(EmptyPage)` only for empty/whitespace input.
pub fn parse_page(raw: &str, page: usize) -> Result<Vec<Block>, EmptyPage> {
    let normalised = raw.replace("\r\n", "\n").replace('\r', "\n");
    if normalised.trim().is_empty() {
        return Err(EmptyPage);
    }

    let lines: Vec<&str> = normalised.lines().collect();
    let mut blocks: Vec<Block> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim_end();
        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            i += 1;
            continue;
        }

        let order = blocks.len();

        // HTML table region
        if trimmed.starts_with("<table") {
            let (kind, consumed) = parse_html_table(&lines[i..]);
            blocks.push(Block::new(kind, page, order));
            i += consumed;
            continue;
        }

        // Pipe table region
        if is_table_row(trimmed) {
            let (kind, consumed) = parse_pipe_table(&lines[i..]);
            blocks.push(Block::new(kind, page, order));
            i += consumed;
            continue;
        }

        // Heading
        if let Some((level, text)) = parse_heading(trimmed) {
            blocks.push(Block::new(BlockKind::Header { level, text }, page, order));
            i += 1;
            continue;
        }

        // Standalone image placeholder
        if RE_IMAGE_ONLY.is_match(trimmed) {
            blocks.push(Block::new(
                BlockKind::Image {
                    reference: trimmed.to_string(),
                },
                page,
                order,
            ));
            i += 1;
            continue;
        }

        // List region
        if is_list_item(trimmed) {
            let (kind, consumed) = parse_list(&lines[i..]);
            blocks.push(Block::new(kind, page, order));
            i += consumed;
            continue;
        }

        // Paragraph: consecutive plain lines up to a blank line or a line
        // that starts another region.
        let mut para_lines: Vec<&str> = Vec::new();
        while i < lines.len() {
            let l = lines[i].trim_end();
            let t = l.trim_start();
            if t.is_empty()
                || t.starts_with("<table")
                || is_table_row(t)
                || parse_heading(t).is_some()
                || is_list_item(t)
                || RE_IMAGE_ONLY.is_match(t)
            {
                break;
            }
            para_lines.push(t);
            i += 1;
        }
        blocks.push(Block::new(
            BlockKind::Paragraph {
                text: para_lines.join("\n"),
            },
            page,
            order,
        ));
    }

    Ok(blocks)
}

/// Signal for completely empty/unparseable page input (spec'd as the one
/// condition the parser refuses; the assembler maps it to a zero-block page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyPage;

// ── Headings ─────────────────────────────────────────────────────────────

fn parse_heading(line: &str) -> Option<(u8, String)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) {
        let rest = &line[hashes..];
        if let Some(text) = rest.strip_prefix(' ') {
            if !text.trim().is_empty() {
                return Some((hashes as u8, text.trim().to_string()));
            }
        }
    }
    None
}

// ── Lists ────────────────────────────────────────────────────────────────

static RE_ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}[.)]\s+").unwrap());

fn is_list_item(line: &str) -> bool {
    line.starts_with("- ")
        || line.starts_with("* ")
        || line.starts_with("+ ")
        || RE_ORDERED_ITEM.is_match(line)
}

fn parse_list(lines: &[&str]) -> (BlockKind, usize) {
    let first = lines[0].trim_start();
    let ordered = RE_ORDERED_ITEM.is_match(first);
    let mut items = Vec::new();
    let mut consumed = 0;

    for l in lines {
        let t = l.trim_start();
        if !is_list_item(t) {
            break;
        }
        let item = if let Some(m) = RE_ORDERED_ITEM.find(t) {
            &t[m.end()..]
        } else {
            &t[2..]
        };
        items.push(item.trim().to_string());
        consumed += 1;
    }

    (BlockKind::List { items, ordered }, consumed)
}

// ── Pipe tables ──────────────────────────────────────────────────────────

pub(crate) fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|') && t.ends_with('|') && t.len() > 2
}

pub(crate) fn is_separator_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|')
        && t.contains('-')
        && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn split_pipe_row(line: &str) -> Vec<Cell> {
    let t = line.trim();
    let inner = t.trim_start_matches('|').trim_end_matches('|');
    inner
        .split('|')
        .map(|c| Cell::new(c.trim()))
        .collect()
}

fn parse_pipe_table(lines: &[&str]) -> (BlockKind, usize) {
    let mut raw_rows: Vec<Vec<Cell>> = Vec::new();
    let mut has_header = false;
    let mut consumed = 0;

    for (idx, l) in lines.iter().enumerate() {
        let t = l.trim();
        if !is_table_row(t) {
            break;
        }
        consumed += 1;
        if is_separator_row(t) {
            // A separator right after the first data row marks it a header;
            // separators elsewhere are model noise and are skipped.
            if idx == 1 {
                has_header = true;
            }
            continue;
        }
        raw_rows.push(split_pipe_row(t));
    }

    match TableGrid::new(raw_rows, has_header) {
        Some(grid) => (BlockKind::Table(grid), consumed),
        None => (
            BlockKind::Paragraph {
                text: lines[..consumed].join("\n"),
            },
            consumed.max(1),
        ),
    }
}

// ── HTML tables ──────────────────────────────────────────────────────────

static RE_TR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap());
static RE_TD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<t([dh])([^>]*)>(.*?)</t[dh]>").unwrap());
static RE_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(row|col)span\s*=\s*"?(\d+)"?"#).unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static RE_IMAGE_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^!\[[^\]]*\]\([^)]*\)$").unwrap());

/// Parse an embedded `<table>` region starting at `lines[0]`.
///
/// An unterminated table (no `</table>` before end of page — typically a
/// truncated model response) degrades to a raw-text paragraph spanning the
/// region, per the tolerant-parsing contract.
fn parse_html_table(lines: &[&str]) -> (BlockKind, usize) {
    let mut end = None;
    for (idx, l) in lines.iter().enumerate() {
        if l.to_ascii_lowercase().contains("</table>") {
            end = Some(idx);
            break;
        }
    }

    let Some(end) = end else {
        // Unbalanced markup: keep the raw text so nothing is lost.
        return (
            BlockKind::Paragraph {
                text: lines.join("\n"),
            },
            lines.len(),
        );
    };

    let consumed = end + 1;
    let region = lines[..consumed].join("\n");

    let mut raw_rows: Vec<Vec<Cell>> = Vec::new();
    let mut has_header = false;

    for (row_idx, tr) in RE_TR.captures_iter(&region).enumerate() {
        let mut row = Vec::new();
        for td in RE_TD.captures_iter(&tr[1]) {
            let is_th = td[1].eq_ignore_ascii_case("h");
            if row_idx == 0 && is_th {
                has_header = true;
            }
            let attrs = &td[2];
            let mut cell = Cell::new(RE_TAG.replace_all(&td[3], "").trim().to_string());
            for span in RE_SPAN.captures_iter(attrs) {
                let n: u32 = span[2].parse().unwrap_or(1);
                if span[1].eq_ignore_ascii_case("row") {
                    cell.row_span = n;
                } else {
                    cell.col_span = n;
                }
            }
            row.push(cell);
        }
        if !row.is_empty() {
            raw_rows.push(row);
        }
    }

    match TableGrid::new(raw_rows, has_header) {
        Some(grid) => (BlockKind::Table(grid), consumed),
        None => (BlockKind::Paragraph { text: region }, consumed),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
