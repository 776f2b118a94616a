//! Continuation Matcher: decides whether a page-tail block and the next
//! page's head block are two halves of one logical element.
//!
//! Pure and deterministic: a function of the two blocks and the configured
//! thresholds, no model calls, no randomness. The same inputs always produce
//! the same decision, which is what makes the seam sweep testable without
//! any inference backend.
//!
//! Both decision paths favour precision. A missed merge leaves two readable
//! fragments; a wrong merge corrupts both blocks.

use crate::block::{BlockKind, TableGrid};

/// Seam thresholds, passed in from `ConversionConfig`.
#[derive(Debug, Clone, Copy)]
pub struct SeamThresholds {
    /// Paragraph continuation score must be strictly above this to merge.
    pub text_similarity: f64,
    /// Table column-signature distance must be at or below this to treat the
    /// head's first row as a repeated header.
    pub table_distance: f64,
}

/// Outcome of evaluating one seam.
#[derive(Debug, Clone, PartialEq)]
pub enum SeamDecision {
    /// Leave both blocks as they are.
    Keep,
    /// Join the head paragraph/header text onto the tail.
    MergeText {
        /// The tail ends in a hyphenated word break; join without a space
        /// after stripping the hyphen.
        dehyphenate: bool,
    },
    /// Append the head table's rows onto the tail table.
    MergeTable {
        /// The head's first row repeats the tail's header and is dropped.
        drop_head_first_row: bool,
    },
}

/// Evaluate one seam between a tail block and the next page's head block.
pub fn evaluate_seam(tail: &BlockKind, head: &BlockKind, thresholds: &SeamThresholds) -> SeamDecision {
    let decision = match (tail, head) {
        (BlockKind::Paragraph { text: t }, BlockKind::Paragraph { text: h }) => {
            text_decision(t, h, thresholds.text_similarity)
        }
        // Headers only continue into headers of the same level; a split
        // heading re-emitted at a different level is a model artefact we do
        // not second-guess.
        (
            BlockKind::Header { level: lt, text: t },
            BlockKind::Header { level: lh, text: h },
        ) if lt == lh => text_decision(t, h, thresholds.text_similarity),
        (BlockKind::Table(t), BlockKind::Table(h)) => {
            table_decision(t, h, thresholds.table_distance)
        }
        _ => SeamDecision::Keep,
    };

    if let SeamDecision::Keep = decision {
        tracing::trace!(tail = tail.name(), head = head.name(), "seam kept");
    } else {
        tracing::debug!(tail = tail.name(), head = head.name(), ?decision, "seam merged");
    }
    decision
}

// ── Paragraph continuation ───────────────────────────────────────────────

// Score weights. The score is a bounded sum of independent lexical signals,
// not a probability; the threshold comparison is strict so an exactly-at-
// threshold score resolves to no-merge.
const W_OPEN_PUNCTUATION: f64 = 0.5;
const W_CONTINUING_START: f64 = 0.3;
const W_FULL_TAIL_LINE: f64 = 0.2;

/// Characters that close a sentence. A tail ending in one of these is a
/// strong signal the paragraph completed on its own page.
const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', ':', ';', '"', '\u{201d}', '\u{2019}'];

fn text_decision(tail: &str, head: &str, threshold: f64) -> SeamDecision {
    let tail = tail.trim_end();
    let head = head.trim_start();
    if tail.is_empty() || head.is_empty() {
        return SeamDecision::Keep;
    }

    // A hyphenated word break is decisive on its own: "-" at line end
    // followed by a lowercase continuation only occurs mid-word.
    if is_hyphen_break(tail, head) {
        return SeamDecision::MergeText { dehyphenate: true };
    }

    // A tail that closes its sentence is flat ineligible; only an open
    // ending gets scored at all.
    let last = tail.chars().last().unwrap_or(' ');
    if TERMINAL_PUNCTUATION.contains(&last) {
        return SeamDecision::Keep;
    }

    let score = continuation_score(tail, head);
    if score > threshold {
        SeamDecision::MergeText { dehyphenate: false }
    } else {
        if score > threshold - 0.15 {
            tracing::debug!(score, threshold, "low-confidence seam left unmerged");
        }
        SeamDecision::Keep
    }
}

fn is_hyphen_break(tail: &str, head: &str) -> bool {
    tail.ends_with('-')
        && !tail.ends_with("--")
        && head
            .chars()
            .next()
            .is_some_and(|c| c.is_lowercase() && c.is_alphabetic())
}

/// Lexical continuation plausibility in [0,1].
fn continuation_score(tail: &str, head: &str) -> f64 {
    let mut score = 0.0;

    let last = tail.chars().last().unwrap_or(' ');
    if !TERMINAL_PUNCTUATION.contains(&last) {
        score += W_OPEN_PUNCTUATION;
    }

    let first = head.chars().next().unwrap_or(' ');
    if (first.is_lowercase() && first.is_alphabetic()) || first.is_ascii_digit() {
        score += W_CONTINUING_START;
    }

    // A tail whose final line runs near full width was cut by the page edge
    // rather than ended by the author. Line width is unknowable post-OCR, so
    // use a word-count proxy on the last line.
    let last_line_words = tail.lines().last().unwrap_or("").split_whitespace().count();
    if last_line_words >= 6 {
        score += W_FULL_TAIL_LINE;
    }

    score
}

// ── Table continuation ───────────────────────────────────────────────────

fn table_decision(tail: &TableGrid, head: &TableGrid, distance_threshold: f64) -> SeamDecision {
    let (Some(tail_sig), Some(head_sig)) = (tail.signature_row(), head.signature_row()) else {
        return SeamDecision::Keep;
    };

    // Does the head's first row re-emit the tail's header? Only a tail that
    // actually has a header row can be repeated; a headerless tail whose
    // first data row matches the head's (duplicate rows are routine in
    // ledgers) must not get a row deleted. Compare cell texts with a
    // normalised sequence distance; at-threshold counts as a repeat
    // (distance is a "how different" measure, so ≤ keeps precision on the
    // merge side).
    let tail_texts: Vec<&str> = tail_sig.iter().map(|c| c.text.as_str()).collect();
    let head_texts: Vec<&str> = head_sig.iter().map(|c| c.text.as_str()).collect();
    let distance = signature_distance(&tail_texts, &head_texts);
    let drop_head_first_row = tail.has_header && distance <= distance_threshold;

    let effective_head_cols = head.cols();
    if effective_head_cols != tail.cols() {
        tracing::debug!(
            tail_cols = tail.cols(),
            head_cols = effective_head_cols,
            "column count mismatch, tables kept separate"
        );
        return SeamDecision::Keep;
    }

    if drop_head_first_row && head.row_count() == 1 {
        // The continuation is nothing but a repeated header; merging would
        // add no rows, but dropping the duplicate is still right.
        return SeamDecision::MergeTable {
            drop_head_first_row: true,
        };
    }

    // Without a header repeat the only structural evidence is the column
    // count plus the tail having been cut mid-table (no trailing separator
    // concept survives parsing, so column equality carries the decision).
    SeamDecision::MergeTable { drop_head_first_row }
}

/// Normalised edit distance between two column-signature sequences in [0,1].
///
/// Sequence-level Levenshtein where substituting one cell for another costs
/// their normalised string distance (`strsim`), and inserting or deleting a
/// cell costs 1. Normalised by the longer sequence length.
fn signature_distance(a: &[&str], b: &[&str]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let (n, m) = (a.len(), b.len());
    let mut prev: Vec<f64> = (0..=m).map(|j| j as f64).collect();
    let mut curr = vec![0.0; m + 1];

    for i in 1..=n {
        curr[0] = i as f64;
        for j in 1..=m {
            let sub_cost = 1.0 - strsim::normalized_levenshtein(
                &a[i - 1].trim().to_lowercase(),
                &b[j - 1].trim().to_lowercase(),
            );
            let sub = prev[j - 1] + sub_cost;
            let del = prev[j] + 1.0;
            let ins = curr[j - 1] + 1.0;
            curr[j] = sub.min(del).min(ins);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m] / n.max(m) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Cell;

    const T: SeamThresholds = SeamThresholds {
        text_similarity: 0.5,
        table_distance: 0.25,
    };

    fn para(text: &str) -> BlockKind {
        BlockKind::Paragraph { text: text.into() }
    }

    fn table(rows: &[&[&str]], has_header: bool) -> BlockKind {
        let raw = rows
            .iter()
            .map(|r| r.iter().map(|c| Cell::new(*c)).collect())
            .collect();
        BlockKind::Table(TableGrid::new(raw, has_header).unwrap())
    }

    #[test]
    fn hyphen_break_merges_decisively() {
        let d = evaluate_seam(&para("continu-"), &para("ation of policy."), &T);
        assert_eq!(d, SeamDecision::MergeText { dehyphenate: true });
    }

    #[test]
    fn open_sentence_into_lowercase_start_merges() {
        let d = evaluate_seam(
            &para("The committee resolved that all future budget requests"),
            &para("shall be reviewed quarterly."),
            &T,
        );
        assert_eq!(d, SeamDecision::MergeText { dehyphenate: false });
    }

    #[test]
    fn closed_sentence_into_capital_start_keeps() {
        let d = evaluate_seam(
            &para("The meeting adjourned at noon."),
            &para("Attendance was recorded separately."),
            &T,
        );
        assert_eq!(d, SeamDecision::Keep);
    }

    #[test]
    fn exactly_at_threshold_resolves_to_keep() {
        // Open punctuation only: short tail, capitalised head → score 0.5.
        let d = evaluate_seam(&para("A short tail"), &para("Next page."), &T);
        assert_eq!(d, SeamDecision::Keep);
    }

    #[test]
    fn double_hyphen_is_not_a_word_break() {
        let d = evaluate_seam(&para("It was --"), &para("Never mind."), &T);
        assert_eq!(d, SeamDecision::Keep);
    }

    #[test]
    fn tables_with_repeated_header_merge_and_drop_it() {
        let tail = table(&[&["Name", "Age"], &["Alice", "30"]], true);
        let head = table(&[&["Name", "Age"], &["Bob", "25"]], false);
        let d = evaluate_seam(&tail, &head, &T);
        assert_eq!(
            d,
            SeamDecision::MergeTable {
                drop_head_first_row: true
            }
        );
    }

    #[test]
    fn near_duplicate_header_still_counts_as_repeat() {
        // OCR noise on the repeated header row.
        let tail = table(&[&["Name", "Age"], &["Alice", "30"]], true);
        let head = table(&[&["Nane", "Age"], &["Bob", "25"]], false);
        let d = evaluate_seam(&tail, &head, &T);
        assert_eq!(
            d,
            SeamDecision::MergeTable {
                drop_head_first_row: true
            }
        );
    }

    #[test]
    fn headerless_tail_keeps_a_duplicate_data_row() {
        // Both tables are continuations without headers; the head's first
        // row happening to equal a tail row is real data, not a repeat.
        let tail = table(&[&["item", "2"], &["part", "4"]], false);
        let head = table(&[&["item", "2"], &["bolt", "9"]], false);
        let d = evaluate_seam(&tail, &head, &T);
        assert_eq!(
            d,
            SeamDecision::MergeTable {
                drop_head_first_row: false
            }
        );
    }

    #[test]
    fn column_count_mismatch_keeps_tables_separate() {
        let tail = table(&[&["A", "B", "C"], &["1", "2", "3"]], true);
        let head = table(&[&["w", "x", "y", "z"]], false);
        assert_eq!(evaluate_seam(&tail, &head, &T), SeamDecision::Keep);
    }

    #[test]
    fn continuation_rows_without_header_repeat_merge() {
        let tail = table(&[&["Name", "Age"], &["Alice", "30"]], true);
        let head = table(&[&["Carol", "41"], &["Dan", "28"]], false);
        let d = evaluate_seam(&tail, &head, &T);
        assert_eq!(
            d,
            SeamDecision::MergeTable {
                drop_head_first_row: false
            }
        );
    }

    #[test]
    fn mixed_kinds_never_merge() {
        let tail = para("Unfinished sentence without a period");
        let head = table(&[&["a", "b"]], false);
        assert_eq!(evaluate_seam(&tail, &head, &T), SeamDecision::Keep);
        assert_eq!(evaluate_seam(&head, &tail, &T), SeamDecision::Keep);

        let list = BlockKind::List {
            items: vec!["x".into()],
            ordered: false,
        };
        assert_eq!(evaluate_seam(&list, &list.clone(), &T), SeamDecision::Keep);
    }

    #[test]
    fn headers_merge_only_at_equal_level() {
        let t1 = BlockKind::Header {
            level: 2,
            text: "Long heading that was split across the".into(),
        };
        let h_same = BlockKind::Header {
            level: 2,
            text: "page boundary".into(),
        };
        let h_diff = BlockKind::Header {
            level: 3,
            text: "page boundary".into(),
        };
        assert!(matches!(
            evaluate_seam(&t1, &h_same, &T),
            SeamDecision::MergeText { .. }
        ));
        assert_eq!(evaluate_seam(&t1, &h_diff, &T), SeamDecision::Keep);
    }

    #[test]
    fn signature_distance_is_symmetric_enough() {
        assert_eq!(signature_distance(&["a", "b"], &["a", "b"]), 0.0);
        assert!(signature_distance(&["a", "b"], &["x", "y"]) > 0.9);
        let d = signature_distance(&["Name", "Age"], &["Nane", "Age"]);
        assert!(d > 0.0 && d <= 0.25, "small OCR noise stays under threshold, got {d}");
    }
}
