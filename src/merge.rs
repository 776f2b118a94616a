//! Element Merger: executes the merge the matcher decided on.
//!
//! Merging is mechanical by design — every judgement call (whether to merge,
//! whether the head repeats a header) was already made by the matcher. The
//! merger only mutates the tail block in place and records provenance.

use crate::block::{Block, BlockKind};
use crate::matcher::SeamDecision;

/// Apply a merge decision, consuming the head block into the tail.
///
/// Must only be called with a `MergeText`/`MergeTable` decision whose kinds
/// match the blocks it was computed for; a mismatched call leaves the tail
/// untouched rather than panicking.
pub fn apply_merge(tail: &mut Block, head: Block, decision: &SeamDecision) {
    let head_last_page = head.page_span.1;

    match (decision, &mut tail.kind, head.kind) {
        (
            SeamDecision::MergeText { dehyphenate },
            BlockKind::Paragraph { text: t } | BlockKind::Header { text: t, .. },
            BlockKind::Paragraph { text: h } | BlockKind::Header { text: h, .. },
        ) => {
            join_text(t, &h, *dehyphenate);
        }
        (
            SeamDecision::MergeTable { drop_head_first_row },
            BlockKind::Table(t),
            BlockKind::Table(mut h),
        ) => {
            if *drop_head_first_row {
                h.drop_first_row();
            }
            let rows = h.rows().to_vec();
            t.append_rows(rows);
        }
        _ => {
            tracing::warn!(?decision, "merge decision did not match block kinds, skipped");
            return;
        }
    }

    // Merged block keeps the tail's position in the total order; the span
    // stretches to cover the head's origin.
    tail.page_span.1 = head_last_page;
}

fn join_text(tail: &mut String, head: &str, dehyphenate: bool) {
    let head = head.trim_start();
    if dehyphenate {
        tail.truncate(tail.trim_end().len());
        tail.pop(); // the breaking hyphen
        tail.push_str(head);
    } else {
        let trimmed = tail.trim_end().len();
        tail.truncate(trimmed);
        tail.push(' ');
        tail.push_str(head);
    }
}
