//! Integration tests for the reconciliation core: raw per-page transcripts
//! in, assembled document out. No model, no pdfium — everything from the
//! parser onward is deterministic, so these tests exercise the exact code
//! path `convert()` runs after inference, minus the network.

use pagestitch::{
    assemble::render_markdown, parse::parse_page, Block, BlockKind, DocumentAssembler,
    SeamThresholds,
};

const THRESHOLDS: SeamThresholds = SeamThresholds {
    text_similarity: 0.5,
    table_distance: 0.25,
};

/// Parse raw transcripts and run them through the seam sweep.
fn assemble(pages: &[&str]) -> pagestitch::Assembly {
    assemble_with(pages, true)
}

fn assemble_with(pages: &[&str], drop_furniture: bool) -> pagestitch::Assembly {
    let mut asm = DocumentAssembler::new(THRESHOLDS, drop_furniture);
    for (idx, raw) in pages.iter().enumerate() {
        let blocks = parse_page(raw, idx).unwrap_or_default();
        asm.push_page(idx, blocks);
    }
    asm.finish().expect("at least one page pushed")
}

fn texts(blocks: &[Block]) -> Vec<String> {
    blocks
        .iter()
        .map(|b| match &b.kind {
            BlockKind::Paragraph { text } => text.clone(),
            BlockKind::Header { text, .. } => text.clone(),
            other => other.name().to_string(),
        })
        .collect()
}

// ── Paragraph stitching ──────────────────────────────────────────────────

#[test]
fn hyphenated_word_break_is_rejoined() {
    let assembly = assemble(&[
        "The committee recommended a continu-",
        "ation of policy.",
    ]);

    assert_eq!(assembly.merges, 1);
    assert_eq!(
        texts(&assembly.blocks),
        vec!["The committee recommended a continuation of policy."]
    );
    assert_eq!(assembly.blocks[0].page_span, (0, 1));
}

#[test]
fn open_sentence_continues_across_the_boundary() {
    let assembly = assemble(&[
        "Intro paragraph.\n\nThe measurements were repeated under varying load until",
        "the results converged to within one percent.\n\nNext section text.",
    ]);

    assert_eq!(assembly.merges, 1);
    let t = texts(&assembly.blocks);
    assert_eq!(t.len(), 3);
    assert_eq!(
        t[1],
        "The measurements were repeated under varying load until the results converged to within one percent."
    );
}

#[test]
fn complete_sentences_are_left_alone() {
    let assembly = assemble(&[
        "The first page ends with a complete sentence.",
        "The second page starts a fresh one.",
    ]);

    assert_eq!(assembly.merges, 0);
    assert_eq!(assembly.blocks.len(), 2);
}

// ── Table stitching ──────────────────────────────────────────────────────

#[test]
fn split_table_with_repeated_header_is_stitched() {
    let assembly = assemble(&[
        "| Name | Age |\n| --- | --- |\n| Alice | 30 |",
        "| Name | Age |\n| Bob | 25 |",
    ]);

    assert_eq!(assembly.merges, 1);
    assert_eq!(assembly.blocks.len(), 1);
    let BlockKind::Table(grid) = &assembly.blocks[0].kind else {
        panic!("expected table");
    };
    // Header + Alice + Bob; the repeated header row is gone.
    assert_eq!(grid.row_count(), 3);
    assert_eq!(grid.rows()[1][0].text, "Alice");
    assert_eq!(grid.rows()[2][0].text, "Bob");
    assert_eq!(assembly.blocks[0].page_span, (0, 1));
}

#[test]
fn column_count_mismatch_keeps_both_tables() {
    let assembly = assemble(&[
        "| A | B | C |\n| --- | --- | --- |\n| 1 | 2 | 3 |",
        "| w | x | y | z |\n| --- | --- | --- | --- |\n| 4 | 5 | 6 | 7 |",
    ]);

    assert_eq!(assembly.merges, 0);
    assert_eq!(assembly.blocks.len(), 2);
    assert!(assembly
        .blocks
        .iter()
        .all(|b| matches!(b.kind, BlockKind::Table(_))));
}

#[test]
fn html_table_continuation_merges_with_pipe_table() {
    let assembly = assemble(&[
        "<table><tr><th>Name</th><th>Age</th></tr><tr><td>Alice</td><td>30</td></tr></table>",
        "| Name | Age |\n| Bob | 25 |",
    ]);

    assert_eq!(assembly.merges, 1);
    let BlockKind::Table(grid) = &assembly.blocks[0].kind else {
        panic!("expected table");
    };
    assert_eq!(grid.row_count(), 3);
}

// ── Furniture ────────────────────────────────────────────────────────────

#[test]
fn page_numbers_are_suppressed() {
    let assembly = assemble(&[
        "Body text of page one.\n\n— 12 —",
        "— 13 —\n\nBody text of page two.",
    ]);

    assert_eq!(assembly.furniture_dropped, 2);
    assert_eq!(
        texts(&assembly.blocks),
        vec!["Body text of page one.", "Body text of page two."]
    );
}

#[test]
fn furniture_between_split_paragraph_does_not_block_the_merge() {
    let assembly = assemble(&[
        "The quarterly figures showed the revenue trend was continu-\n\nPage 7",
        "Page 8\n\ning to improve across all regions.",
    ]);

    assert_eq!(assembly.furniture_dropped, 2);
    assert_eq!(assembly.merges, 1);
    assert_eq!(
        texts(&assembly.blocks),
        vec!["The quarterly figures showed the revenue trend was continuing to improve across all regions."]
    );
}

#[test]
fn keep_furniture_retains_blocks_but_never_merges_them() {
    let assembly = assemble_with(&["Body text.\n\n— 12 —", "Next page body."], false);

    assert_eq!(assembly.furniture_dropped, 0);
    assert_eq!(assembly.blocks.len(), 3);
    assert!(matches!(assembly.blocks[1].kind, BlockKind::Furniture { .. }));
}

// ── Invariants ───────────────────────────────────────────────────────────

#[test]
fn output_count_never_exceeds_input_count() {
    let pages = [
        "# Title\n\nSome intro text that ends mid-sentence and keeps",
        "going onto the second page.\n\n| A | B |\n| --- | --- |\n| 1 | 2 |",
        "| A | B |\n| 3 | 4 |\n\nClosing remarks.\n\n— 3 —",
    ];
    let assembly = assemble(&pages);
    assert!(assembly.blocks.len() <= assembly.input_blocks);
    assert_eq!(
        assembly.blocks.len(),
        assembly.input_blocks - assembly.merges - assembly.furniture_dropped
    );
}

#[test]
fn relative_order_of_unmerged_blocks_is_preserved() {
    let assembly = assemble(&[
        "first one.\n\nsecond one.",
        "third one.\n\nfourth one.",
    ]);

    assert_eq!(
        texts(&assembly.blocks),
        vec!["first one.", "second one.", "third one.", "fourth one."]
    );
    // (page, order) keys are non-decreasing through the output.
    let keys: Vec<(usize, usize)> = assembly.blocks.iter().map(|b| (b.page, b.order)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn assembly_is_deterministic() {
    let pages = [
        "An unfinished thought about the nature of",
        "deterministic systems.\n\n| X |\n| --- |\n| 1 |",
        "| X |\n| 2 |",
    ];
    let a = assemble(&pages);
    let b = assemble(&pages);
    assert_eq!(a.blocks, b.blocks);
    assert_eq!(a.merges, b.merges);
}

// ── Degradation ──────────────────────────────────────────────────────────

#[test]
fn one_malformed_page_degrades_locally() {
    // Page 3 of 5 is an unterminated HTML table: it must become a raw-text
    // paragraph while both of its seams still get evaluated and the rest of
    // the document assembles normally.
    let pages = [
        "Page one text.",
        "Page two text.",
        "<table><tr><td>orphan row",
        "Page four text.",
        "Page five text.",
    ];
    let assembly = assemble(&pages);

    assert_eq!(assembly.blocks.len(), 5);
    let BlockKind::Paragraph { text } = &assembly.blocks[2].kind else {
        panic!("malformed table should degrade to a paragraph");
    };
    assert!(text.contains("orphan row"), "raw text preserved: {text}");
}

#[test]
fn empty_page_contributes_nothing_and_breaks_no_neighbours() {
    let mut asm = DocumentAssembler::new(THRESHOLDS, true);
    asm.push_page(0, parse_page("Page one.", 0).unwrap());
    asm.push_page(1, Vec::new()); // failed/empty transcript
    asm.push_page(2, parse_page("Page three.", 2).unwrap());
    let assembly = asm.finish().unwrap();

    assert_eq!(texts(&assembly.blocks), vec!["Page one.", "Page three."]);
}

// ── Rendering ────────────────────────────────────────────────────────────

#[test]
fn markdown_output_carries_provenance_for_merged_blocks() {
    let assembly = assemble(&[
        "| Name | Age |\n| --- | --- |\n| Alice | 30 |",
        "| Name | Age |\n| Bob | 25 |",
    ]);
    let md = render_markdown(&assembly.blocks);

    assert!(md.contains("<!-- pages 1-2 -->"), "got: {md}");
    assert!(md.contains("| Alice | 30 |"));
    assert!(md.contains("| Bob | 25 |"));
}

#[test]
fn full_document_renders_in_reading_order() {
    let assembly = assemble(&[
        "# Report\n\nThe first finding was that throughput was continu-",
        "ously improving.\n\n## Details\n\n- point one\n- point two",
    ]);
    let md = render_markdown(&assembly.blocks);

    let report = md.find("# Report").unwrap();
    let finding = md.find("continuously improving").unwrap();
    let details = md.find("## Details").unwrap();
    let list = md.find("- point one").unwrap();
    assert!(report < finding && finding < details && details < list);
}
