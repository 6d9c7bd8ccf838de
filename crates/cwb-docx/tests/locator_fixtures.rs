//! Locator behaviour against packaged template fixtures

use cwb_docx::{open_part, read_tree, FileFormatError, Locator, DOCUMENT_PART};
use cwb_test_utils::{plan_summary_template, BodyBuilder};

#[test]
fn trailing_colon_label_matches_plain_cell() {
    let archive = BodyBuilder::new()
        .table(&[&["DOPT (Termination Date)", ""], &["DOPT", ""]])
        .into_package();
    let tree = read_tree(&archive, DOCUMENT_PART).unwrap();
    let locator = Locator::new(&tree);

    let cell = locator.find_cell_by_label_anywhere("DOPT:").node().unwrap();
    assert_eq!(locator.visible_text(cell), "DOPT");
}

#[test]
fn heading_selects_first_following_table_only() {
    let archive = BodyBuilder::new()
        .paragraph("Introduction")
        .table(&[&["Before heading"]])
        .paragraph("PBGC Lump Sum Rates")
        .paragraph("(rates in percent)")
        .table(&[&["T1"]])
        .table(&[&["T2"]])
        .into_package();
    let tree = read_tree(&archive, DOCUMENT_PART).unwrap();
    let locator = Locator::new(&tree);

    let table = locator
        .find_rates_block_table("PBGC Lump Sum Rates")
        .node()
        .unwrap();
    assert_eq!(locator.visible_text(table), "T1");
}

#[test]
fn plan_summary_fixture_resolves_every_block() {
    let tree = read_tree(&plan_summary_template(), DOCUMENT_PART).unwrap();
    let locator = Locator::new(&tree);

    for heading in ["PBGC Lump Sum Rates", "PBGC Annuity Rates"] {
        let table = locator.find_rates_block_table(heading).node().unwrap();
        assert!(locator.find_cell_by_label(table, "Immediate Rate").is_found());
        assert!(locator.find_cell_by_label(table, "Deferral Rate").is_found());
    }

    let lump = locator.find_rates_block_table("PBGC Lump Sum Rates").node();
    let annuity = locator.find_rates_block_table("PBGC Annuity Rates").node();
    assert_ne!(lump, annuity);

    for label in ["Plan Name", "Case Number", "DOPT", "DOTR", "BPD"] {
        assert!(
            locator.find_cell_by_label_anywhere(label).is_found(),
            "{label} should be found"
        );
    }
}

#[test]
fn unknown_entry_is_missing_part() {
    let archive = plan_summary_template();
    let snapshot = archive.clone();

    let result = open_part(&archive, "word/footer9.xml");
    assert!(matches!(result, Err(FileFormatError::MissingPart(ref part)) if part == "word/footer9.xml"));
    assert_eq!(archive, snapshot);
}
