//! Fill runs against packaged templates with the built-in schema

use cwb_artifact::ContentHash;
use cwb_core::{
    FillConfig, JsonSchemaValidator, MetadataValidator, RecordFormat, Workbench, WorkbenchError,
};
use cwb_docx::{list_parts, open_part, DocxError, DOCUMENT_PART};
use cwb_test_utils::{plan_summary_template, sample_answers, sample_metadata, BodyBuilder};
use pretty_assertions::assert_eq;
use serde_json::json;

fn workbench() -> Workbench {
    Workbench::with_builtin_schema(FillConfig::new()).unwrap()
}

fn answers() -> Vec<u8> {
    serde_json::to_vec(&sample_answers()).unwrap()
}

#[test]
fn case_number_is_appended_after_label() {
    let report = workbench()
        .fill(&plan_summary_template(), &answers(), RecordFormat::Json, &sample_metadata())
        .unwrap();

    assert_eq!(report.log.lines()[1], r#"{"ok":true,"reason":"appended"}"#);
    let document = open_part(&report.archive, DOCUMENT_PART).unwrap();
    assert!(document.contains("Case Number:"));
    assert!(document.contains(" 17-00045"));
}

#[test]
fn bare_case_number_record_fills_without_citations() {
    let metadata = json!({"meta": {"case_number": {"value": "17-00045"}}});
    let report = workbench()
        .fill(&plan_summary_template(), b"{}", RecordFormat::Json, &metadata)
        .unwrap();

    let lines = report.log.lines();
    assert_eq!(lines[1], r#"{"ok":true,"reason":"appended"}"#);
    assert!(lines[0].contains("value_unresolved"), "{}", lines[0]);
    let document = open_part(&report.archive, DOCUMENT_PART).unwrap();
    assert!(document.contains(" 17-00045"));
}

#[test]
fn uncited_values_pass_the_builtin_schema() {
    let validator = JsonSchemaValidator::builtin().unwrap();
    assert!(validator
        .validate(&json!({"meta": {"case_number": {"value": "17-00045"}}}))
        .is_ok());
}

#[test]
fn refilling_the_output_changes_nothing() {
    let workbench = workbench();
    let metadata = sample_metadata();
    let answers = answers();

    let first = workbench
        .fill(&plan_summary_template(), &answers, RecordFormat::Json, &metadata)
        .unwrap();
    let second = workbench
        .fill(&first.archive, &answers, RecordFormat::Json, &metadata)
        .unwrap();

    assert_eq!(second.archive, first.archive);
    let document = open_part(&second.archive, DOCUMENT_PART).unwrap();
    assert_eq!(document.matches("Acme Pension Plan").count(), 1);
}

#[test]
fn only_the_document_part_changes() {
    let template = plan_summary_template();
    let report = workbench()
        .fill(&template, &answers(), RecordFormat::Json, &sample_metadata())
        .unwrap();

    assert_eq!(list_parts(&report.archive).unwrap(), list_parts(&template).unwrap());
    for part in ["[Content_Types].xml", "_rels/.rels"] {
        assert_eq!(
            open_part(&report.archive, part).unwrap(),
            open_part(&template, part).unwrap()
        );
    }
    assert_ne!(
        open_part(&report.archive, DOCUMENT_PART).unwrap(),
        open_part(&template, DOCUMENT_PART).unwrap()
    );
}

#[test]
fn missing_rates_blocks_are_reported_up_front() {
    let template = BodyBuilder::new()
        .table(&[&["Plan Name", "Case Number"], &["DOPT", "DOTR"], &["BPD", ""]])
        .into_package();
    let report = workbench()
        .fill(&template, &answers(), RecordFormat::Json, &sample_metadata())
        .unwrap();

    let lines = report.log.lines();
    assert_eq!(lines[5], "ERROR: Could not locate PBGC Lump Sum Rates block table.");
    assert_eq!(lines[6], "ERROR: Could not locate PBGC Annuity Rates block table.");
    assert!(lines[7..].iter().all(|line| line.contains("locator_not_found")));
    assert!(!report.log.is_clean());
}

#[test]
fn invalid_metadata_reports_every_issue() {
    let mut metadata = sample_metadata();
    metadata["plan"]["plan_name"] = json!({"citations": []});

    let err = workbench()
        .fill(&plan_summary_template(), &answers(), RecordFormat::Json, &metadata)
        .unwrap_err();
    let failed = match err {
        WorkbenchError::Validation(failed) => failed,
        other => panic!("expected validation failure, got {other}"),
    };
    assert!(failed.issues().iter().any(|issue| issue.path == "/plan/plan_name"));
}

#[test]
fn corrupt_template_aborts_the_run() {
    let err = workbench()
        .fill(b"not a zip", &answers(), RecordFormat::Json, &sample_metadata())
        .unwrap_err();
    assert!(matches!(err, WorkbenchError::Document(DocxError::FileFormat(_))), "{err}");
}

#[test]
fn content_hash_ignores_key_order() {
    let workbench = workbench();
    let metadata = sample_metadata();
    let reordered: serde_json::Value = serde_json::from_str(
        r#"{
            "other_attributes": [],
            "documents": [],
            "plan": {
                "pbgc_annuity_immediate_rate": {"citations": [], "value": "unknown"},
                "valuation_date": {"citations": [], "value": "unknown"},
                "trusteeship_date": {"citations": [], "value": "2018-01-15"},
                "termination_date": {"citations": [{"locator": "p.3 table 1", "page": 3, "doc_id": "DOC-1"}], "value": "2017-06-30"},
                "plan_name": {"citations": [{"page": 3, "doc_id": "DOC-1", "locator": "p.3 table 1"}], "value": "Acme Pension Plan"}
            },
            "meta": {
                "notes": {"value": "unknown", "citations": []},
                "case_processing_section": {"value": "unknown", "citations": []},
                "case_number": {"value": "17-00045", "citations": [{"doc_id": "DOC-1", "page": 3, "locator": "p.3 table 1"}]}
            },
            "schema_version": "0.7.0"
        }"#,
    )
    .unwrap();

    let original = workbench.content_hash(&metadata).unwrap();
    assert_eq!(workbench.content_hash(&reordered).unwrap(), original);
    assert_eq!(original, ContentHash::of_canonical(&metadata).unwrap());

    let saved = workbench.save_metadata(&reordered).unwrap();
    assert_eq!(*saved.content_hash(), original);
}
