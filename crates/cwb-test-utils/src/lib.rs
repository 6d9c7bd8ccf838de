//! Testing utilities for CWB workspace
//!
//! Shared fixtures: in-memory document packages, WordprocessingML bodies,
//! and sample metadata / answer records.

#![allow(missing_docs)]

use serde_json::{json, Value};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Builds a zip package in memory
#[derive(Debug, Default)]
pub struct PackageBuilder {
    entries: Vec<(String, Vec<u8>, CompressionMethod)>,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deflated text entry
    #[must_use]
    pub fn part(mut self, name: &str, text: &str) -> Self {
        self.entries
            .push((name.to_string(), text.as_bytes().to_vec(), CompressionMethod::Deflated));
        self
    }

    /// Stored (uncompressed) binary entry
    #[must_use]
    pub fn stored_part(mut self, name: &str, bytes: &[u8]) -> Self {
        self.entries
            .push((name.to_string(), bytes.to_vec(), CompressionMethod::Stored));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes, method) in self.entries {
            let options = SimpleFileOptions::default()
                .compression_method(method)
                .last_modified_time(zip::DateTime::default());
            writer.start_file(name, options).unwrap();
            writer.write_all(&bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

/// Builds a `word/document.xml` body out of paragraphs and tables
#[derive(Debug, Default)]
pub struct BodyBuilder {
    blocks: Vec<String>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn paragraph(mut self, text: &str) -> Self {
        self.blocks.push(paragraph_xml(text));
        self
    }

    /// Table whose rows are lists of cell texts; an empty text makes an empty paragraph
    #[must_use]
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        let mut xml = String::from("<w:tbl><w:tblPr/>");
        for row in rows {
            xml.push_str("<w:tr>");
            for cell in *row {
                xml.push_str("<w:tc><w:tcPr/>");
                xml.push_str(&paragraph_xml(cell));
                xml.push_str("</w:tc>");
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        self.blocks.push(xml);
        self
    }

    /// Verbatim body fragment
    #[must_use]
    pub fn raw(mut self, xml: &str) -> Self {
        self.blocks.push(xml.to_string());
        self
    }

    pub fn build(self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            self.blocks.concat()
        )
    }

    /// Wrap the body in a minimal package
    pub fn into_package(self) -> Vec<u8> {
        package_with_document(&self.build())
    }
}

fn paragraph_xml(text: &str) -> String {
    if text.is_empty() {
        "<w:p/>".to_string()
    } else {
        format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Minimal package around a document part
pub fn package_with_document(document_xml: &str) -> Vec<u8> {
    PackageBuilder::new()
        .part("[Content_Types].xml", CONTENT_TYPES)
        .part("_rels/.rels", ROOT_RELS)
        .part(DOCUMENT_PART, document_xml)
        .stored_part("docProps/thumbnail.bin", &[0x89, 0x50, 0x4e, 0x47, 0x00, 0xff])
        .build()
}

/// Body shaped like the plan summary template
pub fn plan_summary_body() -> BodyBuilder {
    BodyBuilder::new()
        .paragraph("Plan Summary")
        .table(&[
            &["Plan Name", "Case Number:"],
            &["DOPT", "DOTR"],
            &["BPD", "DOPT (Termination Date)"],
        ])
        .paragraph("PBGC Lump Sum Rates")
        .table(&[&["Immediate Rate", "Deferral Rate"]])
        .paragraph("PBGC Annuity Rates")
        .table(&[&["Immediate Rate", "Deferral Rate"]])
}

/// Plan summary template package
pub fn plan_summary_template() -> Vec<u8> {
    plan_summary_body().into_package()
}

/// A field value with one well-formed citation
pub fn cited(value: &str) -> Value {
    json!({
        "value": value,
        "citations": [{"doc_id": "DOC-1", "page": 3, "locator": "p.3 table 1"}]
    })
}

/// Authoritative metadata with header fields populated
pub fn sample_metadata() -> Value {
    json!({
        "schema_version": "0.7.0",
        "meta": {
            "case_number": cited("17-00045"),
            "case_processing_section": {"value": "unknown", "citations": []},
            "notes": {"value": "unknown", "citations": []}
        },
        "plan": {
            "plan_name": cited("Acme Pension Plan"),
            "termination_date": cited("2017-06-30"),
            "trusteeship_date": {"value": "2018-01-15", "citations": []},
            "valuation_date": {"value": "unknown", "citations": []},
            "pbgc_annuity_immediate_rate": {"value": "unknown", "citations": []}
        },
        "documents": [],
        "other_attributes": []
    })
}

/// Answer record carrying rate answers
pub fn sample_answers() -> Value {
    json!({
        "dependent_fields": {
            "pbgc_lump_sum_deferral_rate": "4.25%"
        },
        "items": [
            {"r5_id": "Q12", "label": "PBGC lump sum immediate rate", "answer": "3.50%"},
            {"r5_id": "Q13", "label": "PBGC annuity rates", "answer": "2.75% / 3.00%"},
            "not an item",
            {"r5_id": "Q14", "label": "Unrelated question", "answer": ""}
        ]
    })
}
