//! Input records
//!
//! Typed views over the two structured inputs of a fill run:
//!
//! - [`PlanMetadata`]: the authoritative record (`meta`, `plan`,
//!   `other_attributes`, optional `dependent_fields`)
//! - [`AnswerRecord`]: the semi-structured answer set (`items`,
//!   `dependent_fields`, loose top-level fields)
//!
//! Decoding is lenient: a well-shaped top level is required, but any field
//! that is missing or malformed reads as absent instead of failing the run.
//! The literal value `"unknown"` is kept and surfaced as
//! [`FieldSlot::Unknown`], distinct from [`FieldSlot::Unset`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// Sentinel the source data uses for "looked, but not determined"
pub const UNKNOWN: &str = "unknown";

/// Schema version written into blank documents
pub const SCHEMA_VERSION: &str = "0.7.0";

/// Fields of the `meta` section in a blank document
pub const META_FIELDS: &[&str] = &["case_number", "case_processing_section", "notes"];

/// Fields of the `plan` section in a blank document
pub const PLAN_FIELDS: &[&str] = &[
    "plan_name",
    "plan_number",
    "ein",
    "case_processing_section",
    "actuary",
    "auditor",
    "plan_sponsor_name",
    "plan_type",
    "effective_date",
    "termination_date",
    "termination_type",
    "trusteeship_date",
    "nod_date",
    "noit_date",
    "bpd_bankruptcy",
    "dobf",
    "employer_status",
    "facility_closing_date",
    "successor_plan",
    "plan_assets",
    "sparr",
    "funding_status",
    "valuation_date",
    "pbgc_case_status",
    "participant_count",
    "pbgc_lump_sum_first_segment",
    "pbgc_lump_sum_second_segment",
    "pbgc_lump_sum_third_segment",
    "pbgc_annuity_immediate_rate",
    "pbgc_annuity_thereafter_rate",
];

/// Encoding of a structured input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    #[default]
    Json,
    Yaml,
}

impl RecordFormat {
    /// Pick the format from a file extension (`.yaml` / `.yml` are YAML)
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    /// Decode bytes into a structured value
    ///
    /// # Errors
    /// `RecordError::Json` / `RecordError::Yaml` on syntax errors
    pub fn parse(self, kind: &'static str, bytes: &[u8]) -> Result<Value, RecordError> {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|source| RecordError::Json { kind, source }),
            Self::Yaml => serde_yaml::from_slice(bytes).map_err(|source| RecordError::Yaml { kind, source }),
        }
    }
}

/// Source reference backing a field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    pub page: u64,
    pub locator: String,
}

impl Citation {
    /// Well-formed citation from loose data
    ///
    /// `doc_id` and `locator` must be non-blank strings; `page` a positive
    /// integer or a string holding one.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let doc_id = non_blank(object.get("doc_id")?)?;
        let locator = non_blank(object.get("locator")?)?;
        let page = match object.get("page")? {
            Value::Number(n) => n.as_u64()?,
            Value::String(s) => s.trim().parse::<u64>().ok()?,
            _ => return None,
        };
        (page > 0).then(|| Self {
            doc_id: doc_id.to_string(),
            page,
            locator: locator.to_string(),
        })
    }
}

fn non_blank(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

/// A value plus the citations supporting it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl FieldValue {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            citations: Vec::new(),
        }
    }

    /// `{value: "unknown", citations: []}`
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN)
    }

    #[must_use]
    pub fn with_citation(mut self, citation: Citation) -> Self {
        self.citations.push(citation);
        self
    }

    /// True if the value is the `"unknown"` sentinel
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.value.trim() == UNKNOWN
    }

    /// Lenient decode of `{value, citations}`
    ///
    /// Scalars are rendered as text. If any citation is ill-formed the whole
    /// citation list is dropped. Returns `None` when there is no value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = scalar_text(object.get("value")?)?;
        let citations = match object.get("citations") {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(Citation::from_value)
                .collect::<Option<Vec<_>>>()
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        Some(Self {
            value: text,
            citations,
        })
    }
}

/// Text of a scalar; `None` for null, arrays and mappings
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// What a record says about one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSlot<'a> {
    /// Field not present (or not decodable)
    Unset,
    /// Present with the `"unknown"` sentinel
    Unknown(&'a FieldValue),
    /// Present with any other value
    Known(&'a FieldValue),
}

impl<'a> FieldSlot<'a> {
    fn of(field: Option<&'a FieldValue>) -> Self {
        match field {
            None => Self::Unset,
            Some(field) if field.is_unknown() => Self::Unknown(field),
            Some(field) => Self::Known(field),
        }
    }

    /// Value usable for filling: known and not blank
    #[must_use]
    pub fn usable(&self) -> Option<&'a str> {
        match self {
            Self::Known(field) if !field.value.trim().is_empty() => Some(field.value.as_str()),
            _ => None,
        }
    }

    /// Underlying field, if present
    #[must_use]
    pub fn field(&self) -> Option<&'a FieldValue> {
        match self {
            Self::Unset => None,
            Self::Unknown(field) | Self::Known(field) => Some(field),
        }
    }
}

/// Named fields of one section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeMap<String, FieldValue>);

impl FieldSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `key`
    #[must_use]
    pub fn slot(&self, key: &str) -> FieldSlot<'_> {
        FieldSlot::of(self.0.get(key))
    }

    pub fn insert(&mut self, key: impl Into<String>, field: FieldValue) {
        self.0.insert(key.into(), field);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn from_value(value: Option<&Value>) -> Self {
        let fields = value
            .and_then(Value::as_object)
            .map(|object| {
                object
                    .iter()
                    .filter_map(|(key, entry)| FieldValue::from_value(entry).map(|f| (key.clone(), f)))
                    .collect()
            })
            .unwrap_or_default();
        Self(fields)
    }
}

/// Free-form attribute outside the fixed sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherAttribute {
    pub name: String,
    #[serde(flatten)]
    pub field: FieldValue,
}

/// Section of the authoritative record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Meta,
    Plan,
    Other,
}

/// Authoritative plan metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub schema_version: String,
    pub meta: FieldSet,
    pub plan: FieldSet,
    #[serde(default)]
    pub documents: Vec<Value>,
    #[serde(default)]
    pub other_attributes: Vec<OtherAttribute>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependent_fields: BTreeMap<String, String>,
}

impl PlanMetadata {
    /// Empty record: every known field `"unknown"` with no citations
    #[must_use]
    pub fn blank_document() -> Self {
        let section = |keys: &[&str]| {
            let mut set = FieldSet::new();
            for key in keys {
                set.insert(*key, FieldValue::unknown());
            }
            set
        };
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            meta: section(META_FIELDS),
            plan: section(PLAN_FIELDS),
            documents: Vec::new(),
            other_attributes: Vec::new(),
            dependent_fields: BTreeMap::new(),
        }
    }

    /// Lenient decode
    ///
    /// # Errors
    /// `RecordError::NotAnObject` if the top level is not a mapping
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let object = value
            .as_object()
            .ok_or_else(|| RecordError::not_an_object("metadata"))?;

        let other_attributes = object
            .get("other_attributes")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let name = non_blank(entry.get("name")?)?.to_string();
                        let field = FieldValue::from_value(entry)?;
                        Some(OtherAttribute { name, field })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            schema_version: object
                .get("schema_version")
                .and_then(scalar_text)
                .unwrap_or_default(),
            meta: FieldSet::from_value(object.get("meta")),
            plan: FieldSet::from_value(object.get("plan")),
            documents: object
                .get("documents")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            other_attributes,
            dependent_fields: scalar_map(object.get("dependent_fields")),
        })
    }

    /// Slot for `key` in `section`
    #[must_use]
    pub fn slot(&self, section: Section, key: &str) -> FieldSlot<'_> {
        match section {
            Section::Meta => self.meta.slot(key),
            Section::Plan => self.plan.slot(key),
            Section::Other => self.other_attribute(key),
        }
    }

    /// First other-attribute named `name`
    #[must_use]
    pub fn other_attribute(&self, name: &str) -> FieldSlot<'_> {
        FieldSlot::of(
            self.other_attributes
                .iter()
                .find(|attr| attr.name == name)
                .map(|attr| &attr.field),
        )
    }

    /// Record as a structured value
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Flat `key -> scalar text` view of a mapping; non-scalars are skipped
fn scalar_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|object| {
            object
                .iter()
                .filter_map(|(key, v)| scalar_text(v).map(|text| (key.clone(), text)))
                .collect()
        })
        .unwrap_or_default()
}

/// One question of the answer set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerItem {
    pub identifier: String,
    pub label: String,
    pub answer: String,
}

impl AnswerItem {
    /// Lenient decode; `None` unless the entry is a mapping
    ///
    /// The identifier is read from `r5_id`, `identifier` or `id`, in that order.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| object.get(key).and_then(scalar_text);
        Some(Self {
            identifier: text("r5_id")
                .or_else(|| text("identifier"))
                .or_else(|| text("id"))
                .unwrap_or_default(),
            label: text("label").unwrap_or_default(),
            answer: text("answer").unwrap_or_default(),
        })
    }
}

/// Externally supplied answer set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerRecord {
    items: Vec<AnswerItem>,
    dependent_fields: BTreeMap<String, String>,
    fields: BTreeMap<String, String>,
}

impl AnswerRecord {
    /// Lenient decode; malformed items are skipped
    ///
    /// # Errors
    /// `RecordError::NotAnObject` if the top level is not a mapping
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let object = value
            .as_object()
            .ok_or_else(|| RecordError::not_an_object("answer"))?;

        let items: Vec<AnswerItem> = object
            .get("items")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(AnswerItem::from_value).collect())
            .unwrap_or_default();

        let mut top_level = Map::new();
        for (key, v) in object {
            if key != "items" && key != "dependent_fields" {
                top_level.insert(key.clone(), v.clone());
            }
        }

        Ok(Self {
            items,
            dependent_fields: scalar_map(object.get("dependent_fields")),
            fields: scalar_map(Some(&Value::Object(top_level))),
        })
    }

    #[must_use]
    pub fn with_item(mut self, item: AnswerItem) -> Self {
        self.items.push(item);
        self
    }

    #[must_use]
    pub fn with_dependent_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dependent_fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Items in input order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[AnswerItem] {
        &self.items
    }

    #[inline]
    #[must_use]
    pub fn dependent_field(&self, key: &str) -> Option<&str> {
        self.dependent_fields.get(key).map(String::as_str)
    }

    /// Top-level scalar field
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwb_test_utils::{sample_answers, sample_metadata};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn slots_distinguish_unset_unknown_known() {
        let meta = PlanMetadata::from_value(&sample_metadata()).unwrap();

        assert!(matches!(meta.slot(Section::Plan, "ein"), FieldSlot::Unset));
        assert!(matches!(meta.slot(Section::Plan, "valuation_date"), FieldSlot::Unknown(_)));
        assert_eq!(
            meta.slot(Section::Plan, "plan_name").usable(),
            Some("Acme Pension Plan")
        );
        assert_eq!(meta.slot(Section::Meta, "case_number").usable(), Some("17-00045"));
        assert_eq!(meta.slot(Section::Plan, "valuation_date").usable(), None);
    }

    #[test]
    fn ill_formed_citation_empties_the_list() {
        let field = FieldValue::from_value(&json!({
            "value": "Acme",
            "citations": [
                {"doc_id": "D1", "page": 2, "locator": "p.2"},
                {"doc_id": "", "page": 4, "locator": "p.4"}
            ]
        }))
        .unwrap();
        assert_eq!(field.value, "Acme");
        assert!(field.citations.is_empty());

        let field = FieldValue::from_value(&json!({
            "value": "Acme",
            "citations": [{"doc_id": "D1", "page": "7", "locator": "p.7"}]
        }))
        .unwrap();
        assert_eq!(field.citations[0].page, 7);
    }

    #[test]
    fn citation_page_must_be_positive_integer() {
        assert!(Citation::from_value(&json!({"doc_id": "D", "page": 0, "locator": "x"})).is_none());
        assert!(Citation::from_value(&json!({"doc_id": "D", "page": 1.5, "locator": "x"})).is_none());
        assert!(Citation::from_value(&json!({"doc_id": "D", "locator": "x"})).is_none());
    }

    #[test]
    fn malformed_fields_read_as_absent() {
        let meta = PlanMetadata::from_value(&json!({
            "plan": {
                "plan_name": "bare string",
                "ein": {"citations": []},
                "plan_number": {"value": 12345, "citations": []},
                "actuary": {"value": null}
            },
            "meta": []
        }))
        .unwrap();
        assert!(matches!(meta.plan.slot("plan_name"), FieldSlot::Unset));
        assert!(matches!(meta.plan.slot("ein"), FieldSlot::Unset));
        assert!(matches!(meta.plan.slot("actuary"), FieldSlot::Unset));
        assert_eq!(meta.plan.slot("plan_number").usable(), Some("12345"));
        assert!(meta.meta.is_empty());
    }

    #[test]
    fn metadata_must_be_a_mapping() {
        assert!(matches!(
            PlanMetadata::from_value(&json!([1, 2])),
            Err(RecordError::NotAnObject { kind: "metadata" })
        ));
    }

    #[test]
    fn blank_document_shape() {
        let blank = PlanMetadata::blank_document();
        assert_eq!(blank.schema_version, "0.7.0");
        assert_eq!(blank.meta.len(), META_FIELDS.len());
        assert_eq!(blank.plan.len(), PLAN_FIELDS.len());
        assert!(blank.plan.iter().all(|(_, f)| f.is_unknown() && f.citations.is_empty()));

        let value = blank.to_value();
        assert_eq!(value["plan"]["plan_name"], json!({"value": "unknown", "citations": []}));
        assert_eq!(value["documents"], json!([]));
        assert_eq!(value["other_attributes"], json!([]));
        assert!(value.get("dependent_fields").is_none());

        assert_eq!(PlanMetadata::from_value(&value).unwrap(), blank);
    }

    #[test]
    fn other_attributes_by_name() {
        let meta = PlanMetadata::from_value(&json!({
            "other_attributes": [
                {"name": "Union", "value": "IAM Local 1", "citations": []},
                {"value": "nameless"},
                {"name": "Union", "value": "shadowed"}
            ]
        }))
        .unwrap();
        assert_eq!(meta.other_attributes.len(), 2);
        assert_eq!(meta.slot(Section::Other, "Union").usable(), Some("IAM Local 1"));
        assert!(matches!(meta.other_attribute("Missing"), FieldSlot::Unset));
    }

    #[test]
    fn answer_record_skips_malformed_items() {
        let answers = AnswerRecord::from_value(&sample_answers()).unwrap();
        assert_eq!(answers.items().len(), 3);
        assert_eq!(answers.items()[0].identifier, "Q12");
        assert_eq!(answers.dependent_field("pbgc_lump_sum_deferral_rate"), Some("4.25%"));
    }

    #[test]
    fn answer_record_top_level_scalars() {
        let answers = AnswerRecord::from_value(&json!({
            "pbgc_annuity_rates": "3%",
            "count": 4,
            "nested": {"a": 1},
            "items": [{"identifier": "X1", "answer": 9}]
        }))
        .unwrap();
        assert_eq!(answers.field("pbgc_annuity_rates"), Some("3%"));
        assert_eq!(answers.field("count"), Some("4"));
        assert_eq!(answers.field("nested"), None);
        assert_eq!(answers.field("items"), None);
        assert_eq!(answers.items()[0].identifier, "X1");
        assert_eq!(answers.items()[0].answer, "9");
    }

    #[test]
    fn record_format_by_extension() {
        assert_eq!(RecordFormat::from_path("r5.yaml"), RecordFormat::Yaml);
        assert_eq!(RecordFormat::from_path("R5.YML"), RecordFormat::Yaml);
        assert_eq!(RecordFormat::from_path("r5.json"), RecordFormat::Json);
        assert_eq!(RecordFormat::from_path("answers"), RecordFormat::Json);

        let value = RecordFormat::Yaml
            .parse("answer", b"dependent_fields:\n  rate: '5%'\n")
            .unwrap();
        assert_eq!(value["dependent_fields"]["rate"], json!("5%"));
        assert!(RecordFormat::Json.parse("answer", b"{oops").is_err());
    }
}
