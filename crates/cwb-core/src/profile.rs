//! Template profiles
//!
//! A profile is the ordered worklist for one template: which labelled cells
//! to fill and where each value comes from. The built-in
//! [`TemplateProfile::plan_summary`] covers the plan summary template;
//! other templates can be described in TOML:
//!
//! ```toml
//! name = "plan-summary-lite"
//!
//! [[fields]]
//! label = "Plan Name"
//! source = { from = "metadata", section = "plan", key = "plan_name" }
//!
//! [[blocks]]
//! heading = "PBGC Lump Sum Rates"
//!
//! [[blocks.fields]]
//! label = "Immediate Rate"
//! summary = "imm"
//! source = { from = "resolve", candidates = [
//!     { key = "pbgc_lump_sum_immediate_rate", keywords = ["lump sum immediate"] },
//! ] }
//!
//! [[tables]]
//! labels = ["EIN", "Plan Number"]
//!
//! [[tables.fields]]
//! label = "EIN"
//! source = { from = "metadata", section = "plan", key = "ein" }
//! ```
//!
//! Execution order is fixed: `fields`, then `blocks`, then `tables`.

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::records::Section;
use crate::resolver::{Candidate, Resolver};

/// Where a field's value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ValueSource {
    /// A field of the authoritative record, used only when known and non-blank
    Metadata { section: Section, key: String },
    /// Precedence resolution over the candidates, first non-empty wins
    Resolve { candidates: Vec<Candidate> },
}

impl ValueSource {
    /// Metadata field source
    #[must_use]
    pub fn metadata(section: Section, key: impl Into<String>) -> Self {
        Self::Metadata {
            section,
            key: key.into(),
        }
    }

    /// Resolution source
    #[must_use]
    pub fn resolve(candidates: Vec<Candidate>) -> Self {
        Self::Resolve { candidates }
    }

    /// Evaluate against the inputs; empty means not supplied
    #[must_use]
    pub fn value(&self, resolver: &Resolver<'_>) -> String {
        match self {
            Self::Metadata { section, key } => resolver
                .metadata()
                .slot(*section, key)
                .usable()
                .unwrap_or_default()
                .to_string(),
            Self::Resolve { candidates } => resolver.resolve_first(candidates),
        }
    }
}

/// A labelled cell to fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub label: String,
    pub source: ValueSource,
    /// Tag in the block summary line (`imm`, `def`); blocks only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(label: impl Into<String>, source: ValueSource) -> Self {
        Self {
            label: label.into(),
            source,
            summary: None,
        }
    }

    #[must_use]
    pub fn with_summary(mut self, tag: impl Into<String>) -> Self {
        self.summary = Some(tag.into());
        self
    }
}

/// Fields scoped to the table under a heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub heading: String,
    pub fields: Vec<FieldSpec>,
}

/// Replace-clearing fields: value goes in the cell right of the label,
/// inside the first table that contains every label in `labels`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTableSpec {
    pub labels: Vec<String>,
    pub fields: Vec<FieldSpec>,
}

/// Ordered worklist for one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateProfile {
    pub name: String,
    /// Append-preserving, label looked up anywhere in the document
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Append-preserving, label looked up inside a heading's table
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
    /// Replace-clearing, right of the label
    #[serde(default)]
    pub tables: Vec<LabelTableSpec>,
}

impl Default for TemplateProfile {
    fn default() -> Self {
        Self::plan_summary()
    }
}

fn rate(key: &str, keywords: [&str; 2]) -> Candidate {
    Candidate::new(key).with_keywords(keywords)
}

impl TemplateProfile {
    /// Plan summary template worklist
    #[must_use]
    pub fn plan_summary() -> Self {
        let header = |label: &str, section: Section, key: &str| {
            FieldSpec::new(label, ValueSource::metadata(section, key))
        };
        let annuity_fallback = rate("pbgc_annuity_rates", ["pbgc annuity rates", "annuity rates"]);

        Self {
            name: "plan-summary".to_string(),
            fields: vec![
                header("Plan Name", Section::Plan, "plan_name"),
                header("Case Number", Section::Meta, "case_number"),
                header("DOPT", Section::Plan, "termination_date"),
                header("DOTR", Section::Plan, "trusteeship_date"),
                header("BPD", Section::Plan, "valuation_date"),
            ],
            blocks: vec![
                BlockSpec {
                    heading: "PBGC Lump Sum Rates".to_string(),
                    fields: vec![
                        FieldSpec::new(
                            "Immediate Rate",
                            ValueSource::resolve(vec![rate(
                                "pbgc_lump_sum_immediate_rate",
                                ["pbgc lump sum immediate", "lump sum immediate"],
                            )]),
                        )
                        .with_summary("imm"),
                        FieldSpec::new(
                            "Deferral Rate",
                            ValueSource::resolve(vec![rate(
                                "pbgc_lump_sum_deferral_rate",
                                ["pbgc lump sum deferral", "lump sum deferral"],
                            )]),
                        )
                        .with_summary("def"),
                    ],
                },
                BlockSpec {
                    heading: "PBGC Annuity Rates".to_string(),
                    fields: vec![
                        FieldSpec::new(
                            "Immediate Rate",
                            ValueSource::resolve(vec![
                                rate(
                                    "pbgc_annuity_immediate_rate",
                                    ["pbgc annuity immediate", "annuity immediate"],
                                ),
                                annuity_fallback.clone(),
                            ]),
                        )
                        .with_summary("imm"),
                        FieldSpec::new(
                            "Deferral Rate",
                            ValueSource::resolve(vec![
                                rate(
                                    "pbgc_annuity_deferral_rate",
                                    ["pbgc annuity deferral", "annuity deferral"],
                                ),
                                annuity_fallback,
                            ]),
                        )
                        .with_summary("def"),
                    ],
                },
            ],
            tables: Vec::new(),
        }
    }

    /// Parse and check a TOML profile
    ///
    /// # Errors
    /// `ProfileError` on syntax errors or an unusable worklist
    pub fn from_toml(text: &str) -> Result<Self, ProfileError> {
        let profile: Self = toml::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Total number of fields across all scopes
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
            + self.blocks.iter().map(|b| b.fields.len()).sum::<usize>()
            + self.tables.iter().map(|t| t.fields.len()).sum::<usize>()
    }

    /// Check the worklist is usable
    ///
    /// # Errors
    /// `ProfileError::Empty` with no fields; `ProfileError::Invalid` for blank
    /// labels or headings, empty candidate lists, or tables without labels
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.field_count() == 0 {
            return Err(ProfileError::Empty(self.name.clone()));
        }
        let invalid = |message: String| Err(ProfileError::invalid(self.name.clone(), message));

        let all_fields = self
            .fields
            .iter()
            .chain(self.blocks.iter().flat_map(|b| &b.fields))
            .chain(self.tables.iter().flat_map(|t| &t.fields));
        for field in all_fields {
            if field.label.trim().is_empty() {
                return invalid("field with blank label".to_string());
            }
            if let ValueSource::Resolve { candidates } = &field.source {
                if candidates.is_empty() {
                    return invalid(format!("field '{}' has no candidates", field.label));
                }
            }
        }
        for block in &self.blocks {
            if block.heading.trim().is_empty() {
                return invalid("block with blank heading".to_string());
            }
        }
        for table in &self.tables {
            if table.labels.is_empty() {
                return invalid("table without identifying labels".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plan_summary_worklist_order() {
        let profile = TemplateProfile::plan_summary();
        profile.validate().unwrap();

        let labels: Vec<&str> = profile.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, ["Plan Name", "Case Number", "DOPT", "DOTR", "BPD"]);

        let headings: Vec<&str> = profile.blocks.iter().map(|b| b.heading.as_str()).collect();
        assert_eq!(headings, ["PBGC Lump Sum Rates", "PBGC Annuity Rates"]);
        assert_eq!(profile.field_count(), 9);
    }

    #[test]
    fn annuity_fields_fall_back_to_combined_rates() {
        let profile = TemplateProfile::plan_summary();
        for field in &profile.blocks[1].fields {
            let ValueSource::Resolve { candidates } = &field.source else {
                panic!("annuity fields resolve");
            };
            assert_eq!(candidates.len(), 2);
            assert_eq!(candidates[1].key, "pbgc_annuity_rates");
        }
    }

    #[test]
    fn toml_profile() {
        let profile = TemplateProfile::from_toml(
            r#"
            name = "custom"

            [[fields]]
            label = "Sponsor"
            source = { from = "metadata", section = "plan", key = "plan_sponsor_name" }

            [[blocks]]
            heading = "Segment Rates"

            [[blocks.fields]]
            label = "First"
            summary = "s1"
            source = { from = "resolve", candidates = [{ key = "pbgc_lump_sum_first_segment" }] }

            [[tables]]
            labels = ["EIN", "Plan Number"]

            [[tables.fields]]
            label = "EIN"
            source = { from = "metadata", section = "plan", key = "ein" }
            "#,
        )
        .unwrap();

        assert_eq!(profile.name, "custom");
        assert_eq!(profile.field_count(), 3);
        assert_eq!(profile.blocks[0].fields[0].summary.as_deref(), Some("s1"));
        assert_eq!(
            profile.tables[0].fields[0].source,
            ValueSource::metadata(Section::Plan, "ein")
        );
    }

    #[test]
    fn toml_round_trip_of_builtin() {
        let builtin = TemplateProfile::plan_summary();
        let text = toml::to_string(&builtin).unwrap();
        assert_eq!(TemplateProfile::from_toml(&text).unwrap(), builtin);
    }

    #[test]
    fn rejects_unusable_profiles() {
        assert!(matches!(
            TemplateProfile::from_toml(r#"name = "empty""#),
            Err(ProfileError::Empty(_))
        ));
        assert!(matches!(
            TemplateProfile::from_toml(
                r#"
                name = "bad"
                [[fields]]
                label = "X"
                source = { from = "resolve", candidates = [] }
                "#
            ),
            Err(ProfileError::Invalid { .. })
        ));
        assert!(matches!(
            TemplateProfile::from_toml("name = 3"),
            Err(ProfileError::Toml(_))
        ));
    }
}
