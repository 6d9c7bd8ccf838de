//! Injection engine
//!
//! Runs a [`TemplateProfile`] worklist against a parsed document in two
//! phases:
//!
//! 1. **Locate** (read-only): resolve every value and find every target
//!    cell, caching one table per rates block.
//! 2. **Apply**: mutate the located cells in worklist order.
//!
//! Every worklist entry produces exactly one [`InjectionOutcome`]. A missing
//! label or value never aborts the run; it is recorded with a
//! [`FailureKind`] and the next entry proceeds.
//!
//! Mutation policies:
//! - [`append_value`]: keeps existing cell content, appends after it, and
//!   does nothing when the value is already present
//! - [`set_value`]: clears the cell and writes the value as its only content

use std::fmt;

use serde::{Deserialize, Serialize};

use cwb_docx::wml::{Wml, PARAGRAPH};
use cwb_docx::{visible_text, DocumentTree, Locator, LocatorResult, NodeId, TreeError};

use crate::profile::{FieldSpec, TemplateProfile};
use crate::resolver::Resolver;

/// Why a field was not filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Template problem: table or label not found
    LocatorNotFound,
    /// Data problem: nothing to write
    ValueUnresolved,
}

/// Result of one attempted field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionOutcome {
    pub ok: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl InjectionOutcome {
    /// Successful outcome
    #[must_use]
    pub fn applied(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            reason: reason.into(),
            failure: None,
        }
    }

    /// Failed outcome
    #[must_use]
    pub fn failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
            failure: Some(kind),
        }
    }

    fn not_found(reason: impl Into<String>) -> Self {
        Self::failed(FailureKind::LocatorNotFound, reason)
    }
}

impl fmt::Display for InjectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{{\"ok\":{},\"reason\":{:?}}}", self.ok, self.reason),
        }
    }
}

/// Value availability for one tagged field of a rates block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub tag: String,
    pub supplied: bool,
}

/// One line of the run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    /// A rates block's table could not be located
    TableMissing { heading: String },
    /// Which tagged values of a located rates block were supplied
    BlockSummary {
        heading: String,
        items: Vec<SummaryItem>,
    },
    /// Outcome for one field
    Field {
        label: String,
        outcome: InjectionOutcome,
    },
}

impl LogEntry {
    fn field(label: &str, outcome: InjectionOutcome) -> Self {
        Self::Field {
            label: label.to_string(),
            outcome,
        }
    }

    /// Human-readable line; field entries print as their outcome's JSON
    #[must_use]
    pub fn line(&self) -> String {
        match self {
            Self::TableMissing { heading } => {
                format!("ERROR: Could not locate {heading} block table.")
            }
            Self::BlockSummary { heading, items } => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| {
                        format!("{}={}", item.tag, if item.supplied { "OK" } else { "MISSING" })
                    })
                    .collect();
                format!("{heading}: {}", parts.join(", "))
            }
            Self::Field { outcome, .. } => outcome.to_string(),
        }
    }
}

/// Ordered record of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InjectionLog {
    entries: Vec<LogEntry>,
}

impl InjectionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Printable lines, in order
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(LogEntry::line).collect()
    }

    /// Field outcomes with their labels, in order
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &InjectionOutcome)> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Field { label, outcome } => Some((label.as_str(), outcome)),
            _ => None,
        })
    }

    /// Number of failed field outcomes of `kind`
    #[must_use]
    pub fn failures(&self, kind: FailureKind) -> usize {
        self.outcomes()
            .filter(|(_, outcome)| outcome.failure == Some(kind))
            .count()
    }

    /// True if every field was filled and every table found
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(|entry| match entry {
            LogEntry::TableMissing { .. } => false,
            LogEntry::BlockSummary { .. } => true,
            LogEntry::Field { outcome, .. } => outcome.ok,
        })
    }
}

impl fmt::Display for InjectionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Append `value` to the cell's first paragraph, preceded by `separator`
///
/// Embedded newlines become line breaks. No-op success when the cell's
/// visible text already contains `value`.
///
/// # Errors
/// Propagates tree mutation errors
pub fn append_value(
    tree: &mut DocumentTree,
    wml: &Wml,
    cell: NodeId,
    value: &str,
    separator: &str,
) -> Result<InjectionOutcome, TreeError> {
    if value.is_empty() {
        return Ok(InjectionOutcome::failed(FailureKind::ValueUnresolved, "value missing"));
    }
    if visible_text(tree, cell).contains(value) {
        return Ok(InjectionOutcome::applied("already present"));
    }

    let paragraph = match wml.descendants(tree, cell, PARAGRAPH).first() {
        Some(&paragraph) => paragraph,
        None => {
            let paragraph = wml.paragraph(tree);
            tree.append_child(cell, paragraph)?;
            paragraph
        }
    };
    wml.append_lines(tree, paragraph, &format!("{separator}{value}"))?;
    Ok(InjectionOutcome::applied("appended"))
}

/// Replace all content of `cell` with one paragraph holding `value`
///
/// # Errors
/// Propagates tree mutation errors
pub fn set_value(
    tree: &mut DocumentTree,
    wml: &Wml,
    cell: NodeId,
    value: &str,
) -> Result<(), TreeError> {
    tree.remove_children(cell)?;
    let paragraph = wml.paragraph(tree);
    let run = wml.text_run(tree, value)?;
    tree.append_child(paragraph, run)?;
    tree.append_child(cell, paragraph)
}

/// Replace the cell right of `label` in `table` with `value`
///
/// # Errors
/// Propagates tree mutation errors
pub fn set_value_right_of_label(
    tree: &mut DocumentTree,
    wml: &Wml,
    table: NodeId,
    label: &str,
    value: &str,
) -> Result<InjectionOutcome, TreeError> {
    let target = Locator::new(tree).find_cell_right_of_label(table, label);
    let outcome = match target {
        LocatorResult::NotFound(reason) => InjectionOutcome::not_found(reason),
        LocatorResult::Found(_) if value.is_empty() => InjectionOutcome::failed(
            FailureKind::ValueUnresolved,
            format!("value missing for '{label}'"),
        ),
        LocatorResult::Found(cell) => {
            set_value(tree, wml, cell, value)?;
            InjectionOutcome::applied(format!("set right-cell for '{label}'"))
        }
    };
    Ok(outcome)
}

/// Located work, produced by the read-only phase
#[derive(Debug)]
enum Step {
    Record(LogEntry),
    Append {
        label: String,
        cell: NodeId,
        value: String,
    },
    Set {
        label: String,
        cell: NodeId,
        value: String,
    },
}

impl Step {
    fn is_mutation(&self) -> bool {
        !matches!(self, Self::Record(_))
    }
}

/// Runs a profile worklist against documents
#[derive(Debug, Clone, Copy)]
pub struct InjectionEngine<'a> {
    profile: &'a TemplateProfile,
    separator: &'a str,
}

impl<'a> InjectionEngine<'a> {
    /// Engine for `profile` with a single-space separator
    #[inline]
    #[must_use]
    pub fn new(profile: &'a TemplateProfile) -> Self {
        Self {
            profile,
            separator: " ",
        }
    }

    /// With append separator
    #[inline]
    #[must_use]
    pub fn with_separator(mut self, separator: &'a str) -> Self {
        self.separator = separator;
        self
    }

    /// Fill `tree` in place and return the run log
    ///
    /// # Errors
    /// `TreeError` only if the tree rejects a structural mutation; label and
    /// value misses are recorded in the log instead
    pub fn run(&self, tree: &mut DocumentTree, resolver: &Resolver<'_>) -> Result<InjectionLog, TreeError> {
        let steps = self.locate(tree, resolver);
        let mutations = steps.iter().filter(|step| step.is_mutation()).count();
        tracing::debug!(steps = steps.len(), mutations, "located targets");

        let wml = if mutations > 0 { Some(Wml::bind(tree)?) } else { None };
        let mut log = InjectionLog::new();

        for step in steps {
            let entry = match (step, &wml) {
                (Step::Record(entry), _) => entry,
                (Step::Append { label, cell, value }, Some(wml)) => {
                    let outcome = append_value(tree, wml, cell, &value, self.separator)?;
                    LogEntry::field(&label, outcome)
                }
                (Step::Set { label, cell, value }, Some(wml)) => {
                    set_value(tree, wml, cell, &value)?;
                    let outcome = InjectionOutcome::applied(format!("set right-cell for '{label}'"));
                    LogEntry::field(&label, outcome)
                }
                (Step::Append { label, .. } | Step::Set { label, .. }, None) => {
                    LogEntry::field(&label, InjectionOutcome::not_found("document namespace unavailable"))
                }
            };
            if let LogEntry::Field { label, outcome } = &entry {
                tracing::debug!(label = %label, ok = outcome.ok, reason = %outcome.reason, "field");
            }
            log.push(entry);
        }
        Ok(log)
    }

    fn locate(&self, tree: &DocumentTree, resolver: &Resolver<'_>) -> Vec<Step> {
        let locator = Locator::new(tree);
        let mut steps = Vec::with_capacity(self.profile.field_count() + 2 * self.profile.blocks.len());

        for field in &self.profile.fields {
            let value = field.source.value(resolver);
            steps.push(match locator.find_cell_by_label_anywhere(&field.label) {
                LocatorResult::NotFound(reason) => {
                    Step::Record(LogEntry::field(&field.label, InjectionOutcome::not_found(reason)))
                }
                LocatorResult::Found(cell) => append_step(field, cell, value),
            });
        }

        let tables: Vec<LocatorResult> = self
            .profile
            .blocks
            .iter()
            .map(|block| locator.find_rates_block_table(&block.heading))
            .collect();
        for (block, table) in self.profile.blocks.iter().zip(&tables) {
            if !table.is_found() {
                steps.push(Step::Record(LogEntry::TableMissing {
                    heading: block.heading.clone(),
                }));
            }
        }

        for (block, table) in self.profile.blocks.iter().zip(tables) {
            let values: Vec<String> = block.fields.iter().map(|f| f.source.value(resolver)).collect();
            match table {
                LocatorResult::Found(table) => {
                    let items: Vec<SummaryItem> = block
                        .fields
                        .iter()
                        .zip(&values)
                        .filter_map(|(field, value)| {
                            field.summary.as_ref().map(|tag| SummaryItem {
                                tag: tag.clone(),
                                supplied: !value.is_empty(),
                            })
                        })
                        .collect();
                    if !items.is_empty() {
                        steps.push(Step::Record(LogEntry::BlockSummary {
                            heading: block.heading.clone(),
                            items,
                        }));
                    }
                    for (field, value) in block.fields.iter().zip(values) {
                        steps.push(match locator.find_cell_by_label(table, &field.label) {
                            LocatorResult::NotFound(reason) => Step::Record(LogEntry::field(
                                &field.label,
                                InjectionOutcome::not_found(reason),
                            )),
                            LocatorResult::Found(cell) => append_step(field, cell, value),
                        });
                    }
                }
                LocatorResult::NotFound(reason) => {
                    for field in &block.fields {
                        steps.push(Step::Record(LogEntry::field(
                            &field.label,
                            InjectionOutcome::not_found(reason.clone()),
                        )));
                    }
                }
            }
        }

        for spec in &self.profile.tables {
            let labels: Vec<&str> = spec.labels.iter().map(String::as_str).collect();
            let table = locator.find_table_containing_all_labels(&labels);
            for field in &spec.fields {
                let value = field.source.value(resolver);
                let target = match &table {
                    LocatorResult::Found(table) => locator.find_cell_right_of_label(*table, &field.label),
                    LocatorResult::NotFound(reason) => LocatorResult::NotFound(reason.clone()),
                };
                steps.push(match target {
                    LocatorResult::NotFound(reason) => {
                        Step::Record(LogEntry::field(&field.label, InjectionOutcome::not_found(reason)))
                    }
                    LocatorResult::Found(_) if value.is_empty() => Step::Record(LogEntry::field(
                        &field.label,
                        InjectionOutcome::failed(
                            FailureKind::ValueUnresolved,
                            format!("value missing for '{}'", field.label),
                        ),
                    )),
                    LocatorResult::Found(cell) => Step::Set {
                        label: field.label.clone(),
                        cell,
                        value,
                    },
                });
            }
        }

        steps
    }
}

fn append_step(field: &FieldSpec, cell: NodeId, value: String) -> Step {
    if value.is_empty() {
        Step::Record(LogEntry::field(
            &field.label,
            InjectionOutcome::failed(FailureKind::ValueUnresolved, "value missing"),
        ))
    } else {
        Step::Append {
            label: field.label.clone(),
            cell,
            value,
        }
    }
}
