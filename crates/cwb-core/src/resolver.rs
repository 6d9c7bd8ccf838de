//! Value resolution
//!
//! Picks the value for a named field out of the authoritative metadata and
//! the answer record. Precedence, first usable value wins:
//!
//! 1. `plan.<key>` on the metadata, unless blank or `"unknown"`
//! 2. `dependent_fields.<key>` on the metadata
//! 3. `dependent_fields.<key>` on the answer record
//! 4. top-level `<key>` on the answer record
//! 5. answer items: an exact identifier match returns its answer as-is
//!    (even blank); otherwise the first item whose label or identifier
//!    contains a keyword and whose answer is not blank
//!
//! An empty string means "not supplied".

use serde::{Deserialize, Serialize};

use crate::records::{AnswerRecord, PlanMetadata};

/// One key to resolve, with its keyword fallbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub key: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Candidate {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            keywords: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Which precedence step produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFrom {
    Authoritative,
    MetadataOverride,
    AnswerOverride,
    AnswerField,
    ItemIdentifier,
    ItemKeyword,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolves field values against one metadata / answer pair
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    metadata: &'a PlanMetadata,
    answers: &'a AnswerRecord,
}

impl<'a> Resolver<'a> {
    #[inline]
    #[must_use]
    pub fn new(metadata: &'a PlanMetadata, answers: &'a AnswerRecord) -> Self {
        Self { metadata, answers }
    }

    /// Authoritative record
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &'a PlanMetadata {
        self.metadata
    }

    /// Value for `key`, or an empty string
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, key: &str, keywords: &[S]) -> String {
        match self.lookup(key, keywords) {
            Some((value, from)) => {
                tracing::trace!(key, ?from, "resolved field");
                value.to_string()
            }
            None => {
                tracing::trace!(key, "field not supplied");
                String::new()
            }
        }
    }

    /// First non-empty resolution across `candidates`, in order
    #[must_use]
    pub fn resolve_first(&self, candidates: &[Candidate]) -> String {
        candidates
            .iter()
            .map(|candidate| self.resolve(&candidate.key, &candidate.keywords))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }

    /// Value and the step that produced it
    #[must_use]
    pub fn lookup<S: AsRef<str>>(&self, key: &str, keywords: &[S]) -> Option<(&'a str, ResolvedFrom)> {
        if let Some(value) = self.metadata.plan.slot(key).usable() {
            return Some((value, ResolvedFrom::Authoritative));
        }
        if let Some(value) = present(self.metadata.dependent_fields.get(key).map(String::as_str)) {
            return Some((value, ResolvedFrom::MetadataOverride));
        }
        if let Some(value) = present(self.answers.dependent_field(key)) {
            return Some((value, ResolvedFrom::AnswerOverride));
        }
        if let Some(value) = present(self.answers.field(key)) {
            return Some((value, ResolvedFrom::AnswerField));
        }
        self.scan_items(key, keywords)
    }

    fn scan_items<S: AsRef<str>>(&self, key: &str, keywords: &[S]) -> Option<(&'a str, ResolvedFrom)> {
        let key = key.to_lowercase();
        let keywords: Vec<String> = keywords.iter().map(|k| k.as_ref().to_lowercase()).collect();

        for item in self.answers.items() {
            let identifier = item.identifier.to_lowercase();
            if identifier == key {
                return (!item.answer.is_empty())
                    .then_some((item.answer.as_str(), ResolvedFrom::ItemIdentifier));
            }
            let label = item.label.to_lowercase();
            let matches = keywords
                .iter()
                .any(|k| label.contains(k.as_str()) || identifier.contains(k.as_str()));
            if matches && !item.answer.trim().is_empty() {
                return Some((item.answer.as_str(), ResolvedFrom::ItemKeyword));
            }
        }
        None
    }
}
