//! Error types for CWB Core
//!
//! Provides error handling for:
//! - Undecodable metadata / answer inputs
//! - Invalid template profiles
//! - Schema validation failures (issues kept verbatim)
//! - Fatal stages of a fill run (archive, parse, hashing)
//!
//! A label or value that cannot be found is not an error here: it is a
//! failed [`crate::engine::InjectionOutcome`] and the run continues.

use std::fmt;

use cwb_artifact::{CanonicalError, HashError};
use cwb_docx::{DocxError, TreeError};

use crate::validation::{SchemaError, ValidationIssue};

/// Input record could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// JSON syntax error
    #[error("invalid JSON in {kind} record: {source}")]
    Json {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// YAML syntax error
    #[error("invalid YAML in {kind} record: {source}")]
    Yaml {
        kind: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    /// Top level is not a mapping
    #[error("{kind} record must be a mapping at the top level")]
    NotAnObject { kind: &'static str },
}

impl RecordError {
    /// Create top-level shape error
    #[inline]
    pub fn not_an_object(kind: &'static str) -> Self {
        Self::NotAnObject { kind }
    }
}

/// Template profile is unusable
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// TOML syntax or shape error
    #[error("invalid profile: {0}")]
    Toml(#[from] toml::de::Error),

    /// Profile has nothing to fill
    #[error("profile '{0}' has no fields")]
    Empty(String),

    /// A field or block is malformed
    #[error("profile '{profile}': {message}")]
    Invalid { profile: String, message: String },
}

impl ProfileError {
    /// Create invalid-entry error
    pub fn invalid(profile: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            profile: profile.into(),
            message: message.into(),
        }
    }
}

/// Metadata failed schema validation
///
/// Carries every issue as reported; nothing is merged or summarized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailed {
    issues: Vec<ValidationIssue>,
}

impl ValidationFailed {
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Issues in validator order
    #[inline]
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    #[must_use]
    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

impl fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "metadata failed validation ({} issue(s))", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailed {}

/// Fatal workbench failure
#[derive(Debug, thiserror::Error)]
pub enum WorkbenchError {
    /// Archive, parse or serialize stage failed
    #[error("document error: {0}")]
    Document(#[from] DocxError),

    /// Input record could not be decoded
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// Profile is unusable
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Metadata is invalid; hashing and manifests are blocked
    #[error("{0}")]
    Validation(#[from] ValidationFailed),

    /// Validation schema could not be compiled
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Provenance hashing failed
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// Canonical rendering failed
    #[error("canonical form error: {0}")]
    Canonical(#[from] CanonicalError),

    /// Background hashing task did not complete
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<TreeError> for WorkbenchError {
    fn from(err: TreeError) -> Self {
        Self::Document(DocxError::Tree(err))
    }
}

impl WorkbenchError {
    /// True if the run stopped because the metadata is invalid
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for workbench operations
pub type WorkbenchResult<T> = Result<T, WorkbenchError>;
