//! Metadata validation seam
//!
//! The workbench only needs a pass/fail answer plus the issue list; the
//! [`MetadataValidator`] trait keeps the schema engine swappable. The
//! default implementation checks against a JSON Schema (draft 7), either
//! the built-in plan metadata schema or one supplied by the caller.

use std::fmt;

use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BUILTIN_SCHEMA_TEXT: &str = include_str!("../schema/plan_metadata.schema.json");

static BUILTIN_SCHEMA: Lazy<Result<Value, String>> =
    Lazy::new(|| serde_json::from_str(BUILTIN_SCHEMA_TEXT).map_err(|e| e.to_string()));

/// One validation failure, as reported by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// JSON pointer into the instance (`/` for the root)
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Schema could not be loaded or compiled
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid schema: {0}")]
pub struct SchemaError(String);

/// Checks an authoritative metadata record
#[cfg_attr(test, mockall::automock)]
pub trait MetadataValidator: Send + Sync {
    /// `Ok` if the record is valid, otherwise every issue found
    ///
    /// # Errors
    /// The issue list when the record is invalid
    fn validate(&self, metadata: &Value) -> Result<(), Vec<ValidationIssue>>;
}

/// Built-in plan metadata schema document
///
/// # Errors
/// `SchemaError` if the bundled schema does not parse
pub fn builtin_schema() -> Result<&'static Value, SchemaError> {
    BUILTIN_SCHEMA
        .as_ref()
        .map_err(|message| SchemaError(message.clone()))
}

/// JSON Schema backed validator
pub struct JsonSchemaValidator {
    compiled: JSONSchema,
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator").finish_non_exhaustive()
    }
}

impl JsonSchemaValidator {
    /// Compile `schema`
    ///
    /// # Errors
    /// `SchemaError` if the schema itself is invalid
    pub fn new(schema: &Value) -> Result<Self, SchemaError> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| SchemaError(format!("{} at {}", e, pointer(&e.instance_path.to_string()))))?;
        Ok(Self { compiled })
    }

    /// Validator over the built-in plan metadata schema
    ///
    /// # Errors
    /// `SchemaError` if the bundled schema cannot be compiled
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::new(builtin_schema()?)
    }
}

fn pointer(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

impl MetadataValidator for JsonSchemaValidator {
    fn validate(&self, metadata: &Value) -> Result<(), Vec<ValidationIssue>> {
        self.compiled.validate(metadata).map_err(|errors| {
            errors
                .map(|e| ValidationIssue::new(pointer(&e.instance_path.to_string()), e.to_string()))
                .collect()
        })
    }
}
