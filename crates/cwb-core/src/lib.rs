//! CWB Core - case workbench fill pipeline
//!
//! Fills labelled cells of a plan summary template from an authoritative
//! metadata record and an answer record, and seals a provenance manifest
//! for every run:
//! - Decodes metadata and answer records (JSON or YAML)
//! - Resolves field values by precedence
//! - Locates and fills cells by their visible labels
//! - Gates hashing and manifests on metadata validation
//!
//! # Example
//!
//! ```rust,ignore
//! use cwb_core::{FillConfig, RecordFormat, Workbench};
//!
//! # fn example(template: &[u8], answers: &[u8], metadata: &serde_json::Value)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let workbench = Workbench::with_builtin_schema(FillConfig::new())?;
//! let report = workbench.fill(template, answers, RecordFormat::Json, metadata)?;
//!
//! for line in report.log.lines() {
//!     println!("{line}");
//! }
//! println!("content hash {}", report.manifest.content_hash());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod engine;
pub mod error;
pub mod profile;
pub mod records;
pub mod resolver;
pub mod validation;
pub mod workbench;

// Re-exports for convenience
pub use config::{
    manifest_file_name, FillConfig, ANSWERS_INPUT, FILLED_ARCHIVE_NAME, METADATA_MODULE,
    MODULE_VERSION, PLAN_SUMMARY_MODULE, TEMPLATE_INPUT,
};
pub use engine::{
    append_value, set_value, set_value_right_of_label, FailureKind, InjectionEngine,
    InjectionLog, InjectionOutcome, LogEntry, SummaryItem,
};
pub use error::{
    ProfileError, RecordError, ValidationFailed, WorkbenchError, WorkbenchResult,
};
pub use profile::{BlockSpec, FieldSpec, LabelTableSpec, TemplateProfile, ValueSource};
pub use records::{
    AnswerItem, AnswerRecord, Citation, FieldSet, FieldSlot, FieldValue, OtherAttribute,
    PlanMetadata, RecordFormat, Section, SCHEMA_VERSION, UNKNOWN,
};
pub use resolver::{Candidate, ResolvedFrom, Resolver};
pub use validation::{
    builtin_schema, JsonSchemaValidator, MetadataValidator, SchemaError, ValidationIssue,
};
pub use workbench::{FillReport, Workbench};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with CWB Core
    pub use crate::{
        AnswerRecord, FillConfig, FillReport, InjectionLog, InjectionOutcome, MetadataValidator,
        PlanMetadata, RecordFormat, TemplateProfile, Workbench, WorkbenchError, WorkbenchResult,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
