//! Fill run configuration

use serde::{Deserialize, Serialize};

use cwb_artifact::ModuleInfo;
use cwb_docx::DOCUMENT_PART;

use crate::profile::TemplateProfile;

/// Module id stamped on plan summary manifests
pub const PLAN_SUMMARY_MODULE: &str = "plan-summary";

/// Module id stamped on metadata manifests
pub const METADATA_MODULE: &str = "metadata";

/// Version of the fill module recorded in manifests
pub const MODULE_VERSION: &str = "0.7.0";

/// Default manifest input name of the template archive
pub const TEMPLATE_INPUT: &str = "template";

/// Default manifest input name of the answer record
pub const ANSWERS_INPUT: &str = "answers";

/// Default file name of the filled archive
pub const FILLED_ARCHIVE_NAME: &str = "PlanSummary.FILLED.docx";

/// File name of a manifest for `module_id`
#[must_use]
pub fn manifest_file_name(module_id: &str) -> String {
    format!("manifest.{module_id}.json")
}

/// Configuration for fill runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Archive entry holding the document body
    pub document_part: String,
    /// Application version recorded in manifests
    pub app_version: String,
    /// Module id recorded in fill manifests
    pub module_id: String,
    /// Module version recorded in manifests
    pub module_version: String,
    /// Text placed before appended values
    pub append_separator: String,
    /// Worklist
    pub profile: TemplateProfile,
    /// Name the template digest is recorded under in `input_hashes`
    pub template_input: String,
    /// Name the answer record digest is recorded under in `input_hashes`
    pub answers_input: String,
}

impl FillConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With document part
    #[inline]
    #[must_use]
    pub fn with_document_part(mut self, part: impl Into<String>) -> Self {
        self.document_part = part.into();
        self
    }

    /// With app version
    #[inline]
    #[must_use]
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    /// With module id
    #[inline]
    #[must_use]
    pub fn with_module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = module_id.into();
        self
    }

    /// With append separator
    #[inline]
    #[must_use]
    pub fn with_append_separator(mut self, separator: impl Into<String>) -> Self {
        self.append_separator = separator.into();
        self
    }

    /// With profile
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: TemplateProfile) -> Self {
        self.profile = profile;
        self
    }

    /// With the manifest input names, usually the file names read
    #[inline]
    #[must_use]
    pub fn with_input_names(mut self, template: impl Into<String>, answers: impl Into<String>) -> Self {
        self.template_input = template.into();
        self.answers_input = answers.into();
        self
    }

    /// Module identity for fill manifests
    #[must_use]
    pub fn fill_module(&self) -> ModuleInfo {
        ModuleInfo::new(&self.app_version, &self.module_id, &self.module_version)
    }

    /// Module identity for metadata manifests
    #[must_use]
    pub fn metadata_module(&self) -> ModuleInfo {
        ModuleInfo::new(&self.app_version, METADATA_MODULE, &self.module_version)
    }
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            document_part: DOCUMENT_PART.to_string(),
            app_version: crate::VERSION.to_string(),
            module_id: PLAN_SUMMARY_MODULE.to_string(),
            module_version: MODULE_VERSION.to_string(),
            append_separator: " ".to_string(),
            profile: TemplateProfile::plan_summary(),
            template_input: TEMPLATE_INPUT.to_string(),
            answers_input: ANSWERS_INPUT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FillConfig::new();
        assert_eq!(config.document_part, "word/document.xml");
        assert_eq!(config.module_id, "plan-summary");
        assert_eq!(config.append_separator, " ");
        assert_eq!(config.profile.name, "plan-summary");
        assert_eq!(config.template_input, "template");
        assert_eq!(config.answers_input, "answers");
    }

    #[test]
    fn builders() {
        let config = FillConfig::new()
            .with_app_version("1.2.3")
            .with_module_id("custom")
            .with_append_separator("; ")
            .with_input_names("PlanSummary.docx", "answers.yaml");
        let module = config.fill_module();
        assert_eq!(module.app_version, "1.2.3");
        assert_eq!(module.module_id, "custom");
        assert_eq!(config.metadata_module().module_id, "metadata");
        assert_eq!(config.template_input, "PlanSummary.docx");
        assert_eq!(config.answers_input, "answers.yaml");
    }

    #[test]
    fn output_names() {
        assert_eq!(FILLED_ARCHIVE_NAME, "PlanSummary.FILLED.docx");
        assert_eq!(manifest_file_name(PLAN_SUMMARY_MODULE), "manifest.plan-summary.json");
    }
}
