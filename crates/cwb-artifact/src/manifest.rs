//! Provenance manifests
//!
//! A [`Manifest`] records which module produced an output, when, and the
//! digests of everything that went in. It is built once at the end of a run
//! through [`ManifestBuilder`] and is immutable afterwards; a later run
//! produces a new manifest rather than editing this one.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::{canonical_string, to_canonical_value, CanonicalError};
use crate::hash::{ContentHash, HashError};

/// Identity of the producing module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Workbench application version
    pub app_version: String,
    /// Module identifier (e.g. `plan-summary`, `metadata`)
    pub module_id: String,
    /// Module version
    pub module_version: String,
}

impl ModuleInfo {
    /// Create module identity
    #[inline]
    #[must_use]
    pub fn new(
        app_version: impl Into<String>,
        module_id: impl Into<String>,
        module_version: impl Into<String>,
    ) -> Self {
        Self {
            app_version: app_version.into(),
            module_id: module_id.into(),
            module_version: module_version.into(),
        }
    }
}

/// Immutable record of one completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    app_version: String,
    module_id: String,
    module_version: String,
    #[serde(with = "rfc3339_millis")]
    generated_at: DateTime<Utc>,
    content_hash: ContentHash,
    input_hashes: BTreeMap<String, ContentHash>,
}

impl Manifest {
    /// Start building a manifest for `module` over the given content hash
    #[inline]
    #[must_use]
    pub fn builder(module: ModuleInfo, content_hash: ContentHash) -> ManifestBuilder {
        ManifestBuilder {
            module,
            content_hash,
            generated_at: None,
            input_hashes: BTreeMap::new(),
        }
    }

    /// Application version
    #[inline]
    #[must_use]
    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Module identifier
    #[inline]
    #[must_use]
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Module version
    #[inline]
    #[must_use]
    pub fn module_version(&self) -> &str {
        &self.module_version
    }

    /// Creation timestamp
    #[inline]
    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Hash of the canonicalized authoritative record
    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// Input name → digest
    #[inline]
    #[must_use]
    pub fn input_hashes(&self) -> &BTreeMap<String, ContentHash> {
        &self.input_hashes
    }

    /// Canonical structured text for the audit trail
    ///
    /// # Errors
    /// Returns error if the manifest cannot be rendered
    pub fn to_canonical_string(&self) -> Result<String, CanonicalError> {
        let value = to_canonical_value(self)?;
        canonical_string(&value)
    }

    /// Digest of the manifest's own canonical text
    ///
    /// # Errors
    /// Returns error if the manifest cannot be rendered
    pub fn self_hash(&self) -> Result<ContentHash, HashError> {
        Ok(ContentHash::compute(self.to_canonical_string()?.as_bytes()))
    }
}

/// Builder for [`Manifest`]
#[derive(Debug, Clone)]
#[must_use]
pub struct ManifestBuilder {
    module: ModuleInfo,
    content_hash: ContentHash,
    generated_at: Option<DateTime<Utc>>,
    input_hashes: BTreeMap<String, ContentHash>,
}

impl ManifestBuilder {
    /// Record the digest of a named input
    ///
    /// A repeated name replaces the earlier digest.
    pub fn input(mut self, name: impl Into<String>, hash: ContentHash) -> Self {
        self.input_hashes.insert(name.into(), hash);
        self
    }

    /// Pin the creation timestamp (defaults to now)
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Finish the manifest
    #[must_use]
    pub fn build(self) -> Manifest {
        Manifest {
            app_version: self.module.app_version,
            module_id: self.module.module_id,
            module_version: self.module.module_version,
            generated_at: self.generated_at.unwrap_or_else(Utc::now),
            content_hash: self.content_hash,
            input_hashes: self.input_hashes,
        }
    }
}

mod rfc3339_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{} ({}) {} at {}",
            self.module_id,
            self.module_version,
            self.app_version,
            self.content_hash.short(),
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}
