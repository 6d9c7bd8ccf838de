//! Provenance hashing
//!
//! Turns the authoritative record of a run into the manifest's content hash
//! and seals the manifest.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::hash::{ContentHash, HashError};
use crate::manifest::{Manifest, ModuleInfo};

/// Produces manifests for one module
#[derive(Debug, Clone)]
pub struct ProvenanceHasher {
    module: ModuleInfo,
}

impl ProvenanceHasher {
    /// Create hasher for `module`
    #[inline]
    #[must_use]
    pub fn new(module: ModuleInfo) -> Self {
        Self { module }
    }

    /// Module identity stamped into manifests
    #[inline]
    #[must_use]
    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    /// Digest of the canonical serialization of `record`
    ///
    /// # Errors
    /// Returns error if the record cannot be rendered
    #[inline]
    pub fn content_hash(&self, record: &Value) -> Result<ContentHash, HashError> {
        ContentHash::of_canonical(record)
    }

    /// Build the manifest for a completed run
    ///
    /// `generated_at` of `None` stamps the current time.
    ///
    /// # Errors
    /// Returns error if the record cannot be rendered
    pub fn seal<I, S>(
        &self,
        record: &Value,
        inputs: I,
        generated_at: Option<DateTime<Utc>>,
    ) -> Result<Manifest, HashError>
    where
        I: IntoIterator<Item = (S, ContentHash)>,
        S: Into<String>,
    {
        let mut builder = Manifest::builder(self.module.clone(), self.content_hash(record)?);
        for (name, hash) in inputs {
            builder = builder.input(name, hash);
        }
        if let Some(at) = generated_at {
            builder = builder.generated_at(at);
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seal_uses_canonical_content_hash() {
        let hasher = ProvenanceHasher::new(ModuleInfo::new("0.7.0", "metadata", "0.7.0"));
        let record = json!({"plan": {"plan_name": {"value": "Acme"}}, "meta": {}});

        let manifest = hasher
            .seal(&record, Vec::<(String, ContentHash)>::new(), None)
            .unwrap();

        assert_eq!(manifest.module_id(), "metadata");
        assert_eq!(
            manifest.content_hash(),
            &ContentHash::of_canonical(&record).unwrap()
        );
        assert!(manifest.input_hashes().is_empty());
    }

    #[test]
    fn reordered_record_seals_to_same_hash() {
        let hasher = ProvenanceHasher::new(ModuleInfo::new("0.7.0", "plan-summary", "0.7.0"));
        let a: Value = serde_json::from_str(r#"{"meta": {"b": 1, "a": 2}, "plan": {}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"plan": {}, "meta": {"a": 2, "b": 1}}"#).unwrap();

        assert_eq!(
            hasher.content_hash(&a).unwrap(),
            hasher.content_hash(&b).unwrap()
        );
    }
}
