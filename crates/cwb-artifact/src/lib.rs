//! CWB Artifact Primitives
//!
//! Deterministic canonical form, content hashing and provenance manifests
//! for the case workbench.
//!
//! # Core Concepts
//!
//! - [`canonicalize`]: key-order independent form of a structured value
//! - [`ContentHash`]: 32-byte SHA-256 digest, lowercase hex on display
//! - [`ProvenanceHasher`]: hashes the canonical authoritative record
//! - [`Manifest`]: immutable record of one run's inputs and outputs
//!
//! # Example
//!
//! ```rust
//! use cwb_artifact::{canonical_string, ContentHash};
//! use serde_json::json;
//!
//! let a = json!({"b": 1, "a": 2});
//! let text = canonical_string(&a).unwrap();
//! assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
//!
//! let hash = ContentHash::compute(text.as_bytes());
//! assert_eq!(hash.to_hex().len(), 64);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod canonical;
mod hash;
mod manifest;
mod provenance;

pub use canonical::{canonical_string, canonicalize, serialize, to_canonical_value, CanonicalError};
pub use hash::{ContentHash, HashError};
pub use manifest::{Manifest, ManifestBuilder, ModuleInfo};
pub use provenance::ProvenanceHasher;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
