//! CWB Document Layer
//!
//! The boundary between template packages (zip bytes) and the in-memory
//! document tree the injection engine mutates.
//!
//! # Core Operations
//!
//! - **Open**: extract one XML part from a package ([`open_part`])
//! - **Parse**: build a namespace-aware [`DocumentTree`]
//! - **Locate**: find tables and cells by visible label text ([`Locator`])
//! - **Repack**: serialize the tree and replace the part ([`replace_part`])
//!
//! # Architecture
//!
//! ```text
//! package bytes → open_part → DocumentTree::parse → Locator (read-only)
//!                                      ↓
//!                               mutate via Wml builders
//!                                      ↓
//! package bytes ← replace_part ← DocumentTree::serialize
//! ```
//!
//! Failures before mutation (`FileFormatError`, `ParseError`) are fatal.
//! Lookup misses are data: [`LocatorResult::NotFound`] carries the reason.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod archive;
pub mod error;
pub mod locator;
pub mod tree;
pub mod wml;

// Re-exports for convenience
pub use archive::{list_parts, open_part, read_tree, replace_part, write_tree, DOCUMENT_PART};
pub use error::{DocxError, DocxResult, FileFormatError, ParseError, SerializeError, TreeError};
pub use locator::{normalize, normalize_label, Locator, LocatorResult};
pub use tree::{DocumentTree, NodeId, NodeKind, QName};
pub use wml::{visible_text, Wml, W_NS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with document packages
    pub use crate::archive::{read_tree, write_tree, DOCUMENT_PART};
    pub use crate::error::{DocxError, DocxResult};
    pub use crate::locator::{Locator, LocatorResult};
    pub use crate::tree::{DocumentTree, NodeId};
    pub use crate::wml::Wml;
}
