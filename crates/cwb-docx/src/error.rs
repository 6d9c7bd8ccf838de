//! Error types for the document boundary
//!
//! Provides error handling for:
//! - Archive operations (package bytes → part text, part text → package bytes)
//! - XML parsing (part text → tree)
//! - XML serialization (tree → part text)
//!
//! All of these are fatal for a fill run: they occur before any mutation
//! and leave the caller's archive bytes untouched. Locator misses are not
//! errors; see [`crate::locator::LocatorResult`].

use crate::tree::NodeId;

/// Errors reading or rewriting the zip container
#[derive(Debug, thiserror::Error)]
pub enum FileFormatError {
    /// Requested part is not an entry of the archive
    #[error("part not found in archive: '{0}'")]
    MissingPart(String),

    /// Archive cannot be read or decompressed
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// Part exists but is not UTF-8 text
    #[error("part '{part}' is not valid UTF-8")]
    NotText {
        /// Part path inside the archive
        part: String,
    },

    /// IO error while moving bytes between buffers
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FileFormatError {
    /// Create missing-part error
    pub fn missing_part(part: impl Into<String>) -> Self {
        Self::MissingPart(part.into())
    }

    /// Create corrupt-archive error
    pub fn corrupt(message: impl std::fmt::Display) -> Self {
        Self::CorruptArchive(message.to_string())
    }
}

/// Errors parsing an XML part
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Tokenizer rejected the input
    #[error("malformed xml at byte {position}: {message}")]
    Malformed {
        /// Byte offset into the part
        position: u64,
        /// Tokenizer message
        message: String,
    },

    /// Closing tag does not match the open element
    #[error("unbalanced tag: expected </{expected}>, found </{found}>")]
    UnbalancedTag {
        /// Name of the open element
        expected: String,
        /// Name in the closing tag
        found: String,
    },

    /// Input ended with open elements
    #[error("unexpected end of document: <{0}> is not closed")]
    UnexpectedEof(String),

    /// Document has no root element
    #[error("document has no root element")]
    NoRootElement,

    /// A second top-level element was found
    #[error("document has more than one root element: <{0}>")]
    MultipleRoots(String),
}

impl ParseError {
    /// Create tokenizer error at position
    pub fn malformed(position: u64, message: impl std::fmt::Display) -> Self {
        Self::Malformed {
            position,
            message: message.to_string(),
        }
    }
}

/// Errors serializing a tree back to text
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// Writer failed
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Output is not UTF-8
    #[error("serialized part is not valid UTF-8")]
    Encoding,
}

/// Errors from structural tree mutation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Operation needs an element node
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Id was not issued by this tree
    #[error("node {0} does not belong to this tree")]
    UnknownNode(NodeId),

    /// Child already has a parent
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),

    /// Appending would make a node its own ancestor
    #[error("node {0} cannot be appended beneath itself")]
    Cycle(NodeId),
}

/// Combined document boundary error
#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error("file format error: {0}")]
    FileFormat(#[from] FileFormatError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("serialize error: {0}")]
    Serialize(#[from] SerializeError),

    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Result type alias for document boundary operations
pub type DocxResult<T> = Result<T, DocxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_part_display() {
        let err = FileFormatError::missing_part("word/document.xml");
        assert_eq!(err.to_string(), "part not found in archive: 'word/document.xml'");
    }

    #[test]
    fn unbalanced_tag_display() {
        let err = ParseError::UnbalancedTag {
            expected: "w:p".to_string(),
            found: "w:tc".to_string(),
        };
        assert!(err.to_string().contains("expected </w:p>"));
    }

    #[test]
    fn error_conversions() {
        let err: DocxError = FileFormatError::corrupt("bad header").into();
        assert!(matches!(err, DocxError::FileFormat(FileFormatError::CorruptArchive(_))));

        let err: DocxError = ParseError::NoRootElement.into();
        assert!(matches!(err, DocxError::Parse(_)));
    }
}
