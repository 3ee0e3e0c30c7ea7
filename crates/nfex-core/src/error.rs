//! Error types for the nfex-core library.
//!
//! Errors here cover configuration and document parsing. Everything else in
//! the pipeline degrades instead of failing: coercion misses fall back to
//! defaults, transform problems return the input table, and per-document
//! failures become diagnostics on the batch outcome.

use thiserror::Error;

/// Main error type for the nfex library.
#[derive(Error, Debug)]
pub enum NfexError {
    /// Document tree / XML error.
    #[error("document error: {0}")]
    Tree(#[from] TreeError),

    /// Field mapping / extraction configuration error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Errors raised while turning raw text into a document tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The XML is not well formed.
    #[error("malformed XML: {0}")]
    Malformed(String),

    /// The document parsed but holds no element at all.
    #[error("document has no root element")]
    Empty,
}

/// Errors related to field extraction configuration.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The field mapping holds no entries.
    #[error("field mapping is empty")]
    EmptyMapping,

    /// A mapping entry is unusable (no candidate paths and no fallback).
    #[error("invalid mapping entry for {field}: {reason}")]
    InvalidEntry { field: String, reason: String },
}

/// Result type for the nfex library.
pub type Result<T> = std::result::Result<T, NfexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_errors_wrap_into_nfex_error() {
        let err: NfexError = TreeError::Empty.into();
        assert_eq!(err.to_string(), "document error: document has no root element");

        let err: NfexError = ExtractionError::EmptyMapping.into();
        assert_eq!(err.to_string(), "extraction error: field mapping is empty");
    }
}
