//! Core library for NFe XML batch extraction.
//!
//! This crate provides:
//! - a generic document tree with dotted-path and keyword lookup
//! - value coercers for Brazilian currency, dates, and tax ids
//! - declarative field mapping with per-field fallback rules
//! - batch consolidation of many documents into one typed table
//! - tabular transforms (filters, dedup, missing-value fill)

pub mod batch;
pub mod diag;
pub mod error;
pub mod fields;
pub mod table;
pub mod tree;

pub use batch::{BatchOutcome, Consolidator, PROCESSED_AT_COLUMN, SOURCE_FILE_COLUMN};
pub use diag::{Diagnostic, Severity};
pub use error::{ExtractionError, NfexError, Result, TreeError};
pub use fields::{
    ExtractionOutcome, FallbackRule, FieldExtractor, FieldKind, FieldMapping, FieldSpec,
};
pub use table::{Cell, FillStrategy, Table};
pub use tree::{Node, parse_document};
