//! Field configuration, value coercion, and per-document extraction.

pub mod coerce;
mod extract;
mod mapping;

pub use coerce::{clean_text, coerce_currency, coerce_datetime, format_currency_brl, format_document};
pub use extract::{ExtractionOutcome, FieldExtractor};
pub use mapping::{FallbackRule, FieldKind, FieldMapping, FieldSpec};

use crate::error::ExtractionError;

impl FieldMapping {
    /// Check that the mapping can drive an extraction: at least one entry,
    /// and every entry with some way to resolve (paths or a fallback).
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.is_empty() {
            return Err(ExtractionError::EmptyMapping);
        }
        for spec in self.fields() {
            if spec.paths.is_empty() && spec.fallback.is_none() {
                return Err(ExtractionError::InvalidEntry {
                    field: spec.name.clone(),
                    reason: "no candidate paths and no fallback rule".into(),
                });
            }
        }
        Ok(())
    }
}
