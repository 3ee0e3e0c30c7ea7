//! Batch consolidation: many XML documents into one table.

use chrono::Local;
use tracing::{error, info};

use crate::diag::Diagnostic;
use crate::error::Result;
use crate::fields::{FieldExtractor, FieldMapping};
use crate::table::{Cell, Table};
use crate::tree::parse_document;

/// Provenance column holding each record's source filename.
pub const SOURCE_FILE_COLUMN: &str = "_arquivo_origem";
/// Provenance column holding the batch processing timestamp.
pub const PROCESSED_AT_COLUMN: &str = "_data_processamento";

/// Result of consolidating one batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Consolidated table: mapping columns plus provenance, row order =
    /// input order. Empty (zero rows, full column set) when nothing parsed.
    pub table: Table,
    /// Per-document and per-batch notices, in processing order.
    pub diagnostics: Vec<Diagnostic>,
    /// Documents that yielded a record.
    pub processed: usize,
    /// Documents skipped over a parse failure.
    pub skipped: usize,
}

/// Runs the field extractor over many documents and merges the records.
///
/// One bad document never aborts the batch: it is logged, reported in the
/// outcome diagnostics, and skipped.
pub struct Consolidator {
    extractor: FieldExtractor,
    report_missing_fields: bool,
}

impl Consolidator {
    /// Build a consolidator over a custom mapping.
    pub fn new(mapping: FieldMapping) -> Result<Self> {
        mapping.validate()?;
        Ok(Self {
            extractor: FieldExtractor::new(mapping),
            report_missing_fields: false,
        })
    }

    /// Consolidator over the standard NFe mapping.
    pub fn nfe() -> Self {
        Self {
            extractor: FieldExtractor::new(FieldMapping::nfe_default()),
            report_missing_fields: false,
        }
    }

    /// Also emit an info diagnostic per document listing fields no path or
    /// fallback could resolve.
    pub fn with_missing_field_reports(mut self, report: bool) -> Self {
        self.report_missing_fields = report;
        self
    }

    pub fn mapping(&self) -> &FieldMapping {
        self.extractor.mapping()
    }

    /// Column set of any table this consolidator produces, in fixed order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.mapping().field_names();
        columns.push(SOURCE_FILE_COLUMN.to_string());
        columns.push(PROCESSED_AT_COLUMN.to_string());
        columns
    }

    /// Process `documents` in order into one consolidated table.
    ///
    /// Bytes are decoded as UTF-8 with invalid sequences replaced, never
    /// fatally. Zero successful documents is an ordinary outcome: the table
    /// is empty but still carries the full column set.
    pub fn consolidate<I>(&self, documents: I) -> BatchOutcome
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut table = Table::new(self.columns());
        let mut diagnostics = Vec::new();
        let mut skipped = 0usize;

        // One wall-clock stamp for the whole batch.
        let processed_at = Local::now().naive_local();

        for (filename, content) in documents {
            let text = String::from_utf8_lossy(&content);
            let tree = match parse_document(&text) {
                Ok(tree) => tree,
                Err(err) => {
                    error!(file = %filename, %err, "skipping document");
                    diagnostics.push(
                        Diagnostic::error(err.to_string()).with_context(filename),
                    );
                    skipped += 1;
                    continue;
                }
            };

            let outcome = self.extractor.extract(&tree);
            if self.report_missing_fields && !outcome.missing.is_empty() {
                diagnostics.push(
                    Diagnostic::info(format!("unresolved fields: {}", outcome.missing.join(", ")))
                        .with_context(filename.clone()),
                );
            }

            let mut row = outcome.values;
            row.push(Cell::Text(filename));
            row.push(Cell::DateTime(processed_at));
            table.push_row(row);
        }

        let processed = table.num_rows();
        info!(
            rows = processed,
            columns = table.num_columns(),
            skipped,
            "batch consolidated"
        );
        diagnostics.push(Diagnostic::info(format!(
            "consolidated {processed} records ({skipped} skipped) across {} columns",
            table.num_columns()
        )));

        BatchOutcome {
            table,
            diagnostics,
            processed,
            skipped,
        }
    }
}
