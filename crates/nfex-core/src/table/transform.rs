//! Row-level transforms over a consolidated table.
//!
//! Every operation is total: a missing column or inapplicable bound never
//! raises — the input table comes back unchanged and the problem lands in
//! the diagnostics sink. Empty results are ordinary zero-row tables.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{Cell, Table};
use crate::diag::Diagnostic;

/// Missing-value fill strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    /// Numeric columns get `0`, everything else the empty string.
    Empty,
    /// Every null becomes `0`.
    Zero,
    /// Numeric columns get the column mean; non-numeric columns untouched.
    Mean,
    /// Propagate the last non-null value downward.
    Forward,
}

impl FromStr for FillStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(FillStrategy::Empty),
            "zero" => Ok(FillStrategy::Zero),
            "mean" => Ok(FillStrategy::Mean),
            "forward" => Ok(FillStrategy::Forward),
            other => Err(format!("unknown fill strategy: {other}")),
        }
    }
}

impl Table {
    /// Keep only the named columns, in the order given. Unknown names are
    /// dropped from the request; if nothing survives (or the request is
    /// empty) the table is returned unchanged.
    pub fn select_columns(&self, names: &[String], diags: &mut Vec<Diagnostic>) -> Table {
        if names.is_empty() {
            return self.clone();
        }

        let indices: Vec<usize> = names.iter().filter_map(|n| self.column_index(n)).collect();
        if indices.is_empty() {
            warn!("none of the requested columns exist in the table");
            diags.push(Diagnostic::warning(
                "none of the requested columns exist; selection skipped",
            ));
            return self.clone();
        }

        let mut out = Table::new(indices.iter().map(|&i| self.columns()[i].clone()).collect());
        for row in self.rows() {
            out.push_row(indices.iter().map(|&i| row[i].clone()).collect());
        }
        out
    }

    /// Keep rows whose date cell falls within `[start, end]` (inclusive,
    /// either bound open). Cells that cannot be read as a date are dropped
    /// whenever any bound is present.
    pub fn filter_by_date_range(
        &self,
        column: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        diags: &mut Vec<Diagnostic>,
    ) -> Table {
        let Some(idx) = self.column_index(column) else {
            return self.missing_column(column, diags);
        };
        if start.is_none() && end.is_none() {
            return self.clone();
        }

        let filtered = self.retain_rows(|row| match row[idx].as_datetime() {
            Some(dt) => start.is_none_or(|s| dt >= s) && end.is_none_or(|e| dt <= e),
            None => false,
        });
        info!(
            column,
            kept = filtered.num_rows(),
            total = self.num_rows(),
            "date filter applied"
        );
        diags.push(
            Diagnostic::info(format!(
                "date filter kept {} of {} rows",
                filtered.num_rows(),
                self.num_rows()
            ))
            .with_context(column),
        );
        filtered
    }

    /// Keep rows whose numeric cell falls within `[min, max]` (inclusive).
    pub fn filter_by_value_range(
        &self,
        column: &str,
        min: Option<Decimal>,
        max: Option<Decimal>,
        diags: &mut Vec<Diagnostic>,
    ) -> Table {
        let Some(idx) = self.column_index(column) else {
            return self.missing_column(column, diags);
        };
        if min.is_none() && max.is_none() {
            return self.clone();
        }

        let filtered = self.retain_rows(|row| match row[idx].as_number() {
            Some(n) => min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi),
            None => false,
        });
        info!(
            column,
            kept = filtered.num_rows(),
            total = self.num_rows(),
            "value filter applied"
        );
        diags.push(
            Diagnostic::info(format!(
                "value filter kept {} of {} rows",
                filtered.num_rows(),
                self.num_rows()
            ))
            .with_context(column),
        );
        filtered
    }

    /// Keep rows whose stringified cell contains `needle`. Case-insensitive
    /// unless `case_sensitive`; an empty needle is a no-op.
    pub fn filter_by_text(
        &self,
        column: &str,
        needle: &str,
        case_sensitive: bool,
        diags: &mut Vec<Diagnostic>,
    ) -> Table {
        if needle.is_empty() {
            return self.clone();
        }
        let Some(idx) = self.column_index(column) else {
            return self.missing_column(column, diags);
        };

        let lowered = needle.to_lowercase();
        self.retain_rows(|row| {
            let text = row[idx].to_string();
            if case_sensitive {
                text.contains(needle)
            } else {
                text.to_lowercase().contains(&lowered)
            }
        })
    }

    /// Drop duplicate rows, keeping the first occurrence and the original
    /// relative order. `subset` limits which columns participate in the
    /// equality tuple (default: all); a subset naming an unknown column
    /// leaves the table unchanged.
    pub fn remove_duplicates(
        &self,
        subset: Option<&[String]>,
        diags: &mut Vec<Diagnostic>,
    ) -> Table {
        let indices: Vec<usize> = match subset {
            None => (0..self.num_columns()).collect(),
            Some(names) => {
                let mut indices = Vec::with_capacity(names.len());
                for name in names {
                    match self.column_index(name) {
                        Some(i) => indices.push(i),
                        None => return self.missing_column(name, diags),
                    }
                }
                indices
            }
        };

        let mut seen: HashSet<Vec<Cell>> = HashSet::new();
        let deduplicated = self.retain_rows(|row| {
            let key: Vec<Cell> = indices.iter().map(|&i| row[i].clone()).collect();
            seen.insert(key)
        });

        let removed = self.num_rows() - deduplicated.num_rows();
        if removed > 0 {
            info!(removed, "duplicate rows removed");
            diags.push(Diagnostic::info(format!("{removed} duplicate rows removed")));
        }
        deduplicated
    }

    /// Fill missing values per `strategy`. The literal strings
    /// `"None"`/`"none"`/`"NONE"` normalize to true null before any
    /// strategy runs.
    pub fn fill_missing(&self, strategy: FillStrategy, _diags: &mut Vec<Diagnostic>) -> Table {
        let mut out = self.clone();
        for row in &mut out.rows {
            for cell in row.iter_mut() {
                if let Cell::Text(s) = cell {
                    if s.eq_ignore_ascii_case("none") {
                        *cell = Cell::Null;
                    }
                }
            }
        }

        match strategy {
            FillStrategy::Zero => {
                for row in &mut out.rows {
                    for cell in row.iter_mut() {
                        if cell.is_null() {
                            *cell = Cell::Number(Decimal::ZERO);
                        }
                    }
                }
            }
            FillStrategy::Empty => {
                let numeric: Vec<bool> =
                    (0..out.num_columns()).map(|i| out.is_numeric_column(i)).collect();
                for row in &mut out.rows {
                    for (i, cell) in row.iter_mut().enumerate() {
                        if cell.is_null() {
                            *cell = if numeric[i] {
                                Cell::Number(Decimal::ZERO)
                            } else {
                                Cell::Text(String::new())
                            };
                        }
                    }
                }
            }
            FillStrategy::Mean => {
                for i in 0..out.num_columns() {
                    if !out.is_numeric_column(i) {
                        continue;
                    }
                    let values: Vec<Decimal> =
                        out.column_cells(i).filter_map(Cell::as_number).collect();
                    if values.is_empty() {
                        continue;
                    }
                    let mean = values.iter().sum::<Decimal>() / Decimal::from(values.len());
                    for row in &mut out.rows {
                        if row[i].is_null() {
                            row[i] = Cell::Number(mean);
                        }
                    }
                }
            }
            FillStrategy::Forward => {
                for i in 0..out.num_columns() {
                    let mut last: Option<Cell> = None;
                    for row in &mut out.rows {
                        if row[i].is_null() {
                            if let Some(prev) = &last {
                                row[i] = prev.clone();
                            }
                        } else {
                            last = Some(row[i].clone());
                        }
                    }
                }
            }
        }
        out
    }

    /// Stable multi-column sort. Unknown column names are dropped from the
    /// key; with no usable key the table is returned unchanged.
    pub fn sort_by(&self, columns: &[String], ascending: bool, _diags: &mut Vec<Diagnostic>) -> Table {
        let indices: Vec<usize> = columns.iter().filter_map(|n| self.column_index(n)).collect();
        if indices.is_empty() {
            return self.clone();
        }

        let mut out = self.clone();
        out.rows.sort_by(|a, b| {
            let mut ord = Ordering::Equal;
            for &i in &indices {
                ord = compare_cells(&a[i], &b[i]);
                if ord != Ordering::Equal {
                    break;
                }
            }
            if ascending { ord } else { ord.reverse() }
        });
        out
    }

    /// A column is numeric when it holds at least one number and no
    /// non-null text.
    fn is_numeric_column(&self, index: usize) -> bool {
        let mut has_number = false;
        for cell in self.column_cells(index) {
            match cell {
                Cell::Number(_) => has_number = true,
                Cell::Null => {}
                _ => return false,
            }
        }
        has_number
    }

    fn retain_rows(&self, mut keep: impl FnMut(&[Cell]) -> bool) -> Table {
        let mut out = Table::new(self.columns().to_vec());
        for row in self.rows() {
            if keep(row) {
                out.push_row(row.clone());
            }
        }
        out
    }

    fn missing_column(&self, column: &str, diags: &mut Vec<Diagnostic>) -> Table {
        warn!(column, "column not found; table returned unchanged");
        diags.push(
            Diagnostic::warning("column not found; table returned unchanged").with_context(column),
        );
        self.clone()
    }
}

/// Total order over cells for sorting: nulls first, then numbers, dates,
/// text, each compared within its own type.
fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    fn rank(c: &Cell) -> u8 {
        match c {
            Cell::Null => 0,
            Cell::Number(_) => 1,
            Cell::DateTime(_) => 2,
            Cell::Text(_) => 3,
        }
    }
    match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => x.cmp(y),
        (Cell::DateTime(x), Cell::DateTime(y)) => x.cmp(y),
        (Cell::Text(x), Cell::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
