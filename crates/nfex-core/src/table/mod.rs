//! Consolidated tabular data: typed cells, uniform columns, ordered rows.

pub mod transform;

pub use transform::FillStrategy;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::fields::coerce;

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Missing value; distinct from an empty string.
    Null,
    /// Monetary or other numeric value.
    Number(Decimal),
    /// Date or datetime (offset already stripped at coercion time).
    DateTime(NaiveDateTime),
    /// Free text.
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of the cell. `Text` is parsed strictly (plain decimal
    /// point); locale-aware currency parsing happens at extraction time.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Datetime view of the cell; `Text` goes through the multi-format
    /// date coercer.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => coerce::coerce_datetime(s),
            _ => None,
        }
    }

    /// Coerce to a currency number: already-numeric cells pass through
    /// unchanged, text goes through the Brazilian-locale parser, anything
    /// else defaults to zero.
    pub fn to_currency(&self) -> Decimal {
        match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => coerce::coerce_currency(s),
            _ => Decimal::ZERO,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Number(n) => Serialize::serialize(n, serializer),
            Cell::DateTime(dt) => serializer.serialize_str(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// An ordered sequence of uniform-width rows.
///
/// The column set is fixed at construction; rows are padded with `Null` to
/// the column width so every record exposes the same key set regardless of
/// what its source document contained. Serializes as an array of
/// `{column: value}` records.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows. An empty table is an ordinary
    /// value, not a failure; it still carries its full column set.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, padding or truncating to the table width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate one column's cells top to bottom.
    pub fn column_cells<'a>(&'a self, index: usize) -> impl Iterator<Item = &'a Cell> {
        self.rows.iter().map(move |row| &row[index])
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Record {
                columns: &self.columns,
                row,
            })?;
        }
        seq.end()
    }
}

struct Record<'a> {
    columns: &'a [String],
    row: &'a [Cell],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.row.iter()) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}
