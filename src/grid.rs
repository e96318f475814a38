//! Output grid: rows of display-ready cells
//!
//! A [`Grid`] is what every entry point returns. Row 0 is the header of the
//! requested resource, except for error grids (see [`crate::error`]).

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;

use crate::error::{API_ERROR_MARKER, ERROR_MARKER};

/// A single display value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Timestamp, keeping the offset the API reported
    Date(DateTime<FixedOffset>),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// The empty text cell used for absent optional values
    pub fn empty() -> Self {
        Cell::Text(String::new())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Date(d) => f.write_str(&d.to_rfc3339()),
        }
    }
}

pub type Row = Vec<Cell>;

/// Ordered rows of cells
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Row>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a grid whose first row is the given header
    pub fn with_header(header: &[&str]) -> Self {
        Self {
            rows: vec![header.iter().map(|h| Cell::text(*h)).collect()],
        }
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Rows after the header
    pub fn body(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Number of rows, header included
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row length
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Whether this grid reports a failure by convention (first cell is
    /// `"ERROR"` or `"API Error"`)
    pub fn is_error(&self) -> bool {
        matches!(
            self.rows.first().and_then(|row| row.first()).and_then(Cell::as_text),
            Some(ERROR_MARKER) | Some(API_ERROR_MARKER)
        )
    }
}
