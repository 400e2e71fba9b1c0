//! Result table
//!
//! The ordered, rectangular output of a batch run: a header row followed by
//! one row per matching entry.

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// One output row; one value per effective attribute.
pub type ResultRow = Vec<String>;

/// An identifier whose search failed without aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailure {
    /// Position in the input identifier list (0-based, blank lines included).
    pub index: usize,
    /// The identifier as searched (trimmed).
    pub identifier: String,
    /// Error code of the failure.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl LookupFailure {
    /// Record a per-identifier error.
    pub fn new(index: usize, identifier: impl Into<String>, error: &LookupError) -> Self {
        Self {
            index,
            identifier: identifier.into(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Header plus data rows, in identifier submission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultTable {
    header: ResultRow,
    rows: Vec<ResultRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    failures: Vec<LookupFailure>,
}

impl ResultTable {
    /// Create an empty table with the given header.
    pub fn new(header: ResultRow) -> Self {
        Self {
            header,
            rows: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Append a data row.
    pub fn push_row(&mut self, row: ResultRow) {
        debug_assert_eq!(row.len(), self.header.len(), "row width must match header");
        self.rows.push(row);
    }

    /// Record an identifier whose search failed.
    pub fn push_failure(&mut self, failure: LookupFailure) {
        self.failures.push(failure);
    }

    /// The header row (the effective attribute names).
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows, without the header.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// All rows, header first.
    pub fn iter(&self) -> impl Iterator<Item = &ResultRow> {
        std::iter::once(&self.header).chain(self.rows.iter())
    }

    /// Number of rows including the header.
    pub fn len(&self) -> usize {
        self.rows.len() + 1
    }

    /// A table always has its header row.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Identifiers whose search failed.
    pub fn failures(&self) -> &[LookupFailure] {
        &self.failures
    }

    /// Check if any identifier failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Consume the table, returning all rows header first.
    pub fn into_rows(self) -> Vec<ResultRow> {
        std::iter::once(self.header).chain(self.rows).collect()
    }
}

impl PartialEq for ResultTable {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.rows == other.rows
    }
}

impl Eq for ResultTable {}
