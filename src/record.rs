//! Rows, composite keys and datasets.

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::{Columns, OptionalColumn};

/// Rendering of the completion marker when written.
pub const DONE: &str = "True";
pub const NOT_DONE: &str = "False";

/// Identifies one row: the product handle plus a per-row disambiguator
/// (several image rows share a handle).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordKey {
    pub handle: String,
    pub disambiguator: String,
}

impl RecordKey {
    pub fn new(handle: impl Into<String>, disambiguator: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            disambiguator: disambiguator.into(),
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.disambiguator.is_empty() {
            f.write_str(&self.handle)
        } else {
            write!(f, "{}#{}", self.handle, self.disambiguator)
        }
    }
}

pub fn is_done(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "done"
    )
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    cells: IndexMap<String, String>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Blank cells read the same as missing ones.
    pub fn text(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }

    pub fn optional<'a>(&'a self, column: &'a OptionalColumn) -> &'a str {
        match self.get(&column.name).map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => &column.default,
        }
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn key(&self, columns: &Columns) -> RecordKey {
        RecordKey::new(
            self.text(&columns.handle),
            self.text(&columns.disambiguator),
        )
    }

    pub fn handle<'a>(&'a self, columns: &Columns) -> &'a str {
        self.text(&columns.handle)
    }

    pub fn is_done(&self, columns: &Columns) -> bool {
        is_done(self.text(&columns.completion))
    }

    pub fn mark_done(&mut self, columns: &Columns, done: bool) {
        self.set(&columns.completion, if done { DONE } else { NOT_DONE });
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A header plus rows. Rows may lack cells for some header columns; those
/// encode as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dataset {
    header: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.header.iter().any(|name| name == column)
    }

    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.header.push(column.to_owned());
        }
    }

    pub fn missing_columns<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        columns
            .into_iter()
            .filter(|column| !self.has_column(column))
            .map(str::to_owned)
            .collect()
    }

    /// Push a row, extending the header with any column it introduces.
    pub fn push(&mut self, row: Row) {
        for column in row.cells.keys() {
            if !self.header.contains(column) {
                self.header.push(column.clone());
            }
        }
        self.rows.push(row);
    }

    pub(crate) fn retain(&mut self, f: impl FnMut(&Row) -> bool) {
        self.rows.retain(f);
    }

    pub(crate) fn replace(&mut self, position: usize, row: Row) {
        for column in row.cells.keys() {
            if !self.header.contains(column) {
                self.header.push(column.clone());
            }
        }
        self.rows[position] = row;
    }
}
