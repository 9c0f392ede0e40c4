//! Tabular partial results returned by one backend for one query.
//!
//! # Responsibility
//! - Carry backend rows in one canonical column vocabulary.
//! - Record which backend produced the rows, for merge precedence.
//!
//! # Invariants
//! - An absent cell means "unknown to this backend", never "empty".
//! - Row order is the backend's result order and is preserved verbatim.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Canonical column names shared by every backend.
pub mod columns {
    pub const ID: &str = "id";
    pub const KIND: &str = "kind";
    pub const LABEL: &str = "label";
    pub const TITLE: &str = "title";
    pub const CREATOR: &str = "creator";
    pub const MOTIVATION: &str = "motivation";
    pub const TARGET: &str = "target";
    pub const BODY: &str = "body";
    /// Canvas depicted by an image.
    pub const CANVAS: &str = "canvas";
    /// Parent manifest of a canvas.
    pub const MANIFEST: &str = "manifest";
    /// Parent collection of a manifest.
    pub const COLLECTION: &str = "collection";
    /// Canvas member of a manifest, one per row.
    pub const CANVASES: &str = "canvases";
    /// Manifest member of a collection, one per row.
    pub const MANIFESTS: &str = "manifests";
    /// Sub-collection member of a collection, one per row.
    pub const COLLECTIONS: &str = "collections";

    const STRUCTURAL: &[&str] = &[KIND, MANIFEST, COLLECTION, CANVASES, MANIFESTS, COLLECTIONS];
    const LISTS: &[&str] = &[CANVASES, MANIFESTS, COLLECTIONS];

    /// Whether the column describes hierarchy rather than descriptive metadata.
    pub fn is_structural(column: &str) -> bool {
        STRUCTURAL.contains(&column)
    }

    /// Whether the column accumulates one ordered value per row.
    pub fn is_list(column: &str) -> bool {
        LISTS.contains(&column)
    }
}

/// Physical store a fragment originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackendKind {
    Relational,
    Triplestore,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Triplestore => "triplestore",
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of a fragment, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: BTreeMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter used by tests and adapters.
    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.cells.insert(column.to_string(), value.into());
        self
    }

    /// Sets or clears one cell; `None` leaves the cell absent.
    pub fn set(&mut self, column: &str, value: Option<String>) {
        match value {
            Some(value) => {
                self.cells.insert(column.to_string(), value);
            }
            None => {
                self.cells.remove(column);
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Identifier cell, ignoring blank values.
    pub fn id(&self) -> Option<&str> {
        self.get(columns::ID)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Iterates present cells in column-name order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(column, value)| (column.as_str(), value.as_str()))
    }
}

/// Tabular result of one backend query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    source: BackendKind,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Fragment {
    pub fn new(source: BackendKind, columns: Vec<String>) -> Self {
        Self {
            source,
            columns,
            rows: Vec::new(),
        }
    }

    /// Empty-but-successful fragment.
    pub fn empty(source: BackendKind) -> Self {
        Self::new(source, Vec::new())
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn source(&self) -> BackendKind {
        self.source
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
