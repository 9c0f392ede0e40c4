//! Identity resolution across backend fragments.
//!
//! # Responsibility
//! - Group fragment rows by identifier across all backends.
//! - Resolve field conflicts with a fixed per-column precedence.
//!
//! # Invariants
//! - Each identifier appears at most once in the output.
//! - Output order is first-seen order over the primary fragments, in the
//!   order they were added; there is no sort by identifier or attribute.
//! - Descriptive columns prefer the relational store; structural columns
//!   (`columns::is_structural`) prefer the triplestore.
//! - Rows without an identifier, and identifiers that end up with no
//!   attribute at all, are dropped silently.

use crate::model::entity::{EntityId, EntityKind};
use crate::repo::fragment::{columns, BackendKind, Fragment, Row};
use log::debug;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// Backend whose value wins when two backends disagree on `column`.
pub fn authority(column: &str) -> BackendKind {
    if columns::is_structural(column) {
        BackendKind::Triplestore
    } else {
        BackendKind::Relational
    }
}

/// One identifier's attributes after merging every fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEntity {
    id: EntityId,
    scalars: BTreeMap<String, String>,
    lists: BTreeMap<String, Vec<String>>,
}

impl MergedEntity {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolved single-valued attribute.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.scalars.get(column).map(String::as_str)
    }

    /// Resolved ordered list attribute; empty when no backend reported one.
    pub fn list(&self, column: &str) -> &[String] {
        self.lists.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Kind reported by the winning backend, if any.
    pub fn kind(&self) -> Option<EntityKind> {
        self.get(columns::KIND).and_then(EntityKind::parse)
    }
}

#[derive(Debug)]
struct Group {
    id: EntityId,
    scalars: BTreeMap<String, (String, BackendKind)>,
    lists: BTreeMap<String, BTreeMap<BackendKind, Vec<String>>>,
}

impl Group {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            scalars: BTreeMap::new(),
            lists: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, row: &Row, source: BackendKind) {
        for (column, value) in row.cells() {
            if column == columns::ID {
                continue;
            }

            if columns::is_list(column) {
                let values = self
                    .lists
                    .entry(column.to_string())
                    .or_default()
                    .entry(source)
                    .or_default();
                if !values.iter().any(|existing| existing == value) {
                    values.push(value.to_string());
                }
                continue;
            }

            match self.scalars.entry(column.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert((value.to_string(), source));
                }
                Entry::Occupied(mut slot) => {
                    let (existing, existing_source) = slot.get_mut();
                    if existing.as_str() != value
                        && *existing_source != source
                        && source == authority(column)
                    {
                        debug!(
                            "event=merge_conflict module=service column={} winner={} loser={}",
                            column, source, existing_source
                        );
                        *existing = value.to_string();
                        *existing_source = source;
                    }
                }
            }
        }
    }

    fn finish(self) -> Option<MergedEntity> {
        let mut lists = BTreeMap::new();
        for (column, by_source) in self.lists {
            let preferred = by_source
                .get(&authority(&column))
                .filter(|values| !values.is_empty())
                .cloned();
            let values = preferred.unwrap_or_else(|| {
                let mut union: Vec<String> = Vec::new();
                for value in by_source.into_values().flatten() {
                    if !union.contains(&value) {
                        union.push(value);
                    }
                }
                union
            });
            if !values.is_empty() {
                lists.insert(column, values);
            }
        }

        if self.scalars.is_empty() && lists.is_empty() {
            return None;
        }

        Some(MergedEntity {
            id: self.id,
            scalars: self
                .scalars
                .into_iter()
                .map(|(column, (value, _))| (column, value))
                .collect(),
            lists,
        })
    }
}

/// Incremental merge of fragments for one logical query.
#[derive(Debug, Default)]
pub struct Merger {
    groups: Vec<Group>,
    index: HashMap<EntityId, usize>,
    dropped_rows: usize,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a primary fragment; unseen identifiers open new groups.
    pub fn add_fragment(&mut self, fragment: &Fragment) {
        for row in fragment.rows() {
            let Some(id) = row.id() else {
                self.dropped_rows += 1;
                continue;
            };
            let position = match self.index.get(id) {
                Some(position) => *position,
                None => {
                    self.groups.push(Group::new(id));
                    self.index.insert(id.to_string(), self.groups.len() - 1);
                    self.groups.len() - 1
                }
            };
            self.groups[position].absorb(row, fragment.source());
        }
    }

    /// Adds a completion fragment; rows for unseen identifiers are ignored.
    pub fn complete_with(&mut self, fragment: &Fragment) {
        for row in fragment.rows() {
            let Some(position) = row.id().and_then(|id| self.index.get(id).copied()) else {
                continue;
            };
            self.groups[position].absorb(row, fragment.source());
        }
    }

    /// Identifiers seen so far, in first-seen order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.groups.iter().map(|group| group.id.clone()).collect()
    }

    /// Resolves every group, dropping identifiers with no attributes.
    pub fn finish(self) -> Vec<MergedEntity> {
        let groups = self.groups.len();
        let merged = self
            .groups
            .into_iter()
            .filter_map(Group::finish)
            .collect::<Vec<_>>();

        if self.dropped_rows > 0 || merged.len() < groups {
            debug!(
                "event=merge_drop module=service rows_without_id={} empty_ids={}",
                self.dropped_rows,
                groups - merged.len()
            );
        }
        merged
    }
}

/// Merges fragments in the given order.
pub fn merge_fragments(fragments: &[Fragment]) -> Vec<MergedEntity> {
    let mut merger = Merger::new();
    for fragment in fragments {
        merger.add_fragment(fragment);
    }
    merger.finish()
}
