//! Shared identity and metadata types.
//!
//! # Responsibility
//! - Define the identifier and kind vocabulary used across both stores.
//! - Provide the metadata record embedded by collections, manifests and canvases.
//! - Provide the closed `Entity` sum returned by heterogeneous lookups.
//!
//! # Invariants
//! - `id` is the sole merge key across backends.
//! - Kind wire names are lowercase and stable.

use crate::model::annotation::{Annotation, Image};
use crate::model::iiif::{Canvas, Collection, Manifest};
use serde::{Deserialize, Serialize};

/// Globally unique identifier shared by the relational store and the triplestore.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EntityId = String;

/// Separator used when one creator cell lists several people.
pub const CREATOR_SEPARATOR: &str = "; ";

/// Closed set of entity kinds known to the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Collection,
    Manifest,
    Canvas,
    Image,
    Annotation,
}

impl EntityKind {
    /// Stable string used in fragment `kind` cells.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Manifest => "manifest",
            Self::Canvas => "canvas",
            Self::Image => "image",
            Self::Annotation => "annotation",
        }
    }

    /// Parses one fragment `kind` cell.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "collection" => Some(Self::Collection),
            "manifest" => Some(Self::Manifest),
            "canvas" => Some(Self::Canvas),
            "image" => Some(Self::Image),
            "annotation" => Some(Self::Annotation),
            _ => None,
        }
    }
}

/// Descriptive metadata attached to collections, manifests and canvases.
///
/// Also used on its own for identifiers that carry metadata but whose kind
/// no registered backend can state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityWithMetadata {
    pub id: EntityId,
    /// IIIF label, reported by the triplestore.
    pub label: Option<String>,
    /// Catalogue title, reported by the relational store.
    pub title: Option<String>,
    /// Raw creator cell; may list several creators separated by `"; "`.
    pub creator: Option<String>,
}

impl EntityWithMetadata {
    /// Creates a record with every optional attribute unset.
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            title: None,
            creator: None,
        }
    }

    /// Returns the individual creators listed in the creator cell.
    pub fn creators(&self) -> Vec<&str> {
        self.creator
            .as_deref()
            .map(|cell| {
                cell.split(CREATOR_SEPARATOR)
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Read access to the embedded metadata of an entity.
pub trait HasMetadata {
    fn metadata(&self) -> &EntityWithMetadata;

    fn id(&self) -> &str {
        &self.metadata().id
    }

    fn label(&self) -> Option<&str> {
        self.metadata().label.as_deref()
    }

    fn title(&self) -> Option<&str> {
        self.metadata().title.as_deref()
    }

    fn creator(&self) -> Option<&str> {
        self.metadata().creator.as_deref()
    }

    fn creators(&self) -> Vec<&str> {
        self.metadata().creators()
    }
}

impl HasMetadata for EntityWithMetadata {
    fn metadata(&self) -> &EntityWithMetadata {
        self
    }
}

/// Any entity the federation can resolve from an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Collection(Collection),
    Manifest(Manifest),
    Canvas(Canvas),
    Image(Image),
    Annotation(Annotation),
    /// Metadata-only identifier with no kind reported by any backend.
    Other(EntityWithMetadata),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Self::Collection(value) => value.id(),
            Self::Manifest(value) => value.id(),
            Self::Canvas(value) => value.id(),
            Self::Image(value) => &value.id,
            Self::Annotation(value) => &value.id,
            Self::Other(value) => &value.id,
        }
    }

    /// Returns `None` for `Other`, whose kind is unknown.
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Self::Collection(_) => Some(EntityKind::Collection),
            Self::Manifest(_) => Some(EntityKind::Manifest),
            Self::Canvas(_) => Some(EntityKind::Canvas),
            Self::Image(_) => Some(EntityKind::Image),
            Self::Annotation(_) => Some(EntityKind::Annotation),
            Self::Other(_) => None,
        }
    }

    /// Returns embedded metadata for metadata-bearing entities.
    pub fn metadata(&self) -> Option<&EntityWithMetadata> {
        match self {
            Self::Collection(value) => Some(value.metadata()),
            Self::Manifest(value) => Some(value.metadata()),
            Self::Canvas(value) => Some(value.metadata()),
            Self::Other(value) => Some(value),
            Self::Image(_) | Self::Annotation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, EntityWithMetadata, HasMetadata};

    #[test]
    fn kind_wire_names_roundtrip() {
        for kind in [
            EntityKind::Collection,
            EntityKind::Manifest,
            EntityKind::Canvas,
            EntityKind::Image,
            EntityKind::Annotation,
        ] {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::parse("Canvas"), None);
    }

    #[test]
    fn creators_split_multi_valued_cell() {
        let mut entity = EntityWithMetadata::new("manifest:1");
        assert!(entity.creators().is_empty());

        entity.creator = Some("Alighieri, Dante; Boccaccio, Giovanni".to_string());
        assert_eq!(
            entity.creators(),
            vec!["Alighieri, Dante", "Boccaccio, Giovanni"]
        );
        assert_eq!(entity.id(), "manifest:1");
    }
}
