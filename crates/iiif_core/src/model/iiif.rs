//! Structural IIIF entities: collections, manifests and canvases.
//!
//! # Invariants
//! - Child sequences keep the order reported by the structural backend.
//! - Parent references are optional; a missing parent means "not reported".

use crate::model::entity::{EntityId, EntityWithMetadata, HasMetadata};
use serde::{Deserialize, Serialize};

/// Grouping of manifests and sub-collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub metadata: EntityWithMetadata,
    /// Ordered manifest members.
    pub manifests: Vec<EntityId>,
    /// Ordered sub-collection members.
    pub collections: Vec<EntityId>,
}

impl Collection {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            metadata: EntityWithMetadata::new(id),
            manifests: Vec::new(),
            collections: Vec::new(),
        }
    }
}

impl HasMetadata for Collection {
    fn metadata(&self) -> &EntityWithMetadata {
        &self.metadata
    }
}

/// One digitized object, made of an ordered sequence of canvases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: EntityWithMetadata,
    /// Parent collection, when the structural backend reports one.
    pub collection: Option<EntityId>,
    /// Ordered canvas members.
    pub canvases: Vec<EntityId>,
}

impl Manifest {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            metadata: EntityWithMetadata::new(id),
            collection: None,
            canvases: Vec::new(),
        }
    }
}

impl HasMetadata for Manifest {
    fn metadata(&self) -> &EntityWithMetadata {
        &self.metadata
    }
}

/// One view (page, side, plate) of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub metadata: EntityWithMetadata,
    /// Owning manifest, when the structural backend reports one.
    pub manifest: Option<EntityId>,
}

impl Canvas {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            metadata: EntityWithMetadata::new(id),
            manifest: None,
        }
    }
}

impl HasMetadata for Canvas {
    fn metadata(&self) -> &EntityWithMetadata {
        &self.metadata
    }
}
