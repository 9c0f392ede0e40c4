//! Annotation and image records held by the relational store.
//!
//! # Invariants
//! - `target` and `body` are plain references; they are never resolved to
//!   objects here, so a dangling reference is representable.

use crate::model::entity::EntityId;
use serde::{Deserialize, Serialize};

/// User annotation linking a body (usually an image) to a target region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: EntityId,
    /// Annotated entity, possibly a media-fragment region such as `canvas#xywh=..`.
    pub target: Option<EntityId>,
    /// Image identifier or literal text.
    pub body: Option<EntityId>,
    /// W3C motivation, e.g. `painting` or `supplementing`.
    pub motivation: Option<String>,
}

impl Annotation {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            target: None,
            body: None,
            motivation: None,
        }
    }
}

/// Image resource used as an annotation body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: EntityId,
    /// Canvas (or canvas region) the image depicts.
    pub canvas: Option<EntityId>,
}

impl Image {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            canvas: None,
        }
    }
}
