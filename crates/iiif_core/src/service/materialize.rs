//! Construction of domain objects from merged entities.
//!
//! # Invariants
//! - Construction never fails; attributes the merge did not resolve stay
//!   `None` or empty instead of being defaulted to blank strings.

use crate::model::annotation::{Annotation, Image};
use crate::model::entity::{Entity, EntityKind, EntityWithMetadata};
use crate::model::iiif::{Canvas, Collection, Manifest};
use crate::repo::fragment::columns;
use crate::service::merge::MergedEntity;

fn text(entity: &MergedEntity, column: &str) -> Option<String> {
    entity.get(column).map(str::to_string)
}

impl From<&MergedEntity> for EntityWithMetadata {
    fn from(entity: &MergedEntity) -> Self {
        Self {
            id: entity.id().to_string(),
            label: text(entity, columns::LABEL),
            title: text(entity, columns::TITLE),
            creator: text(entity, columns::CREATOR),
        }
    }
}

impl From<&MergedEntity> for Annotation {
    fn from(entity: &MergedEntity) -> Self {
        Self {
            id: entity.id().to_string(),
            target: text(entity, columns::TARGET),
            body: text(entity, columns::BODY),
            motivation: text(entity, columns::MOTIVATION),
        }
    }
}

impl From<&MergedEntity> for Image {
    fn from(entity: &MergedEntity) -> Self {
        Self {
            id: entity.id().to_string(),
            canvas: text(entity, columns::CANVAS),
        }
    }
}

impl From<&MergedEntity> for Canvas {
    fn from(entity: &MergedEntity) -> Self {
        Self {
            metadata: EntityWithMetadata::from(entity),
            manifest: text(entity, columns::MANIFEST),
        }
    }
}

impl From<&MergedEntity> for Manifest {
    fn from(entity: &MergedEntity) -> Self {
        Self {
            metadata: EntityWithMetadata::from(entity),
            collection: text(entity, columns::COLLECTION),
            canvases: entity.list(columns::CANVASES).to_vec(),
        }
    }
}

impl From<&MergedEntity> for Collection {
    fn from(entity: &MergedEntity) -> Self {
        Self {
            metadata: EntityWithMetadata::from(entity),
            manifests: entity.list(columns::MANIFESTS).to_vec(),
            collections: entity.list(columns::COLLECTIONS).to_vec(),
        }
    }
}

impl From<&MergedEntity> for Entity {
    fn from(entity: &MergedEntity) -> Self {
        match entity.kind() {
            Some(EntityKind::Collection) => Self::Collection(entity.into()),
            Some(EntityKind::Manifest) => Self::Manifest(entity.into()),
            Some(EntityKind::Canvas) => Self::Canvas(entity.into()),
            Some(EntityKind::Image) => Self::Image(entity.into()),
            Some(EntityKind::Annotation) => Self::Annotation(entity.into()),
            None => Self::Other(entity.into()),
        }
    }
}

/// Returns whether `entity` may be materialized as `kind`.
///
/// Entities whose kind no backend reported are accepted, so a typed query
/// answered by a backend that omits the `kind` column still yields objects.
pub fn admits(entity: &MergedEntity, kind: EntityKind) -> bool {
    entity.kind().map_or(true, |reported| reported == kind)
}

/// Materializes every admitted entity as `T`, keeping merge order.
pub fn materialize<'a, T>(entities: &'a [MergedEntity], kind: EntityKind) -> Vec<T>
where
    T: From<&'a MergedEntity>,
{
    entities
        .iter()
        .filter(|entity| admits(entity, kind))
        .map(T::from)
        .collect()
}
