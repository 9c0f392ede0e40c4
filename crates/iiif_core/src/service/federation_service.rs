//! Federated query use-case service.
//!
//! # Responsibility
//! - Hold the registry of backend query processors.
//! - Fan each logical query out to every capable backend, merge fragments
//!   by identifier and return domain objects.
//!
//! # Invariants
//! - Registration is add-only; dispatch follows registration order.
//! - Backends that do not support a query are skipped, never called.
//! - A backend fault aborts the whole query; no partial merge is returned.
//! - Metadata completion may enrich resolved identifiers but never adds new
//!   ones.

use crate::model::annotation::{Annotation, Image};
use crate::model::entity::{Entity, EntityId, EntityKind};
use crate::model::iiif::{Canvas, Collection, Manifest};
use crate::repo::fragment::{BackendKind, Fragment};
use crate::repo::query::{Query, QueryError, QueryKind, QueryProcessor};
use crate::service::materialize::materialize;
use crate::service::merge::{MergedEntity, Merger};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type FederationResult<T> = Result<T, FederationError>;

/// Federated query failure.
#[derive(Debug)]
pub enum FederationError {
    /// One registered backend failed while answering `query`.
    Backend {
        backend: BackendKind,
        query: QueryKind,
        source: QueryError,
    },
}

impl Display for FederationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend {
                backend,
                query,
                source,
            } => write!(
                f,
                "{backend} backend failed on {}: {source}",
                query.as_str()
            ),
        }
    }
}

impl Error for FederationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend { source, .. } => Some(source),
        }
    }
}

/// Annotation and image answers already carry every attribute their backend
/// owns; batch lookups are themselves the completion round.
fn needs_completion(kind: QueryKind) -> bool {
    !matches!(
        kind,
        QueryKind::AllAnnotations
            | QueryKind::AllImages
            | QueryKind::AnnotationsWithBody
            | QueryKind::AnnotationsWithBodyAndTarget
            | QueryKind::AnnotationsWithTarget
            | QueryKind::EntitiesById
    )
}

/// Federation front-end over registered backend processors.
#[derive(Default)]
pub struct GenericQueryProcessor {
    processors: Vec<Box<dyn QueryProcessor>>,
}

impl GenericQueryProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one backend; it takes part in every later query.
    pub fn add_query_processor(&mut self, processor: impl QueryProcessor + 'static) {
        debug!(
            "event=processor_register module=service backend={} position={}",
            processor.backend(),
            self.processors.len()
        );
        self.processors.push(Box::new(processor));
    }

    pub fn query_processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Backend kind of each registered processor, in registration order.
    pub fn backends(&self) -> Vec<BackendKind> {
        self.processors
            .iter()
            .map(|processor| processor.backend())
            .collect()
    }

    fn resolve(&self, query: &Query) -> FederationResult<Vec<MergedEntity>> {
        let started_at = Instant::now();
        let kind = query.kind();
        let mut merger = Merger::new();
        let mut answered = vec![false; self.processors.len()];

        for (position, processor) in self.processors.iter().enumerate() {
            if !processor.supports(kind) {
                debug!(
                    "event=query_skip module=service query={} backend={} reason=unsupported",
                    kind.as_str(),
                    processor.backend()
                );
                continue;
            }
            let fragment = call(processor.as_ref(), query)?;
            merger.add_fragment(&fragment);
            answered[position] = true;
        }

        let ids = merger.ids();
        if needs_completion(kind) && !ids.is_empty() {
            let completion = Query::EntitiesById { ids };
            for (position, processor) in self.processors.iter().enumerate() {
                if answered[position] || !processor.supports(QueryKind::EntitiesById) {
                    continue;
                }
                let fragment = call(processor.as_ref(), &completion)?;
                merger.complete_with(&fragment);
            }
        }

        let merged = merger.finish();
        info!(
            "event=federated_query module=service status=ok query={} backends={} entities={} duration_ms={}",
            kind.as_str(),
            answered.iter().filter(|flag| **flag).count(),
            merged.len(),
            started_at.elapsed().as_millis()
        );
        Ok(merged)
    }

    pub fn get_all_annotations(&self) -> FederationResult<Vec<Annotation>> {
        let merged = self.resolve(&Query::AllAnnotations)?;
        Ok(materialize(&merged, EntityKind::Annotation))
    }

    pub fn get_all_canvas(&self) -> FederationResult<Vec<Canvas>> {
        let merged = self.resolve(&Query::AllCanvases)?;
        Ok(materialize(&merged, EntityKind::Canvas))
    }

    pub fn get_all_collections(&self) -> FederationResult<Vec<Collection>> {
        let merged = self.resolve(&Query::AllCollections)?;
        Ok(materialize(&merged, EntityKind::Collection))
    }

    pub fn get_all_images(&self) -> FederationResult<Vec<Image>> {
        let merged = self.resolve(&Query::AllImages)?;
        Ok(materialize(&merged, EntityKind::Image))
    }

    pub fn get_all_manifests(&self) -> FederationResult<Vec<Manifest>> {
        let merged = self.resolve(&Query::AllManifests)?;
        Ok(materialize(&merged, EntityKind::Manifest))
    }

    /// Annotations targeting `canvas`, or nothing when `canvas` does not
    /// resolve to a canvas.
    pub fn get_annotations_to_canvas(&self, canvas: &str) -> FederationResult<Vec<Annotation>> {
        self.annotations_to(canvas, EntityKind::Canvas)
    }

    pub fn get_annotations_to_collection(
        &self,
        collection: &str,
    ) -> FederationResult<Vec<Annotation>> {
        self.annotations_to(collection, EntityKind::Collection)
    }

    pub fn get_annotations_to_manifest(
        &self,
        manifest: &str,
    ) -> FederationResult<Vec<Annotation>> {
        self.annotations_to(manifest, EntityKind::Manifest)
    }

    fn annotations_to(&self, target: &str, kind: EntityKind) -> FederationResult<Vec<Annotation>> {
        let target = target.trim();
        let resolved = self
            .get_entity_by_id(target)?
            .and_then(|entity| entity.kind());
        if resolved != Some(kind) {
            debug!(
                "event=query_skip module=service query=annotations_to_{} reason=kind_mismatch",
                kind.as_str()
            );
            return Ok(Vec::new());
        }
        self.get_annotations_with_target(target)
    }

    pub fn get_annotations_with_body(&self, body: &str) -> FederationResult<Vec<Annotation>> {
        let merged = self.resolve(&Query::AnnotationsWithBody {
            body: body.to_string(),
        })?;
        Ok(materialize(&merged, EntityKind::Annotation))
    }

    pub fn get_annotations_with_body_and_target(
        &self,
        body: &str,
        target: &str,
    ) -> FederationResult<Vec<Annotation>> {
        let merged = self.resolve(&Query::AnnotationsWithBodyAndTarget {
            body: body.to_string(),
            target: target.to_string(),
        })?;
        Ok(materialize(&merged, EntityKind::Annotation))
    }

    pub fn get_annotations_with_target(&self, target: &str) -> FederationResult<Vec<Annotation>> {
        let merged = self.resolve(&Query::AnnotationsWithTarget {
            target: target.to_string(),
        })?;
        Ok(materialize(&merged, EntityKind::Annotation))
    }

    /// Canvases reachable from `collection`, through sub-collections.
    pub fn get_canvases_in_collection(&self, collection: &str) -> FederationResult<Vec<Canvas>> {
        let merged = self.resolve(&Query::CanvasesInCollection {
            collection: collection.to_string(),
        })?;
        Ok(materialize(&merged, EntityKind::Canvas))
    }

    pub fn get_canvases_in_manifest(&self, manifest: &str) -> FederationResult<Vec<Canvas>> {
        let merged = self.resolve(&Query::CanvasesInManifest {
            manifest: manifest.to_string(),
        })?;
        Ok(materialize(&merged, EntityKind::Canvas))
    }

    /// Resolves one identifier across every backend.
    ///
    /// Surrounding whitespace is ignored. Returns `Ok(None)` when no backend
    /// knows `id`.
    pub fn get_entity_by_id(&self, id: &str) -> FederationResult<Option<Entity>> {
        let id = id.trim();
        let merged = self.resolve(&Query::EntityById { id: id.to_string() })?;
        Ok(merged.iter().find(|entity| entity.id() == id).map(Entity::from))
    }

    pub fn get_entities_with_creator(&self, creator: &str) -> FederationResult<Vec<Entity>> {
        let merged = self.resolve(&Query::EntitiesWithCreator {
            creator: creator.to_string(),
        })?;
        Ok(merged.iter().map(Entity::from).collect())
    }

    pub fn get_entities_with_label(&self, label: &str) -> FederationResult<Vec<Entity>> {
        let merged = self.resolve(&Query::EntitiesWithLabel {
            label: label.to_string(),
        })?;
        Ok(merged.iter().map(Entity::from).collect())
    }

    pub fn get_entities_with_title(&self, title: &str) -> FederationResult<Vec<Entity>> {
        let merged = self.resolve(&Query::EntitiesWithTitle {
            title: title.to_string(),
        })?;
        Ok(merged.iter().map(Entity::from).collect())
    }

    /// Images used as bodies of annotations targeting `canvas`, in
    /// annotation order.
    pub fn get_images_annotating_canvas(&self, canvas: &str) -> FederationResult<Vec<Image>> {
        let mut bodies: Vec<EntityId> = Vec::new();
        for annotation in self.get_annotations_to_canvas(canvas)? {
            if let Some(body) = annotation.body {
                if !bodies.contains(&body) {
                    bodies.push(body);
                }
            }
        }
        if bodies.is_empty() {
            return Ok(Vec::new());
        }

        let merged = self.resolve(&Query::EntitiesById { ids: bodies })?;
        Ok(merged
            .iter()
            .filter(|entity| entity.kind() == Some(EntityKind::Image))
            .map(Image::from)
            .collect())
    }

    /// Manifests reachable from `collection`, through sub-collections.
    pub fn get_manifests_in_collection(
        &self,
        collection: &str,
    ) -> FederationResult<Vec<Manifest>> {
        let merged = self.resolve(&Query::ManifestsInCollection {
            collection: collection.to_string(),
        })?;
        Ok(materialize(&merged, EntityKind::Manifest))
    }
}

fn call(processor: &dyn QueryProcessor, query: &Query) -> FederationResult<Fragment> {
    processor.execute(query).map_err(|source| {
        error!(
            "event=federated_query module=service status=error query={} backend={} error={}",
            query.kind().as_str(),
            processor.backend(),
            source
        );
        FederationError::Backend {
            backend: processor.backend(),
            query: query.kind(),
            source,
        }
    })
}
