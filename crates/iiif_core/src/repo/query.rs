//! Backend query contract shared by the relational store and the triplestore.
//!
//! # Responsibility
//! - Define the fixed query vocabulary the federation can dispatch.
//! - Define the capability interface every backend implements.
//!
//! # Invariants
//! - `capabilities()` is static per backend type; it never depends on data.
//! - Unsupported queries are answered with an empty fragment, never an error.
//! - Transport and parse faults surface as `QueryError`, never as empty data.

use crate::db::DbError;
use crate::model::entity::EntityId;
use crate::repo::fragment::{BackendKind, Fragment};
use crate::repo::sparql::SparqlError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type QueryResult<T> = Result<T, QueryError>;

/// Backend query execution fault.
#[derive(Debug)]
pub enum QueryError {
    /// Query issued before a location was configured.
    NotConfigured(BackendKind),
    Db(DbError),
    Sparql(SparqlError),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured(backend) => {
                write!(f, "{backend} backend has no database path or url configured")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::Sparql(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotConfigured(_) => None,
            Self::Db(err) => Some(err),
            Self::Sparql(err) => Some(err),
        }
    }
}

impl From<DbError> for QueryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SparqlError> for QueryError {
    fn from(value: SparqlError) -> Self {
        Self::Sparql(value)
    }
}

/// Parameter-free discriminant of [`Query`], used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    AllAnnotations,
    AllImages,
    AnnotationsWithBody,
    AnnotationsWithBodyAndTarget,
    AnnotationsWithTarget,
    EntityById,
    EntitiesById,
    EntitiesWithCreator,
    EntitiesWithTitle,
    EntitiesWithLabel,
    AllCanvases,
    AllCollections,
    AllManifests,
    CanvasesInCollection,
    CanvasesInManifest,
    ManifestsInCollection,
}

impl QueryKind {
    /// Stable name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllAnnotations => "all_annotations",
            Self::AllImages => "all_images",
            Self::AnnotationsWithBody => "annotations_with_body",
            Self::AnnotationsWithBodyAndTarget => "annotations_with_body_and_target",
            Self::AnnotationsWithTarget => "annotations_with_target",
            Self::EntityById => "entity_by_id",
            Self::EntitiesById => "entities_by_id",
            Self::EntitiesWithCreator => "entities_with_creator",
            Self::EntitiesWithTitle => "entities_with_title",
            Self::EntitiesWithLabel => "entities_with_label",
            Self::AllCanvases => "all_canvases",
            Self::AllCollections => "all_collections",
            Self::AllManifests => "all_manifests",
            Self::CanvasesInCollection => "canvases_in_collection",
            Self::CanvasesInManifest => "canvases_in_manifest",
            Self::ManifestsInCollection => "manifests_in_collection",
        }
    }
}

/// One logical query with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    AllAnnotations,
    AllImages,
    AnnotationsWithBody { body: EntityId },
    AnnotationsWithBodyAndTarget { body: EntityId, target: EntityId },
    /// Matches the exact target or a media-fragment region of it.
    AnnotationsWithTarget { target: EntityId },
    EntityById { id: EntityId },
    /// Batch lookup used to complete metadata of already-resolved identifiers.
    EntitiesById { ids: Vec<EntityId> },
    /// Matches the whole creator cell or any single listed creator.
    EntitiesWithCreator { creator: String },
    EntitiesWithTitle { title: String },
    EntitiesWithLabel { label: String },
    AllCanvases,
    AllCollections,
    AllManifests,
    /// Transitive through sub-collections.
    CanvasesInCollection { collection: EntityId },
    CanvasesInManifest { manifest: EntityId },
    /// Transitive through sub-collections.
    ManifestsInCollection { collection: EntityId },
}

impl Query {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::AllAnnotations => QueryKind::AllAnnotations,
            Self::AllImages => QueryKind::AllImages,
            Self::AnnotationsWithBody { .. } => QueryKind::AnnotationsWithBody,
            Self::AnnotationsWithBodyAndTarget { .. } => QueryKind::AnnotationsWithBodyAndTarget,
            Self::AnnotationsWithTarget { .. } => QueryKind::AnnotationsWithTarget,
            Self::EntityById { .. } => QueryKind::EntityById,
            Self::EntitiesById { .. } => QueryKind::EntitiesById,
            Self::EntitiesWithCreator { .. } => QueryKind::EntitiesWithCreator,
            Self::EntitiesWithTitle { .. } => QueryKind::EntitiesWithTitle,
            Self::EntitiesWithLabel { .. } => QueryKind::EntitiesWithLabel,
            Self::AllCanvases => QueryKind::AllCanvases,
            Self::AllCollections => QueryKind::AllCollections,
            Self::AllManifests => QueryKind::AllManifests,
            Self::CanvasesInCollection { .. } => QueryKind::CanvasesInCollection,
            Self::CanvasesInManifest { .. } => QueryKind::CanvasesInManifest,
            Self::ManifestsInCollection { .. } => QueryKind::ManifestsInCollection,
        }
    }
}

/// Location handling shared by query and upload processors.
///
/// # Preconditions
/// - Reconfiguring a processor while one of its queries is in flight is not
///   supported; callers must hold exclusive access (`&mut self`).
pub trait Processor {
    /// Returns the last successfully set location.
    fn db_path_or_url(&self) -> Option<&str>;

    /// Sets the connection target.
    ///
    /// Returns `false` and keeps the previous location when `location` is
    /// malformed. Setting the same location twice is a no-op.
    fn set_db_path_or_url(&mut self, location: &str) -> bool;
}

/// Capability interface implemented once per backend.
pub trait QueryProcessor: Processor {
    fn backend(&self) -> BackendKind;

    /// Query kinds this backend can natively answer.
    fn capabilities(&self) -> &'static [QueryKind];

    fn supports(&self, kind: QueryKind) -> bool {
        self.capabilities().contains(&kind)
    }

    /// Executes a supported query against the store.
    ///
    /// Callers go through [`QueryProcessor::run`] unless they have already
    /// checked [`QueryProcessor::supports`].
    fn execute(&self, query: &Query) -> QueryResult<Fragment>;

    /// Executes `query`, answering unsupported kinds with an empty fragment.
    fn run(&self, query: &Query) -> QueryResult<Fragment> {
        if !self.supports(query.kind()) {
            return Ok(Fragment::empty(self.backend()));
        }
        self.execute(query)
    }

    fn get_all_annotations(&self) -> QueryResult<Fragment> {
        self.run(&Query::AllAnnotations)
    }

    fn get_all_images(&self) -> QueryResult<Fragment> {
        self.run(&Query::AllImages)
    }

    fn get_annotations_with_body(&self, body: &str) -> QueryResult<Fragment> {
        self.run(&Query::AnnotationsWithBody {
            body: body.to_string(),
        })
    }

    fn get_annotations_with_body_and_target(
        &self,
        body: &str,
        target: &str,
    ) -> QueryResult<Fragment> {
        self.run(&Query::AnnotationsWithBodyAndTarget {
            body: body.to_string(),
            target: target.to_string(),
        })
    }

    fn get_annotations_with_target(&self, target: &str) -> QueryResult<Fragment> {
        self.run(&Query::AnnotationsWithTarget {
            target: target.to_string(),
        })
    }

    fn get_entity_by_id(&self, id: &str) -> QueryResult<Fragment> {
        self.run(&Query::EntityById { id: id.to_string() })
    }

    fn get_entities_with_creator(&self, creator: &str) -> QueryResult<Fragment> {
        self.run(&Query::EntitiesWithCreator {
            creator: creator.to_string(),
        })
    }

    fn get_entities_with_title(&self, title: &str) -> QueryResult<Fragment> {
        self.run(&Query::EntitiesWithTitle {
            title: title.to_string(),
        })
    }

    fn get_entities_with_label(&self, label: &str) -> QueryResult<Fragment> {
        self.run(&Query::EntitiesWithLabel {
            label: label.to_string(),
        })
    }

    fn get_all_canvases(&self) -> QueryResult<Fragment> {
        self.run(&Query::AllCanvases)
    }

    fn get_all_collections(&self) -> QueryResult<Fragment> {
        self.run(&Query::AllCollections)
    }

    fn get_all_manifests(&self) -> QueryResult<Fragment> {
        self.run(&Query::AllManifests)
    }

    fn get_canvases_in_collection(&self, collection: &str) -> QueryResult<Fragment> {
        self.run(&Query::CanvasesInCollection {
            collection: collection.to_string(),
        })
    }

    fn get_canvases_in_manifest(&self, manifest: &str) -> QueryResult<Fragment> {
        self.run(&Query::CanvasesInManifest {
            manifest: manifest.to_string(),
        })
    }

    fn get_manifests_in_collection(&self, collection: &str) -> QueryResult<Fragment> {
        self.run(&Query::ManifestsInCollection {
            collection: collection.to_string(),
        })
    }
}
