//! Federated query layer over a relational store and a SPARQL triplestore
//! holding one IIIF corpus.
//!
//! Callers register backend processors on a [`GenericQueryProcessor`] and get
//! merged domain objects back; fragments never leave this crate's service layer.

pub mod db;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, DbError, DbResult};
pub use ingest::collection::CollectionProcessor;
pub use ingest::relational::{AnnotationProcessor, MetadataProcessor};
pub use ingest::{IngestError, IngestResult, UploadHandler};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::annotation::{Annotation, Image};
pub use model::entity::{Entity, EntityId, EntityKind, EntityWithMetadata, HasMetadata};
pub use model::iiif::{Canvas, Collection, Manifest};
pub use repo::fragment::{BackendKind, Fragment, Row};
pub use repo::query::{Processor, Query, QueryError, QueryKind, QueryProcessor, QueryResult};
pub use repo::relational_repo::RelationalQueryProcessor;
pub use repo::sparql::{HttpSparqlClient, SparqlClient, SparqlError, SparqlResults};
pub use repo::triplestore_repo::TriplestoreQueryProcessor;
pub use service::federation_service::{FederationError, FederationResult, GenericQueryProcessor};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
