//! Domain model for the federated IIIF corpus.
//!
//! # Responsibility
//! - Define the value types handed to callers of the federation layer.
//! - Keep one identity space (`EntityId`) shared by both stores.
//!
//! # Invariants
//! - Every domain object is identified by a stable `EntityId`.
//! - Instances are built fresh per query result and never mutated afterwards.
//! - Unknown attributes are `None`, never an empty-string placeholder.

pub mod annotation;
pub mod entity;
pub mod iiif;
