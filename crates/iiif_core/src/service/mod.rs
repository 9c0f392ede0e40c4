//! Federation use-case services.
//!
//! # Responsibility
//! - Orchestrate backend processors into domain-typed query APIs.
//! - Keep callers decoupled from fragments, SQL and SPARQL.

pub mod federation_service;
pub mod materialize;
pub mod merge;
