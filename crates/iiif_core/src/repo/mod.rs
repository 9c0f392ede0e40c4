//! Backend query processors and their shared contract.
//!
//! # Responsibility
//! - Define the capability interface the federation dispatches through.
//! - Isolate SQL and SPARQL details from merge and orchestration code.
//!
//! # Invariants
//! - Processors return tabular fragments, never domain objects.
//! - Processors own exactly one location each; there is no process-wide
//!   "current connection".

pub mod fragment;
pub mod location;
pub mod query;
pub mod relational_repo;
pub mod sparql;
pub mod triplestore_repo;
