//! SPARQL protocol client and query-text helpers.
//!
//! # Responsibility
//! - Execute SELECT and UPDATE requests against a SPARQL 1.1 endpoint.
//! - Decode `application/sparql-results+json` binding sets.
//! - Render identifiers and literals safely into query text.
//!
//! # Invariants
//! - Only values accepted by [`iri`] are ever written inside `<...>`.
//! - HTTP status failures carry the endpoint response body for diagnostics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use url::Url;

/// Namespace for IIIF presentation types.
pub const IIIF_NS: &str = "http://iiif.io/api/presentation/3#";
/// Namespace for `rdfs:label`.
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
/// Namespace for ordered membership and ingestion sequence.
pub const FED_NS: &str = "https://w3id.org/iiif-federation/vocab#";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const MAX_ERROR_BODY_CHARS: usize = 512;

static IRI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[A-Za-z][A-Za-z0-9+.\-]*:[^\x00-\x20<>"{}|^`\\]*$"#).expect("valid IRI regex")
});

/// Returns the `PREFIX` header shared by every query and update.
pub fn prefixes() -> String {
    format!("PREFIX iiif: <{IIIF_NS}>\nPREFIX rdfs: <{RDFS_NS}>\nPREFIX fed: <{FED_NS}>\n")
}

/// Renders `value` as `<value>` when it is a syntactically valid absolute IRI.
pub fn iri(value: &str) -> Option<String> {
    let trimmed = value.trim();
    IRI_PATTERN
        .is_match(trimmed)
        .then(|| format!("<{trimmed}>"))
}

/// Renders `value` as a quoted SPARQL string literal.
pub fn literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped.push('"');
    escaped
}

/// SPARQL transport or decoding failure.
#[derive(Debug)]
pub enum SparqlError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
    Decode(String),
}

impl Display for SparqlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "sparql request failed: {err}"),
            Self::Status { status, body } => {
                write!(f, "sparql endpoint returned status {status}: {body}")
            }
            Self::Decode(message) => write!(f, "invalid sparql response: {message}"),
        }
    }
}

impl Error for SparqlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Status { .. } | Self::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for SparqlError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// One bound RDF term in a result row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SparqlTerm {
    #[serde(rename = "type")]
    pub term_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SparqlHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SparqlBindings {
    pub bindings: Vec<BTreeMap<String, SparqlTerm>>,
}

/// Decoded SELECT result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: SparqlHead,
    pub results: SparqlBindings,
}

impl SparqlResults {
    /// Parses a `application/sparql-results+json` SELECT document.
    ///
    /// Bodies without `results.bindings` (ASK replies, endpoint error
    /// objects) are rejected.
    pub fn from_json(body: &str) -> Result<Self, SparqlError> {
        serde_json::from_str(body).map_err(|err| SparqlError::Decode(err.to_string()))
    }
}

/// Endpoint transport used by the triplestore processors.
pub trait SparqlClient {
    fn select(&self, endpoint: &Url, query: &str) -> Result<SparqlResults, SparqlError>;
    fn update(&self, endpoint: &Url, update: &str) -> Result<(), SparqlError>;
}

/// Blocking HTTP client speaking the SPARQL 1.1 protocol (form-encoded POST).
#[derive(Debug, Clone)]
pub struct HttpSparqlClient {
    client: reqwest::blocking::Client,
}

impl HttpSparqlClient {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("tls backend and resolver must initialize");
        Self { client }
    }
}

impl Default for HttpSparqlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SparqlClient for HttpSparqlClient {
    fn select(&self, endpoint: &Url, query: &str) -> Result<SparqlResults, SparqlError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()?;
        let response = check_status(response)?;
        let body = response.text()?;
        SparqlResults::from_json(&body)
    }

    fn update(&self, endpoint: &Url, update: &str) -> Result<(), SparqlError> {
        let response = self
            .client
            .post(endpoint.clone())
            .form(&[("update", update)])
            .send()?;
        check_status(response)?;
        Ok(())
    }
}

fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, SparqlError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(SparqlError::Status {
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}
