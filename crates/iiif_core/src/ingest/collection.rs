//! IIIF collection JSON upload into the triplestore.
//!
//! # Responsibility
//! - Walk a IIIF Presentation document (v3 `items`, or v2
//!   `collections`/`manifests`/`members`/`sequences`) depth-first.
//! - Emit typed, labelled entities and ordered membership as `INSERT DATA`.
//!
//! # Invariants
//! - Each membership is one self-contained statement, so batches never split
//!   a blank node across requests.
//! - Entity `fed:sequence` values follow document order and continue after
//!   the highest sequence already stored, so later uploads sort after
//!   earlier ones.
//! - Canvas content (annotation pages) is not descended into.

use crate::ingest::{IngestError, IngestResult, UploadHandler};
use crate::model::entity::EntityKind;
use crate::repo::fragment::BackendKind;
use crate::repo::location::parse_sparql_endpoint;
use crate::repo::query::Processor;
use crate::repo::sparql::{iri, literal, prefixes, HttpSparqlClient, SparqlClient, SparqlResults};
use crate::repo::triplestore_repo::type_name;
use log::debug;
use serde_json::Value;
use std::path::Path;
use url::Url;

const MAX_STATEMENTS_PER_UPDATE: usize = 500;
const CHILD_KEYS: &[&str] = &["items", "collections", "manifests", "members"];
const PREFERRED_LANGUAGES: &[&str] = &["none", "en"];

/// Uploads IIIF collection documents to a SPARQL endpoint.
pub struct CollectionProcessor {
    location: Option<String>,
    endpoint: Option<Url>,
    client: Box<dyn SparqlClient>,
}

impl CollectionProcessor {
    pub fn new() -> Self {
        Self::with_client(HttpSparqlClient::new())
    }

    pub fn with_client(client: impl SparqlClient + 'static) -> Self {
        Self {
            location: None,
            endpoint: None,
            client: Box::new(client),
        }
    }
}

impl Default for CollectionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for CollectionProcessor {
    fn db_path_or_url(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn set_db_path_or_url(&mut self, location: &str) -> bool {
        match parse_sparql_endpoint(location) {
            Some(endpoint) => {
                self.location = Some(location.to_string());
                self.endpoint = Some(endpoint);
                true
            }
            None => false,
        }
    }
}

impl UploadHandler for CollectionProcessor {
    fn handler_name(&self) -> &'static str {
        "collection"
    }

    fn try_upload_data(&self, path: &Path) -> IngestResult<usize> {
        let Some(endpoint) = self.endpoint.as_ref() else {
            return Err(IngestError::NotConfigured(BackendKind::Triplestore));
        };

        let document: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let stored = self.client.select(endpoint, &last_sequence_query())?;
        let first_sequence = next_sequence(&stored)?;
        let statements = document_statements(&document, first_sequence)?;

        let batches = statements.statements.chunks(MAX_STATEMENTS_PER_UPDATE);
        for (batch_index, batch) in batches.enumerate() {
            let update = format!("{}INSERT DATA {{\n{}\n}}", prefixes(), batch.join("\n"));
            self.client.update(endpoint, &update)?;
            debug!(
                "event=upload_batch module=ingest handler=collection batch={} statements={}",
                batch_index,
                batch.len()
            );
        }

        Ok(statements.entities)
    }
}

fn last_sequence_query() -> String {
    format!(
        "{}SELECT (MAX(?sequence) AS ?last) WHERE {{ ?entity fed:sequence ?sequence }}",
        prefixes()
    )
}

/// First free sequence number, given the `MAX` aggregate over stored ones.
fn next_sequence(results: &SparqlResults) -> IngestResult<u64> {
    let last = results
        .results
        .bindings
        .first()
        .and_then(|binding| binding.get("last"));
    match last {
        None => Ok(0),
        Some(term) => term
            .value
            .trim()
            .parse::<u64>()
            .map(|last| last + 1)
            .map_err(|_| {
                IngestError::InvalidData(format!(
                    "stored sequence is not a number: {}",
                    term.value
                ))
            }),
    }
}

/// Triple statements produced from one document.
#[derive(Debug, Default)]
pub(crate) struct DocumentStatements {
    pub(crate) statements: Vec<String>,
    pub(crate) entities: usize,
    first_sequence: u64,
}

pub(crate) fn document_statements(
    document: &Value,
    first_sequence: u64,
) -> IngestResult<DocumentStatements> {
    let mut walk = DocumentStatements {
        first_sequence,
        ..DocumentStatements::default()
    };
    match document {
        Value::Array(nodes) => {
            for node in nodes {
                visit(node, None, 0, &mut walk)?;
            }
        }
        node => visit(node, None, 0, &mut walk)?,
    }

    if walk.entities == 0 {
        return Err(IngestError::InvalidData(
            "document contains no collection, manifest or canvas".to_string(),
        ));
    }
    Ok(walk)
}

fn visit(
    node: &Value,
    parent: Option<&str>,
    position: usize,
    walk: &mut DocumentStatements,
) -> IngestResult<()> {
    let Some(kind) = node_kind(node) else {
        return Ok(());
    };
    let raw_id = node_id(node)
        .ok_or_else(|| IngestError::InvalidData(format!("{} without id", kind.as_str())))?;
    let subject = iri(raw_id)
        .ok_or_else(|| IngestError::InvalidData(format!("identifier is not an IRI: {raw_id}")))?;

    walk.statements.push(format!(
        "{subject} a iiif:{} ; fed:sequence {} .",
        type_name(kind),
        walk.first_sequence + walk.entities as u64
    ));
    walk.entities += 1;

    if let Some(label) = node.get("label").and_then(label_text) {
        walk.statements
            .push(format!("{subject} rdfs:label {} .", literal(&label)));
    }
    if let Some(parent) = parent {
        walk.statements.push(format!(
            "{parent} fed:hasItem [ fed:item {subject} ; fed:position {position} ] ."
        ));
    }

    if kind == EntityKind::Canvas {
        return Ok(());
    }

    let mut child_position = 0;
    for child in children(node) {
        if node_kind(child).is_some() {
            visit(child, Some(&subject), child_position, walk)?;
            child_position += 1;
        }
    }
    Ok(())
}

fn children(node: &Value) -> Vec<&Value> {
    let mut found = Vec::new();
    for key in CHILD_KEYS {
        if let Some(Value::Array(values)) = node.get(*key) {
            found.extend(values.iter());
        }
    }
    if let Some(Value::Array(sequences)) = node.get("sequences") {
        for sequence in sequences {
            if let Some(Value::Array(canvases)) = sequence.get("canvases") {
                found.extend(canvases.iter());
            }
        }
    }
    found
}

fn node_id(node: &Value) -> Option<&str> {
    node.get("id")
        .or_else(|| node.get("@id"))
        .and_then(Value::as_str)
}

fn node_kind(node: &Value) -> Option<EntityKind> {
    let raw = node
        .get("type")
        .or_else(|| node.get("@type"))
        .and_then(Value::as_str)?;
    let local = raw.rsplit(':').next().unwrap_or(raw);
    match local {
        "Collection" => Some(EntityKind::Collection),
        "Manifest" => Some(EntityKind::Manifest),
        "Canvas" => Some(EntityKind::Canvas),
        _ => None,
    }
}

/// Extracts display text from v2 strings/value objects or v3 language maps.
fn label_text(label: &Value) -> Option<String> {
    let text = match label {
        Value::String(text) => Some(text.clone()),
        Value::Array(values) => values.iter().find_map(label_text),
        Value::Object(map) => {
            if let Some(value) = map.get("@value") {
                label_text(value)
            } else {
                PREFERRED_LANGUAGES
                    .iter()
                    .find_map(|language| map.get(*language))
                    .or_else(|| map.values().next())
                    .and_then(label_text)
            }
        }
        _ => None,
    };
    text.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
