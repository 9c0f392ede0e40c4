//! Triplestore (SPARQL) query processor.
//!
//! # Responsibility
//! - Answer structural queries over collections, manifests and canvases.
//! - Translate SPARQL binding sets into the canonical fragment columns.
//!
//! # Invariants
//! - Every query selects the same variables, so every fragment has the same
//!   shape: one row per (entity, parent, child) combination.
//! - Identifiers that are not valid IRIs cannot exist in the store; they
//!   yield an empty fragment without contacting the endpoint.
//! - Result order is ingestion sequence, then identifier, then member position.

use crate::model::entity::EntityKind;
use crate::repo::fragment::{columns, BackendKind, Fragment, Row};
use crate::repo::location::parse_sparql_endpoint;
use crate::repo::query::{Processor, Query, QueryError, QueryKind, QueryProcessor, QueryResult};
use crate::repo::sparql::{
    iri, literal, prefixes, HttpSparqlClient, SparqlClient, SparqlResults, SparqlTerm,
};
use log::debug;
use std::collections::BTreeMap;
use std::time::Instant;
use url::Url;

const CAPABILITIES: &[QueryKind] = &[
    QueryKind::AllCanvases,
    QueryKind::AllCollections,
    QueryKind::AllManifests,
    QueryKind::CanvasesInCollection,
    QueryKind::CanvasesInManifest,
    QueryKind::ManifestsInCollection,
    QueryKind::EntityById,
    QueryKind::EntitiesById,
    QueryKind::EntitiesWithLabel,
];

const STRUCTURAL_KINDS: &[EntityKind] = &[
    EntityKind::Collection,
    EntityKind::Manifest,
    EntityKind::Canvas,
];

const MAX_IDS_PER_QUERY: usize = 200;

const FRAGMENT_COLUMNS: &[&str] = &[
    columns::ID,
    columns::KIND,
    columns::LABEL,
    columns::MANIFEST,
    columns::COLLECTION,
    columns::CANVASES,
    columns::MANIFESTS,
    columns::COLLECTIONS,
];

/// SPARQL-backed query processor for the collection hierarchy.
pub struct TriplestoreQueryProcessor {
    location: Option<String>,
    endpoint: Option<Url>,
    client: Box<dyn SparqlClient>,
}

impl TriplestoreQueryProcessor {
    /// Creates a processor using the blocking HTTP client.
    pub fn new() -> Self {
        Self::with_client(HttpSparqlClient::new())
    }

    /// Creates a processor using a caller-provided transport.
    pub fn with_client(client: impl SparqlClient + 'static) -> Self {
        Self {
            location: None,
            endpoint: None,
            client: Box::new(client),
        }
    }

    fn endpoint(&self) -> QueryResult<&Url> {
        self.endpoint
            .as_ref()
            .ok_or(QueryError::NotConfigured(BackendKind::Triplestore))
    }

    fn select(&self, sparql: &str) -> QueryResult<Fragment> {
        let endpoint = self.endpoint()?;
        let results = self.client.select(endpoint, sparql)?;
        Ok(fragment_from_results(&results))
    }

    fn select_scoped(&self, scope: Option<String>, kinds: &[EntityKind]) -> QueryResult<Fragment> {
        match scope {
            Some(scope) => self.select(&entity_query(&scope, kinds)),
            None => {
                debug!("event=query_skip module=repo backend=triplestore reason=invalid_iri");
                Ok(empty_fragment())
            }
        }
    }

    fn select_by_ids(&self, ids: &[String]) -> QueryResult<Fragment> {
        let iris = ids.iter().filter_map(|id| iri(id)).collect::<Vec<_>>();
        if iris.is_empty() {
            return Ok(empty_fragment());
        }

        let mut fragment = empty_fragment();
        for chunk in iris.chunks(MAX_IDS_PER_QUERY) {
            let scope = format!("VALUES ?id {{ {} }}", chunk.join(" "));
            let part = self.select(&entity_query(&scope, STRUCTURAL_KINDS))?;
            for row in part.rows() {
                fragment.push(row.clone());
            }
        }
        Ok(fragment)
    }
}

impl Default for TriplestoreQueryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for TriplestoreQueryProcessor {
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

impl QueryProcessor for TriplestoreQueryProcessor {
    fn backend(&self) -> BackendKind {
        BackendKind::Triplestore
    }

    fn capabilities(&self) -> &'static [QueryKind] {
        CAPABILITIES
    }

    fn execute(&self, query: &Query) -> QueryResult<Fragment> {
        let started_at = Instant::now();
        self.endpoint()?;

        let fragment = match query {
            Query::AllCanvases => self.select(&entity_query("", &[EntityKind::Canvas]))?,
            Query::AllManifests => self.select(&entity_query("", &[EntityKind::Manifest]))?,
            Query::AllCollections => self.select(&entity_query("", &[EntityKind::Collection]))?,
            Query::CanvasesInManifest { manifest } => self.select_scoped(
                iri(manifest).map(|parent| {
                    format!("{parent} a iiif:Manifest ; fed:hasItem/fed:item ?id .")
                }),
                &[EntityKind::Canvas],
            )?,
            Query::CanvasesInCollection { collection } => self.select_scoped(
                iri(collection).map(|parent| {
                    format!("{parent} a iiif:Collection ; (fed:hasItem/fed:item)+ ?id .")
                }),
                &[EntityKind::Canvas],
            )?,
            Query::ManifestsInCollection { collection } => self.select_scoped(
                iri(collection).map(|parent| {
                    format!("{parent} a iiif:Collection ; (fed:hasItem/fed:item)+ ?id .")
                }),
                &[EntityKind::Manifest],
            )?,
            Query::EntityById { id } => self.select_by_ids(std::slice::from_ref(id))?,
            Query::EntitiesById { ids } => self.select_by_ids(ids)?,
            Query::EntitiesWithLabel { label } => self.select(&entity_query(
                &format!(
                    "?id rdfs:label ?matchedLabel .\n  FILTER(STR(?matchedLabel) = {})",
                    literal(label)
                ),
                STRUCTURAL_KINDS,
            ))?,
            _ => empty_fragment(),
        };

        debug!(
            "event=query_execute module=repo backend=triplestore query={} rows={} duration_ms={}",
            query.kind().as_str(),
            fragment.len(),
            started_at.elapsed().as_millis()
        );
        Ok(fragment)
    }
}

fn empty_fragment() -> Fragment {
    Fragment::new(
        BackendKind::Triplestore,
        FRAGMENT_COLUMNS.iter().map(|column| column.to_string()).collect(),
    )
}

fn kind_values(kinds: &[EntityKind]) -> String {
    kinds
        .iter()
        .map(|kind| format!("(iiif:{} \"{}\")", type_name(*kind), kind.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Local name of the RDF class for a structural kind.
pub(crate) fn type_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Collection => "Collection",
        EntityKind::Manifest => "Manifest",
        EntityKind::Canvas => "Canvas",
        EntityKind::Image => "Image",
        EntityKind::Annotation => "Annotation",
    }
}

fn entity_query(scope: &str, kinds: &[EntityKind]) -> String {
    format!(
        "{prefixes}SELECT ?id ?kind ?label ?parent ?parentKind ?child ?childKind
WHERE {{
  {scope}
  VALUES (?type ?kind) {{ {kinds} }}
  ?id a ?type .
  OPTIONAL {{ ?id fed:sequence ?sequence }}
  OPTIONAL {{ ?id rdfs:label ?label }}
  OPTIONAL {{
    ?parent fed:hasItem ?parentMembership .
    ?parentMembership fed:item ?id .
    ?parent a ?parentType .
    VALUES (?parentType ?parentKind) {{ {parent_kinds} }}
  }}
  OPTIONAL {{
    ?id fed:hasItem ?childMembership .
    ?childMembership fed:item ?child ;
                     fed:position ?position .
    ?child a ?childType .
    VALUES (?childType ?childKind) {{ {child_kinds} }}
  }}
}}
ORDER BY ?sequence ?id ?position",
        prefixes = prefixes(),
        kinds = kind_values(kinds),
        parent_kinds = kind_values(&[EntityKind::Collection, EntityKind::Manifest]),
        child_kinds = kind_values(STRUCTURAL_KINDS),
    )
}

fn fragment_from_results(results: &SparqlResults) -> Fragment {
    let mut fragment = empty_fragment();
    for binding in &results.results.bindings {
        fragment.push(row_from_binding(binding));
    }
    fragment
}

fn row_from_binding(binding: &BTreeMap<String, SparqlTerm>) -> Row {
    let value = |name: &str| binding.get(name).map(|term| term.value.clone());

    let mut row = Row::new();
    row.set(columns::ID, value("id"));
    row.set(columns::KIND, value("kind"));
    row.set(columns::LABEL, value("label"));

    let parent_column = match value("parentKind").as_deref().and_then(EntityKind::parse) {
        Some(EntityKind::Manifest) => Some(columns::MANIFEST),
        Some(EntityKind::Collection) => Some(columns::COLLECTION),
        _ => None,
    };
    if let Some(column) = parent_column {
        row.set(column, value("parent"));
    }

    let child_column = match value("childKind").as_deref().and_then(EntityKind::parse) {
        Some(EntityKind::Canvas) => Some(columns::CANVASES),
        Some(EntityKind::Manifest) => Some(columns::MANIFESTS),
        Some(EntityKind::Collection) => Some(columns::COLLECTIONS),
        _ => None,
    };
    if let Some(column) = child_column {
        row.set(column, value("child"));
    }

    row
}

#[cfg(test)]
mod tests {
    use super::{entity_query, fragment_from_results};
    use crate::model::entity::EntityKind;
    use crate::repo::fragment::columns;
    use crate::repo::sparql::SparqlResults;

    #[test]
    fn entity_query_restricts_kinds_and_orders_members() {
        let query = entity_query("", &[EntityKind::Canvas]);
        assert!(query.contains("VALUES (?type ?kind) { (iiif:Canvas \"canvas\") }"));
        assert!(query.contains("ORDER BY ?sequence ?id ?position"));
        assert!(query.starts_with("PREFIX iiif:"));
    }

    #[test]
    fn bindings_map_parent_and_child_into_canonical_columns() {
        let results = SparqlResults::from_json(
            r#"{
                "head": {"vars": ["id", "kind", "label", "parent", "parentKind", "child", "childKind"]},
                "results": {"bindings": [
                    {"id": {"type": "uri", "value": "manifest:7"},
                     "kind": {"type": "literal", "value": "manifest"},
                     "parent": {"type": "uri", "value": "coll:2"},
                     "parentKind": {"type": "literal", "value": "collection"},
                     "child": {"type": "uri", "value": "canvas:1"},
                     "childKind": {"type": "literal", "value": "canvas"}}
                ]}
            }"#,
        )
        .unwrap();

        let fragment = fragment_from_results(&results);
        let row = &fragment.rows()[0];
        assert_eq!(row.get(columns::ID), Some("manifest:7"));
        assert_eq!(row.get(columns::COLLECTION), Some("coll:2"));
        assert_eq!(row.get(columns::CANVASES), Some("canvas:1"));
        assert_eq!(row.get(columns::MANIFEST), None);
        assert_eq!(row.get(columns::LABEL), None);
    }
}
