#![allow(dead_code)]

use iiif_core::repo::fragment::columns;
use iiif_core::{
    BackendKind, Fragment, Processor, Query, QueryError, QueryKind, QueryProcessor, QueryResult,
    Row, SparqlClient, SparqlError, SparqlResults,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

pub const RELATIONAL_CAPABILITIES: &[QueryKind] = &[
    QueryKind::AllAnnotations,
    QueryKind::AllImages,
    QueryKind::AnnotationsWithBody,
    QueryKind::AnnotationsWithBodyAndTarget,
    QueryKind::AnnotationsWithTarget,
    QueryKind::EntityById,
    QueryKind::EntitiesById,
    QueryKind::EntitiesWithCreator,
    QueryKind::EntitiesWithTitle,
];

pub const TRIPLESTORE_CAPABILITIES: &[QueryKind] = &[
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

pub type CallLog = Rc<RefCell<Vec<QueryKind>>>;

/// In-memory backend answering from canned rows.
///
/// Identifier lookups (`EntityById`, `EntitiesById`) filter `records`; every
/// other query kind returns the rows registered with `answer`.
pub struct MockProcessor {
    backend: BackendKind,
    capabilities: &'static [QueryKind],
    location: Option<String>,
    answers: HashMap<QueryKind, Vec<Row>>,
    records: Vec<Row>,
    failing: bool,
    calls: CallLog,
}

impl MockProcessor {
    pub fn relational() -> Self {
        Self::new(BackendKind::Relational, RELATIONAL_CAPABILITIES)
    }

    pub fn triplestore() -> Self {
        Self::new(BackendKind::Triplestore, TRIPLESTORE_CAPABILITIES)
    }

    pub fn new(backend: BackendKind, capabilities: &'static [QueryKind]) -> Self {
        Self {
            backend,
            capabilities,
            location: None,
            answers: HashMap::new(),
            records: Vec::new(),
            failing: false,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn answer(mut self, kind: QueryKind, rows: Vec<Row>) -> Self {
        self.answers.entry(kind).or_default().extend(rows);
        self
    }

    pub fn record(mut self, row: Row) -> Self {
        self.records.push(row);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> CallLog {
        Rc::clone(&self.calls)
    }

    fn lookup(&self, ids: &[String]) -> Vec<Row> {
        self.records
            .iter()
            .filter(|row| row.id().is_some_and(|id| ids.iter().any(|wanted| wanted == id)))
            .cloned()
            .collect()
    }
}

impl Processor for MockProcessor {
    fn db_path_or_url(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn set_db_path_or_url(&mut self, location: &str) -> bool {
        if location.trim().is_empty() {
            return false;
        }
        self.location = Some(location.to_string());
        true
    }
}

impl QueryProcessor for MockProcessor {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn capabilities(&self) -> &'static [QueryKind] {
        self.capabilities
    }

    fn execute(&self, query: &Query) -> QueryResult<Fragment> {
        self.calls.borrow_mut().push(query.kind());
        if self.failing {
            return Err(QueryError::Sparql(SparqlError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            }));
        }

        let rows = match query {
            Query::EntityById { id } => self.lookup(std::slice::from_ref(id)),
            Query::EntitiesById { ids } => self.lookup(ids),
            other => self.answers.get(&other.kind()).cloned().unwrap_or_default(),
        };

        let mut fragment = Fragment::empty(self.backend);
        for row in rows {
            fragment.push(row);
        }
        Ok(fragment)
    }
}

/// Scripted SPARQL transport that records every request it receives.
#[derive(Clone, Default)]
pub struct ScriptedSparqlClient {
    responses: Rc<RefCell<Vec<Result<String, u16>>>>,
    pub selects: Rc<RefCell<Vec<String>>>,
    pub updates: Rc<RefCell<Vec<String>>>,
}

impl ScriptedSparqlClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one SELECT response body, decoded when the query is sent.
    pub fn respond(&self, body: &str) {
        self.responses.borrow_mut().push(Ok(body.to_string()));
    }

    /// Queues one HTTP failure.
    pub fn fail(&self, status: u16) {
        self.responses.borrow_mut().push(Err(status));
    }
}

impl SparqlClient for ScriptedSparqlClient {
    fn select(&self, _endpoint: &Url, query: &str) -> Result<SparqlResults, SparqlError> {
        self.selects.borrow_mut().push(query.to_string());
        let mut responses = self.responses.borrow_mut();
        if responses.is_empty() {
            return Ok(SparqlResults::default());
        }
        match responses.remove(0) {
            Ok(body) => SparqlResults::from_json(&body),
            Err(status) => Err(SparqlError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
        }
    }

    fn update(&self, _endpoint: &Url, update: &str) -> Result<(), SparqlError> {
        self.updates.borrow_mut().push(update.to_string());
        let mut responses = self.responses.borrow_mut();
        if let Some(Err(_)) = responses.first() {
            if let Err(status) = responses.remove(0) {
                return Err(SparqlError::Status {
                    status,
                    body: "scripted failure".to_string(),
                });
            }
        }
        Ok(())
    }
}

pub fn annotation_row(id: &str, body: &str, target: &str) -> Row {
    Row::new()
        .with(columns::ID, id)
        .with(columns::KIND, "annotation")
        .with(columns::BODY, body)
        .with(columns::TARGET, target)
}

pub fn metadata_row(id: &str, title: &str, creator: &str) -> Row {
    Row::new()
        .with(columns::ID, id)
        .with(columns::TITLE, title)
        .with(columns::CREATOR, creator)
}

pub fn structural_row(id: &str, kind: &str) -> Row {
    Row::new().with(columns::ID, id).with(columns::KIND, kind)
}
