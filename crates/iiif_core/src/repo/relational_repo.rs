//! Relational (SQLite) query processor.
//!
//! # Responsibility
//! - Answer annotation, image and descriptive-metadata queries.
//! - Map each query to one parameterized statement returning flat rows.
//!
//! # Invariants
//! - Result rows follow insertion order (`rowid`) of the store.
//! - NULL cells are left absent in the fragment.
//! - A fresh connection is opened per query; the processor only owns a path.

use crate::db::open_db;
use crate::repo::fragment::{BackendKind, Fragment, Row};
use crate::repo::location::parse_db_path;
use crate::repo::query::{Processor, Query, QueryError, QueryKind, QueryProcessor, QueryResult};
use log::debug;
use rusqlite::{params, params_from_iter, Connection, Params};
use std::path::PathBuf;
use std::time::Instant;

const CAPABILITIES: &[QueryKind] = &[
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

/// Keeps every batch well below SQLite's bound-parameter limit.
const MAX_IDS_PER_STATEMENT: usize = 500;

const ANNOTATION_SELECT_SQL: &str = "SELECT
    id,
    'annotation' AS kind,
    body,
    target,
    motivation
FROM annotations";

const IMAGE_SELECT_SQL: &str = "SELECT
    id,
    'image' AS kind,
    canvas
FROM images";

const METADATA_SELECT_SQL: &str = "SELECT
    id,
    title,
    creator
FROM entity_metadata";

/// SQLite-backed query processor for annotations, images and metadata.
#[derive(Debug, Clone, Default)]
pub struct RelationalQueryProcessor {
    location: Option<String>,
    db_path: Option<PathBuf>,
}

impl RelationalQueryProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn connect(&self) -> QueryResult<Connection> {
        let Some(path) = self.db_path.as_ref() else {
            return Err(QueryError::NotConfigured(BackendKind::Relational));
        };
        Ok(open_db(path)?)
    }
}

impl Processor for RelationalQueryProcessor {
    fn db_path_or_url(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn set_db_path_or_url(&mut self, location: &str) -> bool {
        match parse_db_path(location) {
            Some(path) => {
                self.location = Some(location.to_string());
                self.db_path = Some(path);
                true
            }
            None => false,
        }
    }
}

impl QueryProcessor for RelationalQueryProcessor {
    fn backend(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn capabilities(&self) -> &'static [QueryKind] {
        CAPABILITIES
    }

    fn execute(&self, query: &Query) -> QueryResult<Fragment> {
        let started_at = Instant::now();
        let conn = self.connect()?;

        let fragment = match query {
            Query::AllAnnotations => select_fragment(
                &conn,
                &format!("{ANNOTATION_SELECT_SQL} ORDER BY rowid;"),
                [],
            )?,
            Query::AllImages => {
                select_fragment(&conn, &format!("{IMAGE_SELECT_SQL} ORDER BY rowid;"), [])?
            }
            Query::AnnotationsWithBody { body } => select_fragment(
                &conn,
                &format!("{ANNOTATION_SELECT_SQL} WHERE body = ?1 ORDER BY rowid;"),
                params![body],
            )?,
            Query::AnnotationsWithBodyAndTarget { body, target } => select_fragment(
                &conn,
                &format!(
                    "{ANNOTATION_SELECT_SQL}
                     WHERE body = ?1
                       AND {}
                     ORDER BY rowid;",
                    target_match_sql(2)
                ),
                params![body, target],
            )?,
            Query::AnnotationsWithTarget { target } => select_fragment(
                &conn,
                &format!(
                    "{ANNOTATION_SELECT_SQL} WHERE {} ORDER BY rowid;",
                    target_match_sql(1)
                ),
                params![target],
            )?,
            Query::EntityById { id } => select_entities_by_id(&conn, std::slice::from_ref(id))?,
            Query::EntitiesById { ids } => select_entities_by_id(&conn, ids)?,
            Query::EntitiesWithCreator { creator } => select_fragment(
                &conn,
                &format!(
                    "{METADATA_SELECT_SQL}
                     WHERE creator = ?1
                        OR instr('; ' || creator || '; ', '; ' || ?1 || '; ') > 0
                     ORDER BY rowid;"
                ),
                params![creator],
            )?,
            Query::EntitiesWithTitle { title } => select_fragment(
                &conn,
                &format!("{METADATA_SELECT_SQL} WHERE title = ?1 ORDER BY rowid;"),
                params![title],
            )?,
            _ => Fragment::empty(BackendKind::Relational),
        };

        debug!(
            "event=query_execute module=repo backend=relational query={} rows={} duration_ms={}",
            query.kind().as_str(),
            fragment.len(),
            started_at.elapsed().as_millis()
        );
        Ok(fragment)
    }
}

/// Exact target, or a media-fragment region (`target#...`) of it.
fn target_match_sql(param: usize) -> String {
    format!(
        "(target = ?{param} OR substr(target, 1, length(?{param}) + 1) = ?{param} || '#')"
    )
}

fn select_entities_by_id(conn: &Connection, ids: &[String]) -> QueryResult<Fragment> {
    let mut merged: Option<Fragment> = None;

    for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
        let placeholders = (1..=chunk.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, 'annotation' AS kind, body, target, motivation,
                    NULL AS canvas, NULL AS title, NULL AS creator
             FROM annotations WHERE id IN ({placeholders})
             UNION ALL
             SELECT id, 'image', NULL, NULL, NULL, canvas, NULL, NULL
             FROM images WHERE id IN ({placeholders})
             UNION ALL
             SELECT id, NULL, NULL, NULL, NULL, NULL, title, creator
             FROM entity_metadata WHERE id IN ({placeholders});"
        );
        let fragment = select_fragment(conn, &sql, params_from_iter(chunk.iter()))?;

        match merged.as_mut() {
            Some(existing) => {
                for row in fragment.rows() {
                    existing.push(row.clone());
                }
            }
            None => merged = Some(fragment),
        }
    }

    Ok(merged.unwrap_or_else(|| Fragment::empty(BackendKind::Relational)))
}

fn select_fragment<P: Params>(conn: &Connection, sql: &str, params: P) -> QueryResult<Fragment> {
    let mut stmt = conn.prepare(sql)?;
    let columns = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut fragment = Fragment::new(BackendKind::Relational, columns.clone());
    let mut rows = stmt.query(params)?;
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (index, column) in columns.iter().enumerate() {
            record.set(column, row.get::<_, Option<String>>(index)?);
        }
        fragment.push(record);
    }

    Ok(fragment)
}
