//! CSV upload into the relational store.
//!
//! # Responsibility
//! - `AnnotationProcessor`: load `id,body,target,motivation` rows and derive
//!   one image row per annotation body.
//! - `MetadataProcessor`: load `id,title,creator` rows.
//!
//! # Invariants
//! - One upload runs in one transaction; a malformed file writes nothing.
//! - Rows are upserted by `id`; an image keeps the canvas of the first
//!   annotation that introduced it.
//! - Rows with a blank `id` are skipped.

use crate::db::open_db;
use crate::ingest::{normalize_cell, IngestError, IngestResult, UploadHandler};
use crate::repo::fragment::BackendKind;
use crate::repo::location::parse_db_path;
use crate::repo::query::Processor;
use log::warn;
use rusqlite::{params, Connection};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnnotationRecord {
    id: Option<String>,
    body: Option<String>,
    target: Option<String>,
    motivation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataRecord {
    id: Option<String>,
    title: Option<String>,
    creator: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct DbLocation {
    location: Option<String>,
    path: Option<PathBuf>,
}

impl DbLocation {
    fn set(&mut self, location: &str) -> bool {
        match parse_db_path(location) {
            Some(path) => {
                self.location = Some(location.to_string());
                self.path = Some(path);
                true
            }
            None => false,
        }
    }

    fn connect(&self) -> IngestResult<Connection> {
        let Some(path) = self.path.as_ref() else {
            return Err(IngestError::NotConfigured(BackendKind::Relational));
        };
        Ok(open_db(path)?)
    }
}

/// Uploads annotation CSV files.
#[derive(Debug, Clone, Default)]
pub struct AnnotationProcessor {
    db: DbLocation,
}

impl AnnotationProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Processor for AnnotationProcessor {
    fn db_path_or_url(&self) -> Option<&str> {
        self.db.location.as_deref()
    }

    fn set_db_path_or_url(&mut self, location: &str) -> bool {
        self.db.set(location)
    }
}

impl UploadHandler for AnnotationProcessor {
    fn handler_name(&self) -> &'static str {
        "annotations"
    }

    fn try_upload_data(&self, path: &Path) -> IngestResult<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut records = Vec::new();
        for record in reader.deserialize::<AnnotationRecord>() {
            records.push(record?);
        }

        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        let mut skipped = 0;
        {
            let mut upsert_annotation = tx.prepare(
                "INSERT INTO annotations (id, body, target, motivation)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    body = excluded.body,
                    target = excluded.target,
                    motivation = excluded.motivation;",
            )?;
            let mut insert_image = tx.prepare(
                "INSERT INTO images (id, canvas)
                 VALUES (?1, ?2)
                 ON CONFLICT(id) DO NOTHING;",
            )?;

            for record in records {
                let Some(id) = normalize_cell(record.id) else {
                    skipped += 1;
                    continue;
                };
                let body = normalize_cell(record.body);
                let target = normalize_cell(record.target);
                let motivation = normalize_cell(record.motivation);

                upsert_annotation.execute(params![id, body, target, motivation])?;
                if let Some(image) = body.as_deref() {
                    insert_image.execute(params![image, target])?;
                }
                written += 1;
            }
        }
        tx.commit()?;

        if skipped > 0 {
            warn!(
                "event=upload_skip module=ingest handler=annotations reason=blank_id rows={skipped}"
            );
        }
        Ok(written)
    }
}

/// Uploads descriptive-metadata CSV files.
#[derive(Debug, Clone, Default)]
pub struct MetadataProcessor {
    db: DbLocation,
}

impl MetadataProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Processor for MetadataProcessor {
    fn db_path_or_url(&self) -> Option<&str> {
        self.db.location.as_deref()
    }

    fn set_db_path_or_url(&mut self, location: &str) -> bool {
        self.db.set(location)
    }
}

impl UploadHandler for MetadataProcessor {
    fn handler_name(&self) -> &'static str {
        "metadata"
    }

    fn try_upload_data(&self, path: &Path) -> IngestResult<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut records = Vec::new();
        for record in reader.deserialize::<MetadataRecord>() {
            records.push(record?);
        }

        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        let mut skipped = 0;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO entity_metadata (id, title, creator)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    creator = excluded.creator;",
            )?;

            for record in records {
                let Some(id) = normalize_cell(record.id) else {
                    skipped += 1;
                    continue;
                };
                upsert.execute(params![
                    id,
                    normalize_cell(record.title),
                    normalize_cell(record.creator)
                ])?;
                written += 1;
            }
        }
        tx.commit()?;

        if skipped > 0 {
            warn!("event=upload_skip module=ingest handler=metadata reason=blank_id rows={skipped}");
        }
        Ok(written)
    }
}
