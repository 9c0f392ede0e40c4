use iiif_core::repo::fragment::columns;
use iiif_core::{
    AnnotationProcessor, BackendKind, MetadataProcessor, Processor, QueryError, QueryProcessor,
    RelationalQueryProcessor, UploadHandler,
};
use std::path::{Path, PathBuf};

const ANNOTATIONS_CSV: &str = "\
id,body,target,motivation
https://example.org/annotation/1,https://example.org/image/5,https://example.org/canvas/1,painting
https://example.org/annotation/2,https://example.org/image/6,\"https://example.org/canvas/1#xywh=0,0,10,10\",supplementing
https://example.org/annotation/3,https://example.org/image/7,https://example.org/canvas/10,painting
,https://example.org/image/8,https://example.org/canvas/2,painting
";

const METADATA_CSV: &str = "\
id,title,creator
https://example.org/manifest/7,Commedia,\"Alighieri, Dante; Boccaccio, Giovanni\"
https://example.org/manifest/8,Canzoniere,\"Petrarca, Francesco\"
https://example.org/canvas/1,,
";

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn loaded_store(dir: &Path) -> String {
    let db = dir.join("relational.db");
    let db = db.to_str().unwrap().to_string();

    let mut annotations = AnnotationProcessor::new();
    assert!(annotations.set_db_path_or_url(&db));
    assert!(annotations.upload_data(&write_file(dir, "annotations.csv", ANNOTATIONS_CSV)));

    let mut metadata = MetadataProcessor::new();
    assert!(metadata.set_db_path_or_url(&db));
    assert!(metadata.upload_data(&write_file(dir, "metadata.csv", METADATA_CSV)));

    db
}

fn processor(db: &str) -> RelationalQueryProcessor {
    let mut processor = RelationalQueryProcessor::new();
    assert!(processor.set_db_path_or_url(db));
    processor
}

fn ids(fragment: &iiif_core::Fragment) -> Vec<&str> {
    fragment.rows().iter().filter_map(|row| row.id()).collect()
}

#[test]
fn uploads_skip_blank_ids_and_derive_images() {
    let dir = tempfile::tempdir().unwrap();
    let db = loaded_store(dir.path());
    let processor = processor(&db);

    let annotations = processor.get_all_annotations().unwrap();
    assert_eq!(annotations.source(), BackendKind::Relational);
    assert_eq!(annotations.len(), 3);
    assert_eq!(
        annotations.rows()[0].get(columns::MOTIVATION),
        Some("painting")
    );

    let images = processor.get_all_images().unwrap();
    assert_eq!(
        ids(&images),
        vec![
            "https://example.org/image/5",
            "https://example.org/image/6",
            "https://example.org/image/7"
        ]
    );
    assert_eq!(
        images.rows()[0].get(columns::CANVAS),
        Some("https://example.org/canvas/1")
    );
}

#[test]
fn reuploading_the_same_file_does_not_duplicate_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = loaded_store(dir.path());

    let mut annotations = AnnotationProcessor::new();
    assert!(annotations.set_db_path_or_url(&db));
    let csv = write_file(dir.path(), "again.csv", ANNOTATIONS_CSV);
    assert_eq!(annotations.try_upload_data(&csv).unwrap(), 3);

    let processor = processor(&db);
    assert_eq!(processor.get_all_annotations().unwrap().len(), 3);
    assert_eq!(processor.get_all_images().unwrap().len(), 3);
}

#[test]
fn target_matching_includes_media_fragment_regions() {
    let dir = tempfile::tempdir().unwrap();
    let db = loaded_store(dir.path());
    let processor = processor(&db);

    let fragment = processor
        .get_annotations_with_target("https://example.org/canvas/1")
        .unwrap();
    assert_eq!(
        ids(&fragment),
        vec![
            "https://example.org/annotation/1",
            "https://example.org/annotation/2"
        ]
    );

    let by_body_and_target = processor
        .get_annotations_with_body_and_target(
            "https://example.org/image/6",
            "https://example.org/canvas/1",
        )
        .unwrap();
    assert_eq!(ids(&by_body_and_target), vec!["https://example.org/annotation/2"]);

    let by_body = processor
        .get_annotations_with_body("https://example.org/image/7")
        .unwrap();
    assert_eq!(ids(&by_body), vec!["https://example.org/annotation/3"]);
}

#[test]
fn creator_matches_whole_cell_or_single_creator() {
    let dir = tempfile::tempdir().unwrap();
    let db = loaded_store(dir.path());
    let processor = processor(&db);

    let single = processor.get_entities_with_creator("Alighieri, Dante").unwrap();
    assert_eq!(ids(&single), vec!["https://example.org/manifest/7"]);

    let whole = processor
        .get_entities_with_creator("Alighieri, Dante; Boccaccio, Giovanni")
        .unwrap();
    assert_eq!(ids(&whole), vec!["https://example.org/manifest/7"]);

    assert!(processor
        .get_entities_with_creator("Alighieri")
        .unwrap()
        .is_empty());

    let titled = processor.get_entities_with_title("Canzoniere").unwrap();
    assert_eq!(ids(&titled), vec!["https://example.org/manifest/8"]);
}

#[test]
fn entity_lookup_spans_every_table() {
    let dir = tempfile::tempdir().unwrap();
    let db = loaded_store(dir.path());
    let processor = processor(&db);

    let annotation = processor
        .get_entity_by_id("https://example.org/annotation/1")
        .unwrap();
    assert_eq!(annotation.len(), 1);
    assert_eq!(annotation.rows()[0].get(columns::KIND), Some("annotation"));

    let metadata_only = processor
        .get_entity_by_id("https://example.org/canvas/1")
        .unwrap();
    assert_eq!(metadata_only.len(), 1);
    assert_eq!(metadata_only.rows()[0].get(columns::TITLE), None);
    assert_eq!(metadata_only.rows()[0].get(columns::KIND), None);

    assert!(processor
        .get_entity_by_id("just_a_test")
        .unwrap()
        .is_empty());
}

#[test]
fn structural_queries_are_unsupported_and_empty() {
    let dir = tempfile::tempdir().unwrap();
    let db = loaded_store(dir.path());
    let processor = processor(&db);

    assert!(processor.get_all_manifests().unwrap().is_empty());
    assert!(processor
        .get_canvases_in_manifest("https://example.org/manifest/7")
        .unwrap()
        .is_empty());
    assert!(processor.get_entities_with_label("Commedia").unwrap().is_empty());
}

#[test]
fn malformed_locations_fail_softly_and_keep_previous_location() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("relational.db");
    let db = db.to_str().unwrap();

    let mut processor = RelationalQueryProcessor::new();
    assert_eq!(processor.db_path_or_url(), None);
    assert!(processor.set_db_path_or_url(db));
    assert!(processor.set_db_path_or_url(db));
    assert!(!processor.set_db_path_or_url(""));
    assert!(!processor.set_db_path_or_url("http://127.0.0.1:9999/blazegraph/sparql"));
    assert_eq!(processor.db_path_or_url(), Some(db));
}

#[test]
fn unconfigured_processor_reports_configuration_error() {
    let processor = RelationalQueryProcessor::new();
    let err = processor.get_all_annotations().unwrap_err();
    assert!(matches!(
        err,
        QueryError::NotConfigured(BackendKind::Relational)
    ));

    let upload = AnnotationProcessor::new();
    assert!(!upload.upload_data(Path::new("missing.csv")));
}
