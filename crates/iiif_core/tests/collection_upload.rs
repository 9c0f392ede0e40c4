mod common;

use common::ScriptedSparqlClient;
use iiif_core::{CollectionProcessor, IngestError, Processor, UploadHandler};
use std::path::PathBuf;

const ENDPOINT: &str = "http://127.0.0.1:9999/blazegraph/sparql";

const COLLECTION_JSON: &str = r#"{
    "@context": "http://iiif.io/api/presentation/3/context.json",
    "id": "https://example.org/iiif/collection/1",
    "type": "Collection",
    "label": {"it": ["Dante"], "en": ["Dante Collection"]},
    "items": [
        {
            "id": "https://example.org/iiif/manifest/7",
            "type": "Manifest",
            "label": {"none": ["Commedia"]},
            "items": [
                {"id": "https://example.org/iiif/canvas/1", "type": "Canvas", "label": {"none": ["1r"]}},
                {"id": "https://example.org/iiif/canvas/2", "type": "Canvas", "label": {"none": ["1v"]}}
            ]
        },
        {
            "id": "https://example.org/iiif/collection/2",
            "type": "Collection",
            "items": []
        }
    ]
}"#;

fn write_json(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("collection.json");
    std::fs::write(&path, content).unwrap();
    path
}

fn configured(client: &ScriptedSparqlClient) -> CollectionProcessor {
    let mut processor = CollectionProcessor::with_client(client.clone());
    assert!(processor.set_db_path_or_url(ENDPOINT));
    processor
}

#[test]
fn uploads_hierarchy_as_insert_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(&dir, COLLECTION_JSON);
    let client = ScriptedSparqlClient::new();
    let processor = configured(&client);

    assert_eq!(processor.try_upload_data(&path).unwrap(), 5);

    let updates = client.updates.borrow();
    assert_eq!(updates.len(), 1);
    let update = &updates[0];
    assert!(update.starts_with("PREFIX iiif: <http://iiif.io/api/presentation/3#>"));
    assert!(update.contains("INSERT DATA {"));
    assert!(update.contains("<https://example.org/iiif/collection/1> rdfs:label \"Dante Collection\" ."));
    assert!(update.contains(
        "<https://example.org/iiif/collection/1> fed:hasItem [ fed:item <https://example.org/iiif/collection/2> ; fed:position 1 ] ."
    ));
    assert!(update.contains("<https://example.org/iiif/canvas/2> a iiif:Canvas ; fed:sequence 3 ."));
}

#[test]
fn later_uploads_sequence_after_stored_entities() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(&dir, COLLECTION_JSON);
    let client = ScriptedSparqlClient::new();
    client.respond(
        r#"{"head": {"vars": ["last"]},
            "results": {"bindings": [{"last": {"type": "literal", "value": "4"}}]}}"#,
    );
    let processor = configured(&client);

    assert_eq!(processor.try_upload_data(&path).unwrap(), 5);

    let selects = client.selects.borrow();
    assert_eq!(selects.len(), 1);
    assert!(selects[0].contains("MAX(?sequence)"));

    let updates = client.updates.borrow();
    let update = &updates[0];
    assert!(update.contains("<https://example.org/iiif/collection/1> a iiif:Collection ; fed:sequence 5 ."));
    assert!(update.contains("<https://example.org/iiif/canvas/2> a iiif:Canvas ; fed:sequence 8 ."));
}

#[test]
fn upload_data_reports_failures_as_false() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedSparqlClient::new();
    let processor = configured(&client);

    let malformed = write_json(&dir, "{ not json");
    assert!(!processor.upload_data(&malformed));
    assert!(!processor.upload_data(&dir.path().join("missing.json")));
    assert!(client.updates.borrow().is_empty());
}

#[test]
fn endpoint_failure_surfaces_as_sparql_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(&dir, COLLECTION_JSON);
    let client = ScriptedSparqlClient::new();
    client.fail(500);
    let processor = configured(&client);

    let err = processor.try_upload_data(&path).unwrap_err();
    assert!(matches!(err, IngestError::Sparql(_)));
}

#[test]
fn unconfigured_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(&dir, COLLECTION_JSON);
    let processor = CollectionProcessor::with_client(ScriptedSparqlClient::new());

    assert_eq!(processor.db_path_or_url(), None);
    let err = processor.try_upload_data(&path).unwrap_err();
    assert!(matches!(err, IngestError::NotConfigured(_)));
}
