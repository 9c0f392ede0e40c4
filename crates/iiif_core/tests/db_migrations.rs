use iiif_core::db::migrations::latest_version;
use iiif_core::db::{open_db, DbError};
use rusqlite::Connection;

#[test]
fn open_db_applies_all_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("relational.db")).unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "annotations");
    assert_table_exists(&conn, "images");
    assert_table_exists(&conn, "entity_metadata");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relational.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO entity_metadata (id, title, creator) VALUES (?1, ?2, NULL);",
            ["manifest:7", "Commedia"],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let title: String = conn_second
        .query_row(
            "SELECT title FROM entity_metadata WHERE id = 'manifest:7';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(title, "Commedia");
}

#[test]
fn upgrades_database_created_at_first_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE annotations (id TEXT PRIMARY KEY, body TEXT, target TEXT, motivation TEXT);
         CREATE TABLE images (id TEXT PRIMARY KEY, canvas TEXT);
         PRAGMA user_version = 1;",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "entity_metadata");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
