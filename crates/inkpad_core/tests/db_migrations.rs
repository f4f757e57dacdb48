use inkpad_core::db::migrations::latest_version;
use inkpad_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn in_memory_database_has_document_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_eq!(latest_version(), 2);
    assert_table_exists(&conn, "documents");
    assert_column_exists(&conn, "documents", "revision");
}

#[test]
fn reopening_a_file_does_not_rerun_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inkpad.sqlite3");

    let first = open_db(&path).unwrap();
    first
        .execute(
            "INSERT INTO documents (uuid, kind, content) VALUES ('a', 'note', '{}');",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn version_one_database_is_upgraded_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_documents.sql"))
        .unwrap();
    conn.execute_batch(
        "INSERT INTO documents (uuid, kind, content) VALUES ('legacy', 'canvas', '{}');
         PRAGMA user_version = 1;",
    )
    .unwrap();
    drop(conn);

    let upgraded = open_db(&path).unwrap();
    assert_eq!(schema_version(&upgraded), latest_version());
    let revision: i64 = upgraded
        .query_row(
            "SELECT revision FROM documents WHERE uuid = 'legacy';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(revision, 0);
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

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

#[test]
fn unknown_kind_is_rejected_by_schema() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO documents (uuid, kind, content) VALUES ('x', 'sheet', '{}');",
        [],
    );
    assert!(result.is_err());
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

fn assert_column_exists(conn: &Connection, table_name: &str, column: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2);",
            [table_name, column],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "column {table_name}.{column} does not exist");
}
