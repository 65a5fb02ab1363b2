use estate_core::db::migrations::latest_version;
use estate_core::db::{open_db, open_db_in_memory, Database, DbError};
use estate_core::{RepoError, SqliteLocationRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "locations");
    assert_table_exists(&conn, "properties");
    assert_table_exists(&conn, "location_property_refs");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("estate.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "locations");
}

#[test]
fn file_databases_use_wal_and_enforce_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("estate.sqlite3")).unwrap();

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
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
fn database_handle_migrates_once_and_hands_out_ready_connections() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::init(dir.path().join("estate.sqlite3")).unwrap();

    let conn = db.connect().unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert!(SqliteLocationRepository::try_new(&conn).is_ok());
}

#[test]
fn database_connect_rejects_unmigrated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("estate.sqlite3");
    let db = Database::init(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    let _ = std::fs::remove_file(dir.path().join("estate.sqlite3-wal"));
    let _ = std::fs::remove_file(dir.path().join("estate.sqlite3-shm"));

    let err = db.connect().unwrap_err();
    assert!(matches!(err, DbError::SchemaNotCurrent { db_version: 0, .. }));
}

#[test]
fn repositories_reject_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteLocationRepository::try_new(&conn)
        .err()
        .expect("raw connection must be rejected");
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
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
