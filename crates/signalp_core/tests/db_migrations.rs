use rusqlite::Connection;
use signalp_core::db::migrations::latest_version;
use signalp_core::db::{open_db, open_db_in_memory, DbError};
use signalp_core::{RepoError, SqliteGenomeRepository, SqliteTaxonStatsRepository};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "genome_metadata");
    assert_table_exists(&conn, "domain_statistics_per_protein");
    assert_table_exists(&conn, "domain_statistics_per_genome");
    assert_table_exists(&conn, "domain_statistics_per_taxon");
    assert_table_exists(&conn, "taxon_genome_links");
    assert_table_exists(&conn, "domain_statistics_per_protein_fts");
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO domain_statistics_per_protein
                (genome_version, mist_protein_accession, protein_type, source)
             VALUES ('missing', 'P1', 'HK', 'mist');",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn choice_and_width_checks_reject_bad_rows() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO genome_metadata (genome_version) VALUES ('G1');",
        [],
    )
    .unwrap();

    let bad_choice = conn.execute(
        "INSERT INTO domain_statistics_per_genome
            (genome_version, source, protein_type, domains, domain_combination_type)
         VALUES ('G1', 'pfam', 'HK', 'PAS', 'domain');",
        [],
    );
    assert!(bad_choice.is_err());

    let too_wide = conn.execute(
        "INSERT INTO genome_metadata (genome_version, genome_accession) VALUES ('G2', ?1);",
        ["x".repeat(101)],
    );
    assert!(too_wide.is_err());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signalp.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "genome_metadata");
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

#[test]
fn repositories_refuse_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteGenomeRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
    assert!(SqliteTaxonStatsRepository::try_new(&conn).is_err());
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
