//! Shared SQL helpers: schema readiness checks and chunked `IN` lists.

use crate::db::migrations::latest_version;
use crate::db::schema_version;
use crate::model::decimal::Decimal;
use crate::repo::genome_repo::{RepoError, RepoResult};
use rusqlite::Connection;

/// Upper bound of bound parameters per `IN (...)` list.
pub(crate) const IN_LIST_CHUNK: usize = 500;

/// Decimal places of fixed-point statistics columns.
pub(crate) const DECIMAL_PLACES: u32 = 5;

pub(crate) fn ensure_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for &column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Converts a decimal into the fixed-point units a statistics column stores.
pub(crate) fn decimal_to_units(
    column: &'static str,
    value: Option<Decimal>,
) -> RepoResult<Option<i64>> {
    match value {
        None => Ok(None),
        Some(decimal) => decimal
            .to_scaled(DECIMAL_PLACES)
            .map(Some)
            .ok_or_else(|| RepoError::OutOfRange {
                column,
                value: decimal.to_string(),
            }),
    }
}

pub(crate) fn units_to_decimal(units: Option<i64>) -> Option<Decimal> {
    units.map(|value| Decimal::from_scaled(value, DECIMAL_PLACES))
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Decodes a persisted choice column, rejecting values outside the enum.
pub(crate) fn parse_choice<T>(
    column: &str,
    raw: String,
    parse: fn(&str) -> Option<T>,
) -> RepoResult<T> {
    parse(&raw).ok_or_else(|| RepoError::InvalidData(format!("invalid value `{raw}` in {column}")))
}
