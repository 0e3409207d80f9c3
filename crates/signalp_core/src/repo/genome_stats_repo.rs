//! Per-genome domain statistics repository.
//!
//! # Invariants
//! - Natural key is `(genome_version, source, protein_type, domains,
//!   domain_combination_type)`, backed by a unique index.
//! - Normalized counts are fixed-point with five decimal places.

use crate::model::choices::{DomainCombinationType, ProteinType, Source};
use crate::model::decimal::Decimal;
use crate::model::keys::{GenomeStatsKey, NaturallyKeyed};
use crate::model::stats::PerGenomeRecord;
use crate::repo::genome_repo::{RepoError, RepoResult};
use crate::repo::schema::{
    decimal_to_units, ensure_ready, parse_choice, placeholders, units_to_decimal, DECIMAL_PLACES,
    IN_LIST_CHUNK,
};
use crate::repo::{BulkWriter, Page};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeSet, HashMap};

const GENOME_STATS_SELECT_SQL: &str = "SELECT
    id,
    genome_version,
    genome_accession,
    source,
    protein_type,
    domains,
    domain_combination_type,
    count_raw,
    count_normalized_by_genome_size,
    count_normalized_by_total_proteins
FROM domain_statistics_per_genome";

const GENOME_STATS_COLUMNS: &[&str] = &[
    "id",
    "genome_version",
    "genome_accession",
    "source",
    "protein_type",
    "domains",
    "domain_combination_type",
    "count_raw",
    "count_normalized_by_genome_size",
    "count_normalized_by_total_proteins",
];

/// Filters for listing per-genome statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomeStatsQuery {
    pub genome_version: Option<String>,
    pub count_raw_min: Option<i64>,
    pub count_raw_max: Option<i64>,
    pub by_genome_size_min: Option<Decimal>,
    pub by_genome_size_max: Option<Decimal>,
    pub by_total_proteins_min: Option<Decimal>,
    pub by_total_proteins_max: Option<Decimal>,
    pub page: Page,
}

pub trait GenomeStatsRepository {
    /// Loads every stored record attached to one of `genome_versions`.
    fn find_by_genome_versions(
        &self,
        genome_versions: &BTreeSet<String>,
    ) -> RepoResult<HashMap<GenomeStatsKey, PerGenomeRecord>>;
    fn get_by_key(&self, key: &GenomeStatsKey) -> RepoResult<Option<PerGenomeRecord>>;
    fn list(&self, query: &GenomeStatsQuery) -> RepoResult<Vec<PerGenomeRecord>>;
}

pub struct SqliteGenomeStatsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGenomeStatsRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_ready(conn, "domain_statistics_per_genome", GENOME_STATS_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl GenomeStatsRepository for SqliteGenomeStatsRepository<'_> {
    fn find_by_genome_versions(
        &self,
        genome_versions: &BTreeSet<String>,
    ) -> RepoResult<HashMap<GenomeStatsKey, PerGenomeRecord>> {
        let versions: Vec<&str> = genome_versions.iter().map(String::as_str).collect();
        let mut found = HashMap::new();
        for chunk in versions.chunks(IN_LIST_CHUNK) {
            let sql = format!(
                "{GENOME_STATS_SELECT_SQL} WHERE genome_version IN ({});",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                let record = parse_genome_stats_row(row)?;
                found.insert(record.natural_key(), record);
            }
        }
        Ok(found)
    }

    fn get_by_key(&self, key: &GenomeStatsKey) -> RepoResult<Option<PerGenomeRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GENOME_STATS_SELECT_SQL}
             WHERE genome_version = ?1
               AND source = ?2
               AND protein_type = ?3
               AND domains = ?4
               AND domain_combination_type = ?5;"
        ))?;
        let mut rows = stmt.query(params![
            key.genome_version(),
            key.source().as_db_str(),
            key.protein_type().as_db_str(),
            key.domains(),
            key.domain_combination_type().as_db_str(),
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_genome_stats_row(row)?));
        }
        Ok(None)
    }

    fn list(&self, query: &GenomeStatsQuery) -> RepoResult<Vec<PerGenomeRecord>> {
        let mut sql = format!("{GENOME_STATS_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(genome_version) = query.genome_version.as_ref() {
            sql.push_str(" AND genome_version = ?");
            bind_values.push(Value::Text(genome_version.clone()));
        }
        if let Some(min) = query.count_raw_min {
            sql.push_str(" AND count_raw >= ?");
            bind_values.push(Value::Integer(min));
        }
        if let Some(max) = query.count_raw_max {
            sql.push_str(" AND count_raw <= ?");
            bind_values.push(Value::Integer(max));
        }
        for (column, op, bound) in [
            (
                "count_normalized_by_genome_size",
                ">=",
                query.by_genome_size_min,
            ),
            (
                "count_normalized_by_genome_size",
                "<=",
                query.by_genome_size_max,
            ),
            (
                "count_normalized_by_total_proteins",
                ">=",
                query.by_total_proteins_min,
            ),
            (
                "count_normalized_by_total_proteins",
                "<=",
                query.by_total_proteins_max,
            ),
        ] {
            if let Some(bound) = bound {
                push_decimal_bound(&mut sql, &mut bind_values, column, op, bound)?;
            }
        }

        sql.push_str(" ORDER BY id ASC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.page.effective_limit())));
        bind_values.push(Value::Integer(i64::from(query.page.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_genome_stats_row(row)?);
        }
        Ok(records)
    }
}

impl BulkWriter<PerGenomeRecord> for SqliteGenomeStatsRepository<'_> {
    fn update_chunk(&self, records: &[PerGenomeRecord]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE domain_statistics_per_genome
             SET
                genome_version = ?2,
                genome_accession = ?3,
                source = ?4,
                protein_type = ?5,
                domains = ?6,
                domain_combination_type = ?7,
                count_raw = ?8,
                count_normalized_by_genome_size = ?9,
                count_normalized_by_total_proteins = ?10
             WHERE id = ?1;",
        )?;
        for record in records {
            let id = record.id.ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "per-genome record for `{}` staged for update has no id",
                    record.genome_version
                ))
            })?;
            stmt.execute(params![
                id,
                record.genome_version,
                record.genome_accession,
                record.source.as_db_str(),
                record.protein_type.as_db_str(),
                record.domains,
                record.domain_combination_type.as_db_str(),
                record.count_raw,
                decimal_to_units(
                    "count_normalized_by_genome_size",
                    record.count_normalized_by_genome_size
                )?,
                decimal_to_units(
                    "count_normalized_by_total_proteins",
                    record.count_normalized_by_total_proteins
                )?,
            ])?;
        }
        Ok(())
    }

    fn insert_chunk(&self, records: &mut [PerGenomeRecord]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO domain_statistics_per_genome (
                genome_version,
                genome_accession,
                source,
                protein_type,
                domains,
                domain_combination_type,
                count_raw,
                count_normalized_by_genome_size,
                count_normalized_by_total_proteins
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        )?;
        for record in records.iter_mut() {
            let id = stmt.insert(params![
                record.genome_version,
                record.genome_accession,
                record.source.as_db_str(),
                record.protein_type.as_db_str(),
                record.domains,
                record.domain_combination_type.as_db_str(),
                record.count_raw,
                decimal_to_units(
                    "count_normalized_by_genome_size",
                    record.count_normalized_by_genome_size
                )?,
                decimal_to_units(
                    "count_normalized_by_total_proteins",
                    record.count_normalized_by_total_proteins
                )?,
            ])?;
            record.id = Some(id);
        }
        Ok(())
    }
}

/// Appends a `column op ?` filter on a fixed-point column.
pub(crate) fn push_decimal_bound(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    column: &'static str,
    op: &'static str,
    bound: Decimal,
) -> RepoResult<()> {
    let units = bound
        .to_scaled(DECIMAL_PLACES)
        .ok_or_else(|| RepoError::OutOfRange {
            column,
            value: bound.to_string(),
        })?;
    sql.push_str(&format!(" AND {column} {op} ?"));
    bind_values.push(Value::Integer(units));
    Ok(())
}

fn parse_genome_stats_row(row: &Row<'_>) -> RepoResult<PerGenomeRecord> {
    Ok(PerGenomeRecord {
        id: Some(row.get("id")?),
        genome_version: row.get("genome_version")?,
        genome_accession: row.get("genome_accession")?,
        source: parse_choice(
            "domain_statistics_per_genome.source",
            row.get("source")?,
            Source::parse,
        )?,
        protein_type: parse_choice(
            "domain_statistics_per_genome.protein_type",
            row.get("protein_type")?,
            ProteinType::parse,
        )?,
        domains: row.get("domains")?,
        domain_combination_type: parse_choice(
            "domain_statistics_per_genome.domain_combination_type",
            row.get("domain_combination_type")?,
            DomainCombinationType::parse,
        )?,
        count_raw: row.get("count_raw")?,
        count_normalized_by_genome_size: units_to_decimal(
            row.get("count_normalized_by_genome_size")?,
        ),
        count_normalized_by_total_proteins: units_to_decimal(
            row.get("count_normalized_by_total_proteins")?,
        ),
    })
}
