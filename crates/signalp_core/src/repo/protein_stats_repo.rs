//! Per-protein domain statistics repository.
//!
//! # Invariants
//! - `mist_protein_accession` is unique; lookups and upserts key on it.
//! - `domain_counts` is persisted as a JSON object.

use crate::model::choices::{ProteinType, Source};
use crate::model::stats::{DomainCounts, PerProteinRecord};
use crate::repo::genome_repo::{RepoError, RepoResult};
use crate::repo::schema::{ensure_ready, placeholders, IN_LIST_CHUNK};
use crate::repo::{BulkWriter, Page};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeSet, HashMap};

const PROTEIN_SELECT_SQL: &str = "SELECT
    id,
    genome_version,
    genome_accession,
    ncbi_protein_accession,
    mist_protein_accession,
    protein_type,
    source,
    protein_length,
    domain_architecture,
    sensors_or_regulators,
    domain_counts,
    domains
FROM domain_statistics_per_protein";

const PROTEIN_COLUMNS: &[&str] = &[
    "id",
    "genome_version",
    "genome_accession",
    "ncbi_protein_accession",
    "mist_protein_accession",
    "protein_type",
    "source",
    "protein_length",
    "domain_architecture",
    "sensors_or_regulators",
    "domain_counts",
    "domains",
];

/// Filters for listing per-protein statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProteinStatsQuery {
    pub genome_version: Option<String>,
    pub protein_length_min: Option<i64>,
    pub protein_length_max: Option<i64>,
    pub page: Page,
}

pub trait ProteinStatsRepository {
    /// Loads every stored record whose accession is in `accessions`.
    fn find_by_accessions(
        &self,
        accessions: &BTreeSet<String>,
    ) -> RepoResult<HashMap<String, PerProteinRecord>>;
    fn get_by_accession(&self, accession: &str) -> RepoResult<Option<PerProteinRecord>>;
    fn list(&self, query: &ProteinStatsQuery) -> RepoResult<Vec<PerProteinRecord>>;
}

pub struct SqliteProteinStatsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProteinStatsRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_ready(conn, "domain_statistics_per_protein", PROTEIN_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl ProteinStatsRepository for SqliteProteinStatsRepository<'_> {
    fn find_by_accessions(
        &self,
        accessions: &BTreeSet<String>,
    ) -> RepoResult<HashMap<String, PerProteinRecord>> {
        let accessions: Vec<&str> = accessions.iter().map(String::as_str).collect();
        let mut found = HashMap::with_capacity(accessions.len());
        for chunk in accessions.chunks(IN_LIST_CHUNK) {
            let sql = format!(
                "{PROTEIN_SELECT_SQL} WHERE mist_protein_accession IN ({});",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                let record = parse_protein_row(row)?;
                found.insert(record.mist_protein_accession.clone(), record);
            }
        }
        Ok(found)
    }

    fn get_by_accession(&self, accession: &str) -> RepoResult<Option<PerProteinRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROTEIN_SELECT_SQL} WHERE mist_protein_accession = ?1;"
        ))?;
        let mut rows = stmt.query([accession])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_protein_row(row)?));
        }
        Ok(None)
    }

    fn list(&self, query: &ProteinStatsQuery) -> RepoResult<Vec<PerProteinRecord>> {
        let mut sql = format!("{PROTEIN_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(genome_version) = query.genome_version.as_ref() {
            sql.push_str(" AND genome_version = ?");
            bind_values.push(Value::Text(genome_version.clone()));
        }
        if let Some(min) = query.protein_length_min {
            sql.push_str(" AND protein_length >= ?");
            bind_values.push(Value::Integer(min));
        }
        if let Some(max) = query.protein_length_max {
            sql.push_str(" AND protein_length <= ?");
            bind_values.push(Value::Integer(max));
        }

        sql.push_str(" ORDER BY id ASC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.page.effective_limit())));
        bind_values.push(Value::Integer(i64::from(query.page.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_protein_row(row)?);
        }
        Ok(records)
    }
}

impl BulkWriter<PerProteinRecord> for SqliteProteinStatsRepository<'_> {
    fn update_chunk(&self, records: &[PerProteinRecord]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE domain_statistics_per_protein
             SET
                genome_version = ?2,
                genome_accession = ?3,
                ncbi_protein_accession = ?4,
                mist_protein_accession = ?5,
                protein_type = ?6,
                source = ?7,
                protein_length = ?8,
                domain_architecture = ?9,
                sensors_or_regulators = ?10,
                domain_counts = ?11,
                domains = ?12
             WHERE id = ?1;",
        )?;
        for record in records {
            let id = record.id.ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "protein `{}` staged for update has no id",
                    record.mist_protein_accession
                ))
            })?;
            stmt.execute(params![
                id,
                record.genome_version,
                record.genome_accession,
                record.ncbi_protein_accession,
                record.mist_protein_accession,
                record.protein_type.as_db_str(),
                record.source.as_db_str(),
                record.protein_length,
                record.domain_architecture,
                record.sensors_or_regulators,
                record.domain_counts.as_ref().map(DomainCounts::to_json),
                record.domains,
            ])?;
        }
        Ok(())
    }

    fn insert_chunk(&self, records: &mut [PerProteinRecord]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO domain_statistics_per_protein (
                genome_version,
                genome_accession,
                ncbi_protein_accession,
                mist_protein_accession,
                protein_type,
                source,
                protein_length,
                domain_architecture,
                sensors_or_regulators,
                domain_counts,
                domains
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        )?;
        for record in records.iter_mut() {
            let id = stmt.insert(params![
                record.genome_version,
                record.genome_accession,
                record.ncbi_protein_accession,
                record.mist_protein_accession,
                record.protein_type.as_db_str(),
                record.source.as_db_str(),
                record.protein_length,
                record.domain_architecture,
                record.sensors_or_regulators,
                record.domain_counts.as_ref().map(DomainCounts::to_json),
                record.domains,
            ])?;
            record.id = Some(id);
        }
        Ok(())
    }
}

fn parse_protein_row(row: &Row<'_>) -> RepoResult<PerProteinRecord> {
    let protein_type_text: String = row.get("protein_type")?;
    let protein_type = ProteinType::parse(&protein_type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid protein type `{protein_type_text}` in domain_statistics_per_protein.protein_type"
        ))
    })?;

    let source_text: String = row.get("source")?;
    let source = Source::parse(&source_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid source `{source_text}` in domain_statistics_per_protein.source"
        ))
    })?;

    let domain_counts = match row.get::<_, Option<String>>("domain_counts")? {
        Some(raw) => Some(DomainCounts::from_json(&raw).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid domain counts `{raw}` in domain_statistics_per_protein.domain_counts"
            ))
        })?),
        None => None,
    };

    Ok(PerProteinRecord {
        id: Some(row.get("id")?),
        genome_version: row.get("genome_version")?,
        genome_accession: row.get("genome_accession")?,
        ncbi_protein_accession: row.get("ncbi_protein_accession")?,
        mist_protein_accession: row.get("mist_protein_accession")?,
        protein_type,
        source,
        protein_length: row.get("protein_length")?,
        domain_architecture: row.get("domain_architecture")?,
        sensors_or_regulators: row.get("sensors_or_regulators")?,
        domain_counts,
        domains: row.get("domains")?,
    })
}
