//! Per-taxon domain statistics repository and taxon membership links.
//!
//! # Invariants
//! - Natural key is `(gtdb_taxonomy_string, source, protein_type, domains,
//!   domain_combination_type)`, backed by a unique index.
//! - Links only ever point at genomes whose GTDB rank column equals the
//!   record's `gtdb_taxonomy_last`.

use crate::model::choices::{DomainCombinationType, ProteinType, Source, TaxonRank};
use crate::model::decimal::Decimal;
use crate::model::keys::{NaturallyKeyed, TaxonStatsKey};
use crate::model::stats::PerTaxonRecord;
use crate::repo::genome_repo::{RepoError, RepoResult};
use crate::repo::genome_stats_repo::push_decimal_bound;
use crate::repo::schema::{
    decimal_to_units, ensure_ready, parse_choice, placeholders, units_to_decimal, IN_LIST_CHUNK,
};
use crate::repo::{BulkWriter, Page};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeSet, HashMap};

const TAXON_STATS_SELECT_SQL: &str = "SELECT
    id,
    gtdb_taxonomy_string,
    gtdb_taxonomy_last,
    gtdb_taxonomy_rank,
    source,
    protein_type,
    domains,
    domain_combination_type,
    count_raw,
    count_normalized_by_total_genomes,
    count_normalized_by_genome_size_by_total_genomes,
    count_normalized_by_total_proteins_by_total_genomes
FROM domain_statistics_per_taxon";

const TAXON_STATS_COLUMNS: &[&str] = &[
    "id",
    "gtdb_taxonomy_string",
    "gtdb_taxonomy_last",
    "gtdb_taxonomy_rank",
    "source",
    "protein_type",
    "domains",
    "domain_combination_type",
    "count_raw",
    "count_normalized_by_total_genomes",
    "count_normalized_by_genome_size_by_total_genomes",
    "count_normalized_by_total_proteins_by_total_genomes",
];

const LINK_COLUMNS: &[&str] = &["id", "taxon_id", "genome_id"];

/// Filters for listing per-taxon statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonStatsQuery {
    pub gtdb_taxonomy_rank: Option<String>,
    pub gtdb_taxonomy_last: Option<String>,
    pub count_raw_min: Option<i64>,
    pub count_raw_max: Option<i64>,
    pub by_total_genomes_min: Option<Decimal>,
    pub by_total_genomes_max: Option<Decimal>,
    pub by_genome_size_by_total_genomes_min: Option<Decimal>,
    pub by_genome_size_by_total_genomes_max: Option<Decimal>,
    pub by_total_proteins_by_total_genomes_min: Option<Decimal>,
    pub by_total_proteins_by_total_genomes_max: Option<Decimal>,
    pub page: Page,
}

pub trait TaxonStatsRepository {
    /// Loads every stored record whose lineage string is in `taxonomy_strings`.
    fn find_by_taxonomy_strings(
        &self,
        taxonomy_strings: &BTreeSet<String>,
    ) -> RepoResult<HashMap<TaxonStatsKey, PerTaxonRecord>>;
    fn list(&self, query: &TaxonStatsQuery) -> RepoResult<Vec<PerTaxonRecord>>;
    /// Links `taxon_id` to every genome whose GTDB `rank` equals `taxonomy_last`.
    ///
    /// Returns the number of newly created links.
    fn link_genomes(
        &self,
        taxon_id: i64,
        rank: TaxonRank,
        taxonomy_last: &str,
    ) -> RepoResult<usize>;
    /// Drops every link of `taxon_id`; returns the number removed.
    fn unlink_genomes(&self, taxon_id: i64) -> RepoResult<usize>;
    /// Genome versions linked to `taxon_id`, ordered by version.
    fn linked_genomes(&self, taxon_id: i64, page: &Page) -> RepoResult<Vec<String>>;
}

pub struct SqliteTaxonStatsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaxonStatsRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_ready(conn, "domain_statistics_per_taxon", TAXON_STATS_COLUMNS)?;
        ensure_ready(conn, "taxon_genome_links", LINK_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl TaxonStatsRepository for SqliteTaxonStatsRepository<'_> {
    fn find_by_taxonomy_strings(
        &self,
        taxonomy_strings: &BTreeSet<String>,
    ) -> RepoResult<HashMap<TaxonStatsKey, PerTaxonRecord>> {
        let strings: Vec<&str> = taxonomy_strings.iter().map(String::as_str).collect();
        let mut found = HashMap::new();
        for chunk in strings.chunks(IN_LIST_CHUNK) {
            let sql = format!(
                "{TAXON_STATS_SELECT_SQL} WHERE gtdb_taxonomy_string IN ({});",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                let record = parse_taxon_stats_row(row)?;
                found.insert(record.natural_key(), record);
            }
        }
        Ok(found)
    }

    fn list(&self, query: &TaxonStatsQuery) -> RepoResult<Vec<PerTaxonRecord>> {
        let mut sql = format!("{TAXON_STATS_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(rank) = query.gtdb_taxonomy_rank.as_ref() {
            sql.push_str(" AND gtdb_taxonomy_rank = ?");
            bind_values.push(Value::Text(rank.clone()));
        }
        if let Some(last) = query.gtdb_taxonomy_last.as_ref() {
            sql.push_str(" AND gtdb_taxonomy_last = ?");
            bind_values.push(Value::Text(last.clone()));
        }
        if let Some(min) = query.count_raw_min {
            sql.push_str(" AND count_raw >= ?");
            bind_values.push(Value::Integer(min));
        }
        if let Some(max) = query.count_raw_max {
            sql.push_str(" AND count_raw <= ?");
            bind_values.push(Value::Integer(max));
        }

        let decimal_bounds = [
            (
                "count_normalized_by_total_genomes",
                query.by_total_genomes_min,
                query.by_total_genomes_max,
            ),
            (
                "count_normalized_by_genome_size_by_total_genomes",
                query.by_genome_size_by_total_genomes_min,
                query.by_genome_size_by_total_genomes_max,
            ),
            (
                "count_normalized_by_total_proteins_by_total_genomes",
                query.by_total_proteins_by_total_genomes_min,
                query.by_total_proteins_by_total_genomes_max,
            ),
        ];
        for (column, min, max) in decimal_bounds {
            if let Some(min) = min {
                push_decimal_bound(&mut sql, &mut bind_values, column, ">=", min)?;
            }
            if let Some(max) = max {
                push_decimal_bound(&mut sql, &mut bind_values, column, "<=", max)?;
            }
        }

        sql.push_str(" ORDER BY id ASC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.page.effective_limit())));
        bind_values.push(Value::Integer(i64::from(query.page.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_taxon_stats_row(row)?);
        }
        Ok(records)
    }

    fn link_genomes(
        &self,
        taxon_id: i64,
        rank: TaxonRank,
        taxonomy_last: &str,
    ) -> RepoResult<usize> {
        let column = rank.gtdb_column();
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT OR IGNORE INTO taxon_genome_links (taxon_id, genome_id)
             SELECT ?1, id FROM genome_metadata WHERE {column} = ?2;"
        ))?;
        Ok(stmt.execute(params![taxon_id, taxonomy_last])?)
    }

    fn unlink_genomes(&self, taxon_id: i64) -> RepoResult<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM taxon_genome_links WHERE taxon_id = ?1;")?;
        Ok(stmt.execute(params![taxon_id])?)
    }

    fn linked_genomes(&self, taxon_id: i64, page: &Page) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.genome_version
             FROM taxon_genome_links l
             JOIN genome_metadata g ON g.id = l.genome_id
             WHERE l.taxon_id = ?1
             ORDER BY g.genome_version ASC
             LIMIT ?2 OFFSET ?3;",
        )?;
        let mut rows = stmt.query(params![
            taxon_id,
            page.effective_limit(),
            page.offset
        ])?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next()? {
            versions.push(row.get(0)?);
        }
        Ok(versions)
    }
}

impl BulkWriter<PerTaxonRecord> for SqliteTaxonStatsRepository<'_> {
    fn update_chunk(&self, records: &[PerTaxonRecord]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE domain_statistics_per_taxon
             SET
                gtdb_taxonomy_string = ?2,
                gtdb_taxonomy_last = ?3,
                gtdb_taxonomy_rank = ?4,
                source = ?5,
                protein_type = ?6,
                domains = ?7,
                domain_combination_type = ?8,
                count_raw = ?9,
                count_normalized_by_total_genomes = ?10,
                count_normalized_by_genome_size_by_total_genomes = ?11,
                count_normalized_by_total_proteins_by_total_genomes = ?12
             WHERE id = ?1;",
        )?;
        for record in records {
            let id = record.id.ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "per-taxon record for `{}` staged for update has no id",
                    record.gtdb_taxonomy_string
                ))
            })?;
            let [by_total_genomes, by_genome_size, by_total_proteins] = taxon_units(record)?;
            stmt.execute(params![
                id,
                record.gtdb_taxonomy_string,
                record.gtdb_taxonomy_last,
                record.gtdb_taxonomy_rank,
                record.source.as_db_str(),
                record.protein_type.as_db_str(),
                record.domains,
                record.domain_combination_type.as_db_str(),
                record.count_raw,
                by_total_genomes,
                by_genome_size,
                by_total_proteins,
            ])?;
        }
        Ok(())
    }

    fn insert_chunk(&self, records: &mut [PerTaxonRecord]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO domain_statistics_per_taxon (
                gtdb_taxonomy_string,
                gtdb_taxonomy_last,
                gtdb_taxonomy_rank,
                source,
                protein_type,
                domains,
                domain_combination_type,
                count_raw,
                count_normalized_by_total_genomes,
                count_normalized_by_genome_size_by_total_genomes,
                count_normalized_by_total_proteins_by_total_genomes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        )?;
        for record in records.iter_mut() {
            let [by_total_genomes, by_genome_size, by_total_proteins] = taxon_units(record)?;
            let id = stmt.insert(params![
                record.gtdb_taxonomy_string,
                record.gtdb_taxonomy_last,
                record.gtdb_taxonomy_rank,
                record.source.as_db_str(),
                record.protein_type.as_db_str(),
                record.domains,
                record.domain_combination_type.as_db_str(),
                record.count_raw,
                by_total_genomes,
                by_genome_size,
                by_total_proteins,
            ])?;
            record.id = Some(id);
        }
        Ok(())
    }
}

fn taxon_units(record: &PerTaxonRecord) -> RepoResult<[Option<i64>; 3]> {
    Ok([
        decimal_to_units(
            "count_normalized_by_total_genomes",
            record.count_normalized_by_total_genomes,
        )?,
        decimal_to_units(
            "count_normalized_by_genome_size_by_total_genomes",
            record.count_normalized_by_genome_size_by_total_genomes,
        )?,
        decimal_to_units(
            "count_normalized_by_total_proteins_by_total_genomes",
            record.count_normalized_by_total_proteins_by_total_genomes,
        )?,
    ])
}

fn parse_taxon_stats_row(row: &Row<'_>) -> RepoResult<PerTaxonRecord> {
    Ok(PerTaxonRecord {
        id: Some(row.get("id")?),
        gtdb_taxonomy_string: row.get("gtdb_taxonomy_string")?,
        gtdb_taxonomy_last: row.get("gtdb_taxonomy_last")?,
        gtdb_taxonomy_rank: row.get("gtdb_taxonomy_rank")?,
        source: parse_choice(
            "domain_statistics_per_taxon.source",
            row.get("source")?,
            Source::parse,
        )?,
        protein_type: parse_choice(
            "domain_statistics_per_taxon.protein_type",
            row.get("protein_type")?,
            ProteinType::parse,
        )?,
        domains: row.get("domains")?,
        domain_combination_type: parse_choice(
            "domain_statistics_per_taxon.domain_combination_type",
            row.get("domain_combination_type")?,
            DomainCombinationType::parse,
        )?,
        count_raw: row.get("count_raw")?,
        count_normalized_by_total_genomes: units_to_decimal(
            row.get("count_normalized_by_total_genomes")?,
        ),
        count_normalized_by_genome_size_by_total_genomes: units_to_decimal(
            row.get("count_normalized_by_genome_size_by_total_genomes")?,
        ),
        count_normalized_by_total_proteins_by_total_genomes: units_to_decimal(
            row.get("count_normalized_by_total_proteins_by_total_genomes")?,
        ),
    })
}
