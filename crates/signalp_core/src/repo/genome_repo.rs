//! Genome metadata repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Resolve genome versions and GTDB taxa in batched lookups.
//! - Persist genome metadata chunks for the genome metadata loader.
//!
//! # Invariants
//! - Lookups issue one query per `IN` chunk, never one query per row.
//! - Taxonomy columns are only ever addressed through `TaxonRank`.

use crate::db::DbError;
use crate::model::choices::TaxonRank;
use crate::model::genome::{GenomeMetadata, Taxonomy};
use crate::repo::schema::{ensure_ready, placeholders, IN_LIST_CHUNK};
use crate::repo::{BulkWriter, Page};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

const GENOME_SELECT_SQL: &str = "SELECT
    id,
    genome_version,
    genome_accession,
    genome_size,
    protein_count,
    gtdb_kingdom,
    gtdb_phylum,
    gtdb_class,
    gtdb_order,
    gtdb_family,
    gtdb_genus,
    gtdb_species,
    ncbi_kingdom,
    ncbi_phylum,
    ncbi_class,
    ncbi_order,
    ncbi_family,
    ncbi_genus,
    ncbi_species
FROM genome_metadata";

const GENOME_COLUMNS: &[&str] = &[
    "id",
    "genome_version",
    "genome_accession",
    "genome_size",
    "protein_count",
    "gtdb_kingdom",
    "gtdb_phylum",
    "gtdb_class",
    "gtdb_order",
    "gtdb_family",
    "gtdb_genus",
    "gtdb_species",
    "ncbi_kingdom",
    "ncbi_phylum",
    "ncbi_class",
    "ncbi_order",
    "ncbi_family",
    "ncbi_genus",
    "ncbi_species",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every statistics store repository.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A decimal does not fit the fixed-point column it targets.
    OutOfRange {
        column: &'static str,
        value: String,
    },
    /// Persisted data cannot be converted into a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::OutOfRange { column, value } => {
                write!(f, "value `{value}` is out of range for column `{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::OutOfRange { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Whether the store rejected a write because of a declared constraint
    /// (uniqueness, foreign key, width/choice/range `CHECK`).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::OutOfRange { .. } => true,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

/// Repository interface for genome metadata.
pub trait GenomeRepository {
    /// Loads every genome whose version is in `versions`, keyed by version.
    fn find_by_versions(
        &self,
        versions: &BTreeSet<String>,
    ) -> RepoResult<HashMap<String, GenomeMetadata>>;
    /// Returns the subset of `values` present in the GTDB column of `rank`.
    fn existing_gtdb_taxa(
        &self,
        rank: TaxonRank,
        values: &BTreeSet<String>,
    ) -> RepoResult<HashSet<String>>;
    fn get_genome(&self, genome_version: &str) -> RepoResult<Option<GenomeMetadata>>;
    /// Lists genomes ordered by version.
    fn list_genomes(&self, page: &Page) -> RepoResult<Vec<GenomeMetadata>>;
}

/// SQLite-backed genome metadata repository.
pub struct SqliteGenomeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGenomeRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_ready(conn, "genome_metadata", GENOME_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl GenomeRepository for SqliteGenomeRepository<'_> {
    fn find_by_versions(
        &self,
        versions: &BTreeSet<String>,
    ) -> RepoResult<HashMap<String, GenomeMetadata>> {
        let versions: Vec<&str> = versions.iter().map(String::as_str).collect();
        let mut found = HashMap::with_capacity(versions.len());
        for chunk in versions.chunks(IN_LIST_CHUNK) {
            let sql = format!(
                "{GENOME_SELECT_SQL} WHERE genome_version IN ({});",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                let genome = parse_genome_row(row)?;
                found.insert(genome.genome_version.clone(), genome);
            }
        }
        Ok(found)
    }

    fn existing_gtdb_taxa(
        &self,
        rank: TaxonRank,
        values: &BTreeSet<String>,
    ) -> RepoResult<HashSet<String>> {
        let column = rank.gtdb_column();
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        let mut found = HashSet::new();
        for chunk in values.chunks(IN_LIST_CHUNK) {
            let sql = format!(
                "SELECT DISTINCT {column} FROM genome_metadata WHERE {column} IN ({});",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                found.insert(row.get::<_, String>(0)?);
            }
        }
        Ok(found)
    }

    fn get_genome(&self, genome_version: &str) -> RepoResult<Option<GenomeMetadata>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GENOME_SELECT_SQL} WHERE genome_version = ?1;"))?;
        let mut rows = stmt.query([genome_version])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_genome_row(row)?));
        }
        Ok(None)
    }

    fn list_genomes(&self, page: &Page) -> RepoResult<Vec<GenomeMetadata>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GENOME_SELECT_SQL} ORDER BY genome_version ASC LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![page.effective_limit(), page.offset])?;
        let mut genomes = Vec::new();
        while let Some(row) = rows.next()? {
            genomes.push(parse_genome_row(row)?);
        }
        Ok(genomes)
    }
}

impl BulkWriter<GenomeMetadata> for SqliteGenomeRepository<'_> {
    fn update_chunk(&self, records: &[GenomeMetadata]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE genome_metadata
             SET
                genome_accession = ?2,
                genome_size = ?3,
                protein_count = ?4,
                gtdb_kingdom = ?5,
                gtdb_phylum = ?6,
                gtdb_class = ?7,
                gtdb_order = ?8,
                gtdb_family = ?9,
                gtdb_genus = ?10,
                gtdb_species = ?11,
                ncbi_kingdom = ?12,
                ncbi_phylum = ?13,
                ncbi_class = ?14,
                ncbi_order = ?15,
                ncbi_family = ?16,
                ncbi_genus = ?17,
                ncbi_species = ?18
             WHERE id = ?1;",
        )?;
        for genome in records {
            let id = genome.id.ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "genome `{}` staged for update has no id",
                    genome.genome_version
                ))
            })?;
            stmt.execute(params![
                id,
                genome.genome_accession,
                genome.genome_size,
                genome.protein_count,
                genome.gtdb.kingdom,
                genome.gtdb.phylum,
                genome.gtdb.class,
                genome.gtdb.order,
                genome.gtdb.family,
                genome.gtdb.genus,
                genome.gtdb.species,
                genome.ncbi.kingdom,
                genome.ncbi.phylum,
                genome.ncbi.class,
                genome.ncbi.order,
                genome.ncbi.family,
                genome.ncbi.genus,
                genome.ncbi.species,
            ])?;
        }
        Ok(())
    }

    fn insert_chunk(&self, records: &mut [GenomeMetadata]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO genome_metadata (
                genome_version,
                genome_accession,
                genome_size,
                protein_count,
                gtdb_kingdom,
                gtdb_phylum,
                gtdb_class,
                gtdb_order,
                gtdb_family,
                gtdb_genus,
                gtdb_species,
                ncbi_kingdom,
                ncbi_phylum,
                ncbi_class,
                ncbi_order,
                ncbi_family,
                ncbi_genus,
                ncbi_species
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18);",
        )?;
        for genome in records.iter_mut() {
            let id = stmt.insert(params![
                genome.genome_version,
                genome.genome_accession,
                genome.genome_size,
                genome.protein_count,
                genome.gtdb.kingdom,
                genome.gtdb.phylum,
                genome.gtdb.class,
                genome.gtdb.order,
                genome.gtdb.family,
                genome.gtdb.genus,
                genome.gtdb.species,
                genome.ncbi.kingdom,
                genome.ncbi.phylum,
                genome.ncbi.class,
                genome.ncbi.order,
                genome.ncbi.family,
                genome.ncbi.genus,
                genome.ncbi.species,
            ])?;
            genome.id = Some(id);
        }
        Ok(())
    }
}

fn parse_genome_row(row: &Row<'_>) -> RepoResult<GenomeMetadata> {
    Ok(GenomeMetadata {
        id: Some(row.get("id")?),
        genome_version: row.get("genome_version")?,
        genome_accession: row.get("genome_accession")?,
        genome_size: row.get("genome_size")?,
        protein_count: row.get("protein_count")?,
        gtdb: Taxonomy {
            kingdom: row.get("gtdb_kingdom")?,
            phylum: row.get("gtdb_phylum")?,
            class: row.get("gtdb_class")?,
            order: row.get("gtdb_order")?,
            family: row.get("gtdb_family")?,
            genus: row.get("gtdb_genus")?,
            species: row.get("gtdb_species")?,
        },
        ncbi: Taxonomy {
            kingdom: row.get("ncbi_kingdom")?,
            phylum: row.get("ncbi_phylum")?,
            class: row.get("ncbi_class")?,
            order: row.get("ncbi_order")?,
            family: row.get("ncbi_family")?,
            genus: row.get("ncbi_genus")?,
            species: row.get("ncbi_species")?,
        },
    })
}
