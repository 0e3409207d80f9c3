//! Core loaders and store for genome, protein-domain and taxon statistics.
//! This crate is the single source of truth for reconciliation invariants.

pub mod db;
pub mod loader;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use loader::{
    load_domain_statistics_per_genome, load_domain_statistics_per_protein,
    load_domain_statistics_per_taxon, load_genome_metadata, LoadError, LoadOptions, LoadResult,
    LoadSummary,
};
pub use logging::{default_log_level, init_logging, logging_status, LogDestination};
pub use model::choices::{DomainCombinationType, ProteinType, Source, TaxonRank};
pub use model::decimal::Decimal;
pub use model::genome::{GenomeMetadata, Taxonomy};
pub use model::keys::{GenomeStatsKey, NaturallyKeyed, TaxonStatsKey};
pub use model::stats::{DomainCounts, PerGenomeRecord, PerProteinRecord, PerTaxonRecord};
pub use repo::genome_repo::{GenomeRepository, RepoError, RepoResult, SqliteGenomeRepository};
pub use repo::genome_stats_repo::{
    GenomeStatsQuery, GenomeStatsRepository, SqliteGenomeStatsRepository,
};
pub use repo::protein_stats_repo::{
    ProteinStatsQuery, ProteinStatsRepository, SqliteProteinStatsRepository,
};
pub use repo::taxon_stats_repo::{
    SqliteTaxonStatsRepository, TaxonStatsQuery, TaxonStatsRepository,
};
pub use repo::Page;
pub use search::fts::{
    search_domains, DomainSearchQuery, SearchError, SearchHit, SearchResult, SearchScope,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
