//! Genome metadata: the reference entity every statistics row depends on.
//!
//! # Invariants
//! - `genome_version` is the natural key and never changes for a record.
//! - Statistics loaders only read these records; the genome metadata loader
//!   is the single writer.

use crate::model::choices::TaxonRank;
use crate::model::keys::NaturallyKeyed;
use serde::Serialize;

/// Seven-rank lineage in one taxonomy system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Taxonomy {
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
}

impl Taxonomy {
    pub fn rank(&self, rank: TaxonRank) -> Option<&str> {
        let value = match rank {
            TaxonRank::Kingdom => &self.kingdom,
            TaxonRank::Phylum => &self.phylum,
            TaxonRank::Class => &self.class,
            TaxonRank::Order => &self.order,
            TaxonRank::Family => &self.family,
            TaxonRank::Genus => &self.genus,
            TaxonRank::Species => &self.species,
        };
        value.as_deref()
    }

    pub fn set_rank(&mut self, rank: TaxonRank, value: Option<String>) {
        let slot = match rank {
            TaxonRank::Kingdom => &mut self.kingdom,
            TaxonRank::Phylum => &mut self.phylum,
            TaxonRank::Class => &mut self.class,
            TaxonRank::Order => &mut self.order,
            TaxonRank::Family => &mut self.family,
            TaxonRank::Genus => &mut self.genus,
            TaxonRank::Species => &mut self.species,
        };
        *slot = value;
    }
}

/// One genome assembly with its size, protein count and two lineages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenomeMetadata {
    /// Storage id; `None` until the record is inserted.
    pub id: Option<i64>,
    pub genome_version: String,
    pub genome_accession: Option<String>,
    pub genome_size: Option<i64>,
    pub protein_count: Option<i64>,
    pub gtdb: Taxonomy,
    pub ncbi: Taxonomy,
}

impl GenomeMetadata {
    pub fn new(genome_version: impl Into<String>) -> Self {
        Self {
            id: None,
            genome_version: genome_version.into(),
            genome_accession: None,
            genome_size: None,
            protein_count: None,
            gtdb: Taxonomy::default(),
            ncbi: Taxonomy::default(),
        }
    }
}

impl NaturallyKeyed for GenomeMetadata {
    type Key = String;

    fn natural_key(&self) -> String {
        self.genome_version.clone()
    }

    fn storage_id(&self) -> Option<i64> {
        self.id
    }

    fn apply_update(&mut self, incoming: Self) {
        self.genome_accession = incoming.genome_accession;
        self.genome_size = incoming.genome_size;
        self.protein_count = incoming.protein_count;
        self.gtdb = incoming.gtdb;
        self.ncbi = incoming.ncbi;
    }
}
