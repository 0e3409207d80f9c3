//! Domain statistics records at protein, genome and taxon granularity.
//!
//! # Invariants
//! - Per-protein and per-genome records always name an existing genome.
//! - Per-taxon records always name a taxon present in genome metadata at
//!   the record's rank.
//! - `apply_update` copies every field except the storage id, so staging
//!   the same key twice keeps the later row's values.

use crate::model::choices::{DomainCombinationType, ProteinType, Source};
use crate::model::decimal::Decimal;
use crate::model::keys::{GenomeStatsKey, NaturallyKeyed, TaxonStatsKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrences per domain name within one protein.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainCounts(pub BTreeMap<String, u64>);

impl DomainCounts {
    pub fn get(&self, domain: &str) -> Option<u64> {
        self.0.get(domain).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> String {
        // A string-keyed map of integers always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok().map(Self)
    }
}

/// Domain annotation of a single protein.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerProteinRecord {
    pub id: Option<i64>,
    pub genome_version: String,
    pub genome_accession: Option<String>,
    pub ncbi_protein_accession: Option<String>,
    /// Natural key.
    pub mist_protein_accession: String,
    pub protein_type: ProteinType,
    pub source: Source,
    pub protein_length: Option<i64>,
    pub domain_architecture: Option<String>,
    pub sensors_or_regulators: Option<String>,
    pub domain_counts: Option<DomainCounts>,
    pub domains: Option<String>,
}

impl NaturallyKeyed for PerProteinRecord {
    type Key = String;

    fn natural_key(&self) -> String {
        self.mist_protein_accession.clone()
    }

    fn storage_id(&self) -> Option<i64> {
        self.id
    }

    fn apply_update(&mut self, incoming: Self) {
        self.genome_version = incoming.genome_version;
        self.genome_accession = incoming.genome_accession;
        self.ncbi_protein_accession = incoming.ncbi_protein_accession;
        self.mist_protein_accession = incoming.mist_protein_accession;
        self.protein_type = incoming.protein_type;
        self.source = incoming.source;
        self.protein_length = incoming.protein_length;
        self.domain_architecture = incoming.domain_architecture;
        self.sensors_or_regulators = incoming.sensors_or_regulators;
        self.domain_counts = incoming.domain_counts;
        self.domains = incoming.domains;
    }
}

/// Domain occurrence counts aggregated over one genome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerGenomeRecord {
    pub id: Option<i64>,
    pub genome_version: String,
    pub genome_accession: Option<String>,
    pub source: Source,
    pub protein_type: ProteinType,
    pub domains: String,
    pub domain_combination_type: DomainCombinationType,
    pub count_raw: Option<i64>,
    pub count_normalized_by_genome_size: Option<Decimal>,
    pub count_normalized_by_total_proteins: Option<Decimal>,
}

impl NaturallyKeyed for PerGenomeRecord {
    type Key = GenomeStatsKey;

    fn natural_key(&self) -> GenomeStatsKey {
        GenomeStatsKey::new(
            self.genome_version.as_str(),
            self.source,
            self.protein_type,
            self.domains.as_str(),
            self.domain_combination_type,
        )
    }

    fn storage_id(&self) -> Option<i64> {
        self.id
    }

    fn apply_update(&mut self, incoming: Self) {
        self.genome_version = incoming.genome_version;
        self.genome_accession = incoming.genome_accession;
        self.source = incoming.source;
        self.protein_type = incoming.protein_type;
        self.domains = incoming.domains;
        self.domain_combination_type = incoming.domain_combination_type;
        self.count_raw = incoming.count_raw;
        self.count_normalized_by_genome_size = incoming.count_normalized_by_genome_size;
        self.count_normalized_by_total_proteins = incoming.count_normalized_by_total_proteins;
    }
}

/// Domain occurrence counts aggregated over every genome of one taxon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerTaxonRecord {
    pub id: Option<i64>,
    /// Full `;`-separated GTDB lineage down to this taxon.
    pub gtdb_taxonomy_string: String,
    /// Last lineage element, matched against `genome_metadata.gtdb_<rank>`.
    pub gtdb_taxonomy_last: String,
    pub gtdb_taxonomy_rank: Option<String>,
    pub source: Source,
    pub protein_type: ProteinType,
    pub domains: String,
    pub domain_combination_type: DomainCombinationType,
    pub count_raw: Option<i64>,
    pub count_normalized_by_total_genomes: Option<Decimal>,
    pub count_normalized_by_genome_size_by_total_genomes: Option<Decimal>,
    pub count_normalized_by_total_proteins_by_total_genomes: Option<Decimal>,
}

impl NaturallyKeyed for PerTaxonRecord {
    type Key = TaxonStatsKey;

    fn natural_key(&self) -> TaxonStatsKey {
        TaxonStatsKey::new(
            self.gtdb_taxonomy_string.as_str(),
            self.source,
            self.protein_type,
            self.domains.as_str(),
            self.domain_combination_type,
        )
    }

    fn storage_id(&self) -> Option<i64> {
        self.id
    }

    fn apply_update(&mut self, incoming: Self) {
        self.gtdb_taxonomy_string = incoming.gtdb_taxonomy_string;
        self.gtdb_taxonomy_last = incoming.gtdb_taxonomy_last;
        self.gtdb_taxonomy_rank = incoming.gtdb_taxonomy_rank;
        self.source = incoming.source;
        self.protein_type = incoming.protein_type;
        self.domains = incoming.domains;
        self.domain_combination_type = incoming.domain_combination_type;
        self.count_raw = incoming.count_raw;
        self.count_normalized_by_total_genomes = incoming.count_normalized_by_total_genomes;
        self.count_normalized_by_genome_size_by_total_genomes =
            incoming.count_normalized_by_genome_size_by_total_genomes;
        self.count_normalized_by_total_proteins_by_total_genomes =
            incoming.count_normalized_by_total_proteins_by_total_genomes;
    }
}
