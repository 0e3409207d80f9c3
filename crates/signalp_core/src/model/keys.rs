//! Composite natural keys and the reconciliation contract over them.
//!
//! # Invariants
//! - Two records with equal keys denote the same stored row.
//! - Key shapes are fixed per record type; there is no untyped tuple key.

use crate::model::choices::{DomainCombinationType, ProteinType, Source};
use std::hash::Hash;

/// Record type that can be matched to stored state by a natural key.
pub trait NaturallyKeyed {
    type Key: Clone + Eq + Hash;

    fn natural_key(&self) -> Self::Key;

    /// Storage id, present only for records read back from the store.
    fn storage_id(&self) -> Option<i64>;

    /// Copies every mutable field of `incoming` onto `self`, keeping the
    /// storage id of `self`.
    fn apply_update(&mut self, incoming: Self);
}

/// Identity of one per-genome statistics row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenomeStatsKey {
    genome_version: String,
    source: Source,
    protein_type: ProteinType,
    domains: String,
    domain_combination_type: DomainCombinationType,
}

impl GenomeStatsKey {
    pub fn new(
        genome_version: impl Into<String>,
        source: Source,
        protein_type: ProteinType,
        domains: impl Into<String>,
        domain_combination_type: DomainCombinationType,
    ) -> Self {
        Self {
            genome_version: genome_version.into(),
            source,
            protein_type,
            domains: domains.into(),
            domain_combination_type,
        }
    }

    pub fn genome_version(&self) -> &str {
        &self.genome_version
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn protein_type(&self) -> ProteinType {
        self.protein_type
    }

    pub fn domains(&self) -> &str {
        &self.domains
    }

    pub fn domain_combination_type(&self) -> DomainCombinationType {
        self.domain_combination_type
    }
}

/// Identity of one per-taxon statistics row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxonStatsKey {
    taxonomy_string: String,
    source: Source,
    protein_type: ProteinType,
    domains: String,
    domain_combination_type: DomainCombinationType,
}

impl TaxonStatsKey {
    pub fn new(
        taxonomy_string: impl Into<String>,
        source: Source,
        protein_type: ProteinType,
        domains: impl Into<String>,
        domain_combination_type: DomainCombinationType,
    ) -> Self {
        Self {
            taxonomy_string: taxonomy_string.into(),
            source,
            protein_type,
            domains: domains.into(),
            domain_combination_type,
        }
    }

    pub fn taxonomy_string(&self) -> &str {
        &self.taxonomy_string
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn protein_type(&self) -> ProteinType {
        self.protein_type
    }

    pub fn domains(&self) -> &str {
        &self.domains
    }

    pub fn domain_combination_type(&self) -> DomainCombinationType {
        self.domain_combination_type
    }
}
