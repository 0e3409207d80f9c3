//! Closed value sets for choice-typed columns.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Signal transduction protein class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProteinType {
    /// Histidine kinase.
    #[serde(rename = "HK")]
    Hk,
    /// Response regulator.
    #[serde(rename = "rr")]
    Rr,
    /// One-component system.
    #[serde(rename = "ocs")]
    Ocs,
}

impl ProteinType {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Hk => "HK",
            Self::Rr => "rr",
            Self::Ocs => "ocs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HK" => Some(Self::Hk),
            "rr" => Some(Self::Rr),
            "ocs" => Some(Self::Ocs),
            _ => None,
        }
    }
}

/// Pipeline that produced a statistics row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// MiST database annotations.
    Mist,
    /// Pfam models with relaxed thresholds.
    Rmodels,
}

impl Source {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Mist => "mist",
            Self::Rmodels => "rmodels",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mist" => Some(Self::Mist),
            "rmodels" => Some(Self::Rmodels),
            _ => None,
        }
    }
}

/// How the `domains` list of a statistics row was aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainCombinationType {
    Domain,
    DomainComb,
    Superfamily,
    SuperfamilyComb,
}

impl DomainCombinationType {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::DomainComb => "domain_comb",
            Self::Superfamily => "superfamily",
            Self::SuperfamilyComb => "superfamily_comb",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "domain" => Some(Self::Domain),
            "domain_comb" => Some(Self::DomainComb),
            "superfamily" => Some(Self::Superfamily),
            "superfamily_comb" => Some(Self::SuperfamilyComb),
            _ => None,
        }
    }
}

/// The only taxonomy namespace taxon statistics are validated against.
pub const GTDB_NAMESPACE: &str = "gtdb";

/// Seven-level taxonomy rank shared by the GTDB and NCBI columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonRank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl TaxonRank {
    pub const ALL: [TaxonRank; 7] = [
        Self::Kingdom,
        Self::Phylum,
        Self::Class,
        Self::Order,
        Self::Family,
        Self::Genus,
        Self::Species,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kingdom => "kingdom",
            Self::Phylum => "phylum",
            Self::Class => "class",
            Self::Order => "order",
            Self::Family => "family",
            Self::Genus => "genus",
            Self::Species => "species",
        }
    }

    /// Column of `genome_metadata` holding this rank in the GTDB taxonomy.
    pub fn gtdb_column(self) -> &'static str {
        match self {
            Self::Kingdom => "gtdb_kingdom",
            Self::Phylum => "gtdb_phylum",
            Self::Class => "gtdb_class",
            Self::Order => "gtdb_order",
            Self::Family => "gtdb_family",
            Self::Genus => "gtdb_genus",
            Self::Species => "gtdb_species",
        }
    }

    /// Resolves a raw rank cell through its `gtdb_<rank>` reference column.
    ///
    /// Returns `None` when the prefixed name is not a known column, so an
    /// unknown rank can never reach SQL as an identifier.
    pub fn from_reference_column(rank: &str) -> Option<Self> {
        let column = format!("{GTDB_NAMESPACE}_{rank}");
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.gtdb_column() == column)
    }
}

impl Display for TaxonRank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
