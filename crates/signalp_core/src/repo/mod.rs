//! Repository layer over the SQLite statistics store.
//!
//! # Responsibility
//! - Batched natural-key lookups used to build loader reference indexes.
//! - Chunk-level bulk update/insert used by the batched writer.
//! - Paginated read queries for consumers of the loaded data.
//!
//! # Invariants
//! - Repositories only accept connections migrated to the latest schema.
//! - Width, choice and precision violations are reported by the store, never
//!   silently truncated.

pub mod genome_repo;
pub mod genome_stats_repo;
pub mod protein_stats_repo;
mod schema;
pub mod taxon_stats_repo;

use crate::repo::genome_repo::RepoResult;

const PAGE_DEFAULT_LIMIT: u32 = 10;
const PAGE_LIMIT_MAX: u32 = 100;

/// Chunk-level write access used by the batched writer.
///
/// Implementations run inside the caller's transaction and never commit.
pub trait BulkWriter<R> {
    /// Rewrites every mutable column of already-stored records.
    fn update_chunk(&self, records: &[R]) -> RepoResult<()>;
    /// Inserts new records and assigns their storage ids.
    fn insert_chunk(&self, records: &mut [R]) -> RepoResult<()>;
}

/// Limit/offset pagination for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Rows per page. Defaults to 10 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Effective page size after defaulting and clamping.
    pub fn effective_limit(&self) -> u32 {
        match self.limit {
            Some(0) | None => PAGE_DEFAULT_LIMIT,
            Some(value) if value > PAGE_LIMIT_MAX => PAGE_LIMIT_MAX,
            Some(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn page_limit_defaults_and_clamps() {
        assert_eq!(Page::default().effective_limit(), 10);
        assert_eq!(Page::new(0, 0).effective_limit(), 10);
        assert_eq!(Page::new(25, 0).effective_limit(), 25);
        assert_eq!(Page::new(500, 0).effective_limit(), 100);
    }
}
