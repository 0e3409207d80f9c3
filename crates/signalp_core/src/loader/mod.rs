//! Batch reconciling TSV loaders.
//!
//! # Responsibility
//! - Read one TSV file per invocation and upsert its rows into the store by
//!   natural key.
//! - Gate every statistics row on the genome or taxon it references.
//! - Write all changes of one invocation atomically.
//!
//! # Invariants
//! - Each invocation runs inside exactly one transaction; any failure rolls
//!   back every write made by that invocation.
//! - Row-level defects are logged and skipped; store-level defects abort.
//! - Rerunning a loader on the same file converges to the same store state.

pub mod coerce;
mod genome_metadata;
mod per_genome;
mod per_protein;
mod per_taxon;
mod reconcile;
mod tsv;
mod validate;
mod writer;

pub use genome_metadata::load_genome_metadata;
pub use per_genome::load_domain_statistics_per_genome;
pub use per_protein::load_domain_statistics_per_protein;
pub use per_taxon::load_domain_statistics_per_taxon;

use crate::repo::genome_repo::RepoError;
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tsv::TsvRow;
use uuid::Uuid;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub const DEFAULT_GENOME_METADATA_PATH: &str = "input/ar_bac_metadata_r214_db.tsv";
pub const DEFAULT_PER_PROTEIN_PATH: &str = "input/per_protein_combined_db.tsv";
pub const DEFAULT_PER_GENOME_PATH: &str = "input/per_genome_combined_db.tsv";
pub const DEFAULT_PER_TAXON_PATH: &str = "input/per_taxon_combined_db.tsv";

pub type LoadResult<T> = Result<T, LoadError>;

/// Loader failure. Every variant aborts the invocation.
#[derive(Debug)]
pub enum LoadError {
    /// Input path does not name a regular file.
    FileNotFound(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Input is not decodable as UTF-8 TSV.
    Tsv {
        path: PathBuf,
        source: csv::Error,
    },
    /// A choice-typed cell names no known choice.
    InvalidChoice {
        row: u64,
        column: &'static str,
        value: String,
    },
    InvalidBatchSize(usize),
    /// Store failure; the invocation's transaction was rolled back.
    Repo(RepoError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileNotFound(path) => write!(f, "input file not found: {}", path.display()),
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Tsv { path, source } => {
                write!(f, "malformed TSV in `{}`: {source}", path.display())
            }
            Self::InvalidChoice { row, column, value } => {
                write!(f, "row {row}: invalid value `{value}` for column `{column}`")
            }
            Self::InvalidBatchSize(size) => {
                write!(f, "batch size must be at least 1, got {size}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Tsv { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LoadError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for LoadError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Per-invocation loader options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Input TSV; `None` selects the loader's default path.
    pub file_path: Option<PathBuf>,
    /// Records per write chunk. Must be at least 1.
    pub batch_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            file_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl LoadOptions {
    pub fn with_file(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            ..Self::default()
        }
    }
}

/// Counts reported by a committed invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl Display for LoadSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created={} updated={} skipped={}",
            self.created, self.updated, self.skipped
        )
    }
}

/// Identity of one loader invocation, carried into every log line.
pub(crate) struct LoadContext {
    pub(crate) loader: &'static str,
    pub(crate) run_id: Uuid,
    pub(crate) batch_size: usize,
}

/// Runs one invocation: resolve input, read rows, reconcile and write in a
/// single transaction, then log the outcome.
pub(crate) fn run_load<F>(
    conn: &mut Connection,
    options: &LoadOptions,
    loader: &'static str,
    default_path: &str,
    body: F,
) -> LoadResult<LoadSummary>
where
    F: FnOnce(&Transaction<'_>, &LoadContext, Vec<TsvRow>) -> LoadResult<LoadSummary>,
{
    if options.batch_size == 0 {
        return Err(LoadError::InvalidBatchSize(options.batch_size));
    }
    let path = resolve_input(options.file_path.as_deref(), default_path)?;

    let ctx = LoadContext {
        loader,
        run_id: Uuid::new_v4(),
        batch_size: options.batch_size,
    };
    let started_at = Instant::now();
    info!(
        "event=load_run module=loader status=start loader={} run_id={} path={} batch_size={}",
        ctx.loader,
        ctx.run_id,
        path.display(),
        ctx.batch_size
    );

    let result = execute(conn, &path, &ctx, body);
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(summary) => info!(
            "event=load_run module=loader status=ok loader={} run_id={} created={} updated={} skipped={} duration_ms={duration_ms}",
            ctx.loader, ctx.run_id, summary.created, summary.updated, summary.skipped
        ),
        Err(err) => error!(
            "event=load_run module=loader status=rolled_back loader={} run_id={} duration_ms={duration_ms} error={err}",
            ctx.loader, ctx.run_id
        ),
    }
    result
}

fn execute<F>(
    conn: &mut Connection,
    path: &Path,
    ctx: &LoadContext,
    body: F,
) -> LoadResult<LoadSummary>
where
    F: FnOnce(&Transaction<'_>, &LoadContext, Vec<TsvRow>) -> LoadResult<LoadSummary>,
{
    let rows = tsv::read_rows(path)?;
    // Dropping the transaction on any early return rolls it back.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let summary = body(&tx, ctx, rows)?;
    tx.commit()?;
    Ok(summary)
}

fn resolve_input(file_path: Option<&Path>, default_path: &str) -> LoadResult<PathBuf> {
    let path = file_path.map_or_else(|| PathBuf::from(default_path), Path::to_path_buf);
    if !path.is_file() {
        return Err(LoadError::FileNotFound(path));
    }
    Ok(path)
}
