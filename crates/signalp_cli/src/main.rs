//! `signalp` command-line entry point.
//!
//! # Responsibility
//! - Map subcommands onto the core loaders and domain search.
//! - Own process-level concerns: logging setup, exit codes, user output.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::error;
use signalp_core::{
    default_log_level, init_logging, load_domain_statistics_per_genome,
    load_domain_statistics_per_protein, load_domain_statistics_per_taxon, load_genome_metadata,
    open_db, search_domains, DomainSearchQuery, LoadOptions, LoadResult, LoadSummary,
    SearchScope,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "signalp")]
#[command(about = "Load and search genome, protein-domain and taxon statistics", long_about = None)]
struct Cli {
    /// SQLite database file; created and migrated on first use.
    #[arg(long, global = true, default_value = "signalp.sqlite3")]
    db: PathBuf,

    /// trace | debug | info | warn | error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write rotating log files here instead of stderr.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upsert genome metadata (reference data for every other loader)
    LoadGenomeMetadata(LoadArgs),
    /// Upsert per-protein domain statistics
    LoadPerProteinStats(LoadArgs),
    /// Upsert per-genome domain statistics
    LoadPerGenomeStats(LoadArgs),
    /// Upsert per-taxon domain statistics and link them to genomes
    LoadPerTaxonStats(LoadArgs),
    /// Full-text search over domain names
    Search {
        #[arg(long, value_enum, default_value_t = ScopeArg::Protein)]
        scope: ScopeArg,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Pass the query to FTS5 unescaped.
        #[arg(long, default_value_t = false)]
        raw: bool,

        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[derive(Args)]
struct LoadArgs {
    /// Input TSV; defaults to the loader's file under `input/`.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Records per write chunk.
    #[arg(long, default_value_t = signalp_core::loader::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

impl LoadArgs {
    fn options(&self) -> LoadOptions {
        LoadOptions {
            file_path: self.file.clone(),
            batch_size: self.batch_size,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Protein,
    Genome,
    Taxon,
}

impl From<ScopeArg> for SearchScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Protein => Self::Protein,
            ScopeArg::Genome => Self::Genome,
            ScopeArg::Taxon => Self::Taxon,
        }
    }
}

type Loader = fn(&mut Connection, &LoadOptions) -> LoadResult<LoadSummary>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_logging(level, cli.log_dir.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut conn = open_db(&cli.db).map_err(|err| err.to_string())?;

    let (name, loader, args): (&str, Loader, LoadArgs) = match cli.cmd {
        Commands::LoadGenomeMetadata(args) => ("genome metadata", load_genome_metadata, args),
        Commands::LoadPerProteinStats(args) => (
            "per-protein statistics",
            load_domain_statistics_per_protein,
            args,
        ),
        Commands::LoadPerGenomeStats(args) => (
            "per-genome statistics",
            load_domain_statistics_per_genome,
            args,
        ),
        Commands::LoadPerTaxonStats(args) => (
            "per-taxon statistics",
            load_domain_statistics_per_taxon,
            args,
        ),
        Commands::Search {
            scope,
            limit,
            raw,
            text,
        } => {
            let mut query = DomainSearchQuery::new(scope.into(), text.join(" "));
            query.limit = limit;
            query.raw_fts_syntax = raw;
            let hits = search_domains(&conn, &query).map_err(|err| err.to_string())?;
            for hit in &hits {
                println!("{}\t{}\t{}", hit.record_id, hit.label, hit.snippet);
            }
            return Ok(());
        }
    };

    let summary = loader(&mut conn, &args.options()).map_err(|err| err.to_string())?;
    println!("Successfully loaded {name}: {summary}");
    Ok(())
}
