use crate::loader::coerce::parse_int_or_null;
use crate::loader::reconcile::Staging;
use crate::loader::tsv::TsvRow;
use crate::loader::validate::{accept_rows, distinct_values};
use crate::loader::writer::write_batched;
use crate::loader::{
    run_load, LoadOptions, LoadResult, LoadSummary, DEFAULT_GENOME_METADATA_PATH,
};
use crate::model::choices::{TaxonRank, GTDB_NAMESPACE};
use crate::model::genome::{GenomeMetadata, Taxonomy};
use crate::repo::genome_repo::{GenomeRepository, SqliteGenomeRepository};
use rusqlite::Connection;

const REQUIRED_COLUMNS: &[&str] = &["genome_version"];

/// Upserts genome metadata keyed by `genome_version`.
///
/// # Errors
/// - [`crate::loader::LoadError::FileNotFound`] before any state is touched.
/// - Store failures roll back the whole invocation.
pub fn load_genome_metadata(
    conn: &mut Connection,
    options: &LoadOptions,
) -> LoadResult<LoadSummary> {
    run_load(
        conn,
        options,
        "genome_metadata",
        DEFAULT_GENOME_METADATA_PATH,
        |tx, ctx, rows| {
            let mut summary = LoadSummary::default();
            let rows = accept_rows(ctx, rows, REQUIRED_COLUMNS, &mut summary.skipped);

            let repo = SqliteGenomeRepository::try_new(tx)?;
            let existing = repo.find_by_versions(&distinct_values(&rows, "genome_version"))?;

            let mut staging = Staging::new(existing);
            for row in &rows {
                staging.stage(genome_from_row(row));
            }

            let mut plan = staging.into_plan();
            write_batched(ctx, &repo, &mut plan)?;
            summary.updated = plan.updates.len();
            summary.created = plan.creates.len();
            Ok(summary)
        },
    )
}

fn genome_from_row(row: &TsvRow) -> GenomeMetadata {
    let mut genome = GenomeMetadata::new(row.required("genome_version"));
    genome.genome_accession = row.owned("genome_accession");
    genome.genome_size = parse_int_or_null(row.get("genome_size"));
    genome.protein_count = parse_int_or_null(row.get("protein_count"));
    genome.gtdb = taxonomy_from_row(row, GTDB_NAMESPACE);
    genome.ncbi = taxonomy_from_row(row, "ncbi");
    genome
}

fn taxonomy_from_row(row: &TsvRow, namespace: &str) -> Taxonomy {
    let mut taxonomy = Taxonomy::default();
    for rank in TaxonRank::ALL {
        taxonomy.set_rank(rank, row.owned(&format!("{namespace}_{}", rank.as_str())));
    }
    taxonomy
}
