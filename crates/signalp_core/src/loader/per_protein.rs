use crate::loader::coerce::{parse_domain_counts_or_null, parse_int_or_null};
use crate::loader::reconcile::Staging;
use crate::loader::tsv::TsvRow;
use crate::loader::validate::{
    accept_rows, distinct_values, parse_choice_cell, skip_unknown_reference,
};
use crate::loader::writer::write_batched;
use crate::loader::{run_load, LoadOptions, LoadResult, LoadSummary, DEFAULT_PER_PROTEIN_PATH};
use crate::model::choices::{ProteinType, Source};
use crate::model::stats::PerProteinRecord;
use crate::repo::genome_repo::{GenomeRepository, SqliteGenomeRepository};
use crate::repo::protein_stats_repo::{ProteinStatsRepository, SqliteProteinStatsRepository};
use rusqlite::Connection;

const REQUIRED_COLUMNS: &[&str] = &["mist_protein_accession", "genome", "source", "protein_type"];

/// Upserts per-protein domain statistics keyed by `mist_protein_accession`.
///
/// Rows naming a genome absent from genome metadata are skipped.
pub fn load_domain_statistics_per_protein(
    conn: &mut Connection,
    options: &LoadOptions,
) -> LoadResult<LoadSummary> {
    run_load(
        conn,
        options,
        "per_protein",
        DEFAULT_PER_PROTEIN_PATH,
        |tx, ctx, rows| {
            let mut summary = LoadSummary::default();
            let rows = accept_rows(ctx, rows, REQUIRED_COLUMNS, &mut summary.skipped);

            let genomes = SqliteGenomeRepository::try_new(tx)?
                .find_by_versions(&distinct_values(&rows, "genome"))?;
            let repo = SqliteProteinStatsRepository::try_new(tx)?;
            let existing =
                repo.find_by_accessions(&distinct_values(&rows, "mist_protein_accession"))?;

            let mut staging = Staging::new(existing);
            for row in &rows {
                let genome_version = row.required("genome");
                if !genomes.contains_key(genome_version) {
                    skip_unknown_reference(ctx, row, "genome", genome_version, &mut summary.skipped);
                    continue;
                }
                staging.stage(protein_from_row(row)?);
            }

            let mut plan = staging.into_plan();
            write_batched(ctx, &repo, &mut plan)?;
            summary.updated = plan.updates.len();
            summary.created = plan.creates.len();
            Ok(summary)
        },
    )
}

fn protein_from_row(row: &TsvRow) -> LoadResult<PerProteinRecord> {
    Ok(PerProteinRecord {
        id: None,
        genome_version: row.required("genome").to_string(),
        genome_accession: row.owned("genome_accession"),
        ncbi_protein_accession: row.owned("ncbi_protein_accession"),
        mist_protein_accession: row.required("mist_protein_accession").to_string(),
        protein_type: parse_choice_cell(row, "protein_type", ProteinType::parse)?,
        source: parse_choice_cell(row, "source", Source::parse)?,
        protein_length: parse_int_or_null(row.get("protein_length")),
        domain_architecture: row.owned("domain_architecture"),
        sensors_or_regulators: row.owned("sensors_or_regulators"),
        domain_counts: parse_domain_counts_or_null(row.get("domain_counts")),
        domains: row.owned("domains"),
    })
}
