use crate::loader::coerce::{parse_decimal_or_null, parse_int_or_null};
use crate::loader::reconcile::Staging;
use crate::loader::tsv::TsvRow;
use crate::loader::validate::{
    accept_rows, distinct_values, parse_choice_cell, skip_unknown_reference,
};
use crate::loader::writer::write_batched;
use crate::loader::{run_load, LoadOptions, LoadResult, LoadSummary, DEFAULT_PER_GENOME_PATH};
use crate::model::choices::{DomainCombinationType, ProteinType, Source};
use crate::model::stats::PerGenomeRecord;
use crate::repo::genome_repo::{GenomeRepository, SqliteGenomeRepository};
use crate::repo::genome_stats_repo::{GenomeStatsRepository, SqliteGenomeStatsRepository};
use rusqlite::Connection;

const REQUIRED_COLUMNS: &[&str] = &[
    "genome",
    "source",
    "protein_type",
    "domains",
    "domain_combination_type",
];

/// Upserts per-genome domain statistics keyed by
/// `(genome, source, protein_type, domains, domain_combination_type)`.
pub fn load_domain_statistics_per_genome(
    conn: &mut Connection,
    options: &LoadOptions,
) -> LoadResult<LoadSummary> {
    run_load(
        conn,
        options,
        "per_genome",
        DEFAULT_PER_GENOME_PATH,
        |tx, ctx, rows| {
            let mut summary = LoadSummary::default();
            let rows = accept_rows(ctx, rows, REQUIRED_COLUMNS, &mut summary.skipped);

            let versions = distinct_values(&rows, "genome");
            let genomes = SqliteGenomeRepository::try_new(tx)?.find_by_versions(&versions)?;
            let repo = SqliteGenomeStatsRepository::try_new(tx)?;
            let existing = repo.find_by_genome_versions(&versions)?;

            let mut staging = Staging::new(existing);
            for row in &rows {
                let genome_version = row.required("genome");
                if !genomes.contains_key(genome_version) {
                    skip_unknown_reference(ctx, row, "genome", genome_version, &mut summary.skipped);
                    continue;
                }
                staging.stage(genome_stats_from_row(row)?);
            }

            let mut plan = staging.into_plan();
            write_batched(ctx, &repo, &mut plan)?;
            summary.updated = plan.updates.len();
            summary.created = plan.creates.len();
            Ok(summary)
        },
    )
}

fn genome_stats_from_row(row: &TsvRow) -> LoadResult<PerGenomeRecord> {
    Ok(PerGenomeRecord {
        id: None,
        genome_version: row.required("genome").to_string(),
        genome_accession: row.owned("genome_accession"),
        source: parse_choice_cell(row, "source", Source::parse)?,
        protein_type: parse_choice_cell(row, "protein_type", ProteinType::parse)?,
        domains: row.required("domains").to_string(),
        domain_combination_type: parse_choice_cell(
            row,
            "domain_combination_type",
            DomainCombinationType::parse,
        )?,
        count_raw: parse_int_or_null(row.get("count_raw")),
        count_normalized_by_genome_size: parse_decimal_or_null(
            row.get("count_normalized_by_genome_size"),
        ),
        count_normalized_by_total_proteins: parse_decimal_or_null(
            row.get("count_normalized_by_total_proteins"),
        ),
    })
}
