use crate::loader::coerce::{parse_decimal_or_null, parse_int_or_null};
use crate::loader::reconcile::Staging;
use crate::loader::tsv::TsvRow;
use crate::loader::validate::{
    accept_rows, distinct_values, parse_choice_cell, skip_unknown_reference,
};
use crate::loader::writer::write_batched;
use crate::loader::{
    run_load, LoadContext, LoadOptions, LoadResult, LoadSummary, DEFAULT_PER_TAXON_PATH,
};
use crate::model::choices::{DomainCombinationType, ProteinType, Source, TaxonRank};
use crate::model::stats::PerTaxonRecord;
use crate::repo::genome_repo::{GenomeRepository, RepoResult, SqliteGenomeRepository};
use crate::repo::taxon_stats_repo::{SqliteTaxonStatsRepository, TaxonStatsRepository};
use log::{info, warn};
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const REQUIRED_COLUMNS: &[&str] = &[
    "gtdb_taxonomy_string",
    "source",
    "protein_type",
    "domains",
    "domain_combination_type",
];

/// Upserts per-taxon domain statistics keyed by
/// `(gtdb_taxonomy_string, source, protein_type, domains,
/// domain_combination_type)`, then links each written record to its genomes.
///
/// A row is accepted only when its `gtdb_taxonomy_last` occurs in
/// `genome_metadata.gtdb_<gtdb_taxonomy_rank>`.
pub fn load_domain_statistics_per_taxon(
    conn: &mut Connection,
    options: &LoadOptions,
) -> LoadResult<LoadSummary> {
    run_load(
        conn,
        options,
        "per_taxon",
        DEFAULT_PER_TAXON_PATH,
        |tx, ctx, rows| {
            let mut summary = LoadSummary::default();
            let rows = accept_rows(ctx, rows, REQUIRED_COLUMNS, &mut summary.skipped);

            let genome_repo = SqliteGenomeRepository::try_new(tx)?;
            let valid_taxa = valid_taxa_by_rank(ctx, &genome_repo, &rows)?;
            let repo = SqliteTaxonStatsRepository::try_new(tx)?;
            let existing =
                repo.find_by_taxonomy_strings(&distinct_values(&rows, "gtdb_taxonomy_string"))?;

            let mut staging = Staging::new(existing);
            for row in &rows {
                let rank = row.get("gtdb_taxonomy_rank").unwrap_or_default();
                let last = row.get("gtdb_taxonomy_last").unwrap_or_default();
                let known = valid_taxa
                    .get(rank)
                    .is_some_and(|valid| valid.contains(last));
                if !known {
                    skip_unknown_reference(ctx, row, "taxon", last, &mut summary.skipped);
                    continue;
                }
                staging.stage(taxon_stats_from_row(row)?);
            }

            let mut plan = staging.into_plan();
            write_batched(ctx, &repo, &mut plan)?;
            let removed = unlink_updated_records(&repo, &plan.updates)?;
            let links = link_written_records(&repo, plan.updates.iter().chain(&plan.creates))?;
            info!(
                "event=taxon_links module=loader status=ok loader={} run_id={} removed={removed} created={links}",
                ctx.loader, ctx.run_id
            );

            summary.updated = plan.updates.len();
            summary.created = plan.creates.len();
            Ok(summary)
        },
    )
}

/// Valid `gtdb_taxonomy_last` values per raw rank cell.
///
/// Ranks that do not name a GTDB rank column get an empty set.
fn valid_taxa_by_rank(
    ctx: &LoadContext,
    genome_repo: &SqliteGenomeRepository<'_>,
    rows: &[TsvRow],
) -> RepoResult<HashMap<String, HashSet<String>>> {
    let mut lasts_by_rank: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        let rank = row.get("gtdb_taxonomy_rank").unwrap_or_default();
        let entry = lasts_by_rank.entry(rank.to_string()).or_default();
        if let Some(last) = row.owned("gtdb_taxonomy_last") {
            entry.insert(last);
        }
    }

    let mut valid = HashMap::with_capacity(lasts_by_rank.len());
    for (rank, lasts) in lasts_by_rank {
        let taxa = match TaxonRank::from_reference_column(&rank) {
            Some(taxon_rank) => genome_repo.existing_gtdb_taxa(taxon_rank, &lasts)?,
            None => {
                warn!(
                    "event=unknown_rank module=loader status=skipped loader={} run_id={} rank={rank:?} taxa={}",
                    ctx.loader,
                    ctx.run_id,
                    lasts.len()
                );
                HashSet::new()
            }
        };
        valid.insert(rank, taxa);
    }
    Ok(valid)
}

/// Clears the links of updated records, whose rank or taxon may have changed.
fn unlink_updated_records(
    repo: &SqliteTaxonStatsRepository<'_>,
    records: &[PerTaxonRecord],
) -> RepoResult<usize> {
    let mut removed = 0;
    for taxon_id in records.iter().filter_map(|record| record.id) {
        removed += repo.unlink_genomes(taxon_id)?;
    }
    Ok(removed)
}

fn link_written_records<'a>(
    repo: &SqliteTaxonStatsRepository<'_>,
    records: impl Iterator<Item = &'a PerTaxonRecord>,
) -> RepoResult<usize> {
    let mut created = 0;
    for record in records {
        let rank = record
            .gtdb_taxonomy_rank
            .as_deref()
            .and_then(TaxonRank::from_reference_column);
        if let (Some(taxon_id), Some(rank)) = (record.id, rank) {
            created += repo.link_genomes(taxon_id, rank, &record.gtdb_taxonomy_last)?;
        }
    }
    Ok(created)
}

fn taxon_stats_from_row(row: &TsvRow) -> LoadResult<PerTaxonRecord> {
    Ok(PerTaxonRecord {
        id: None,
        gtdb_taxonomy_string: row.required("gtdb_taxonomy_string").to_string(),
        gtdb_taxonomy_last: row.required("gtdb_taxonomy_last").to_string(),
        gtdb_taxonomy_rank: row.owned("gtdb_taxonomy_rank"),
        source: parse_choice_cell(row, "source", Source::parse)?,
        protein_type: parse_choice_cell(row, "protein_type", ProteinType::parse)?,
        domains: row.required("domains").to_string(),
        domain_combination_type: parse_choice_cell(
            row,
            "domain_combination_type",
            DomainCombinationType::parse,
        )?,
        count_raw: parse_int_or_null(row.get("count_raw")),
        count_normalized_by_total_genomes: parse_decimal_or_null(
            row.get("count_normalized_by_total_genomes"),
        ),
        count_normalized_by_genome_size_by_total_genomes: parse_decimal_or_null(
            row.get("count_normalized_by_genome_size_by_total_genomes"),
        ),
        count_normalized_by_total_proteins_by_total_genomes: parse_decimal_or_null(
            row.get("count_normalized_by_total_proteins_by_total_genomes"),
        ),
    })
}
