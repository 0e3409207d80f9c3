mod common;

use common::{capture_logs, captured_lines, count_rows, options_for, seed_genomes, tsv_file};
use signalp_core::{
    load_domain_statistics_per_protein, open_db_in_memory, LoadError, Page, ProteinStatsQuery,
    ProteinStatsRepository, ProteinType, Source, SqliteProteinStatsRepository,
};

const HEADER: &[&str] = &[
    "genome",
    "genome_accession",
    "ncbi_protein_accession",
    "mist_protein_accession",
    "protein_type",
    "source",
    "protein_length",
    "domain_architecture",
    "sensors_or_regulators",
    "domain_counts",
    "domains",
];

fn protein_row<'a>(genome: &'a str, accession: &'a str, length: &'a str, counts: &'a str) -> Vec<&'a str> {
    vec![
        genome,
        "GCA_0001",
        "WP_000001",
        accession,
        "HK",
        "mist",
        length,
        "PAS-HisKA-HATPase_c",
        "sensor",
        counts,
        "PAS HisKA HATPase_c",
    ]
}

#[test]
fn rows_for_unknown_genomes_are_skipped() {
    capture_logs();
    let mut conn = open_db_in_memory().unwrap();
    seed_genomes(&mut conn, &[("G1", "Pseudomonadota", "Escherichia")]);

    let file = tsv_file(
        HEADER,
        &[
            protein_row("G1", "P1", "350", "{'PAS': 1, 'HisKA': 1}"),
            protein_row("G9", "P9", "410", "{}"),
        ],
    );
    let summary = load_domain_statistics_per_protein(&mut conn, &options_for(&file)).unwrap();
    assert_eq!((summary.created, summary.updated, summary.skipped), (1, 0, 1));
    assert_eq!(count_rows(&conn, "domain_statistics_per_protein"), 1);

    let repo = SqliteProteinStatsRepository::try_new(&conn).unwrap();
    let stored = repo.get_by_accession("P1").unwrap().unwrap();
    assert_eq!(stored.genome_version, "G1");
    assert_eq!(stored.protein_type, ProteinType::Hk);
    assert_eq!(stored.source, Source::Mist);
    assert_eq!(stored.protein_length, Some(350));
    let counts = stored.domain_counts.unwrap();
    assert_eq!(counts.get("PAS"), Some(1));
    assert_eq!(counts.get("HisKA"), Some(1));
    assert!(repo.get_by_accession("P9").unwrap().is_none());

    assert!(captured_lines().iter().any(|line| line.starts_with("WARN")
        && line.contains("reason=unknown_genome")
        && line.contains("value=G9")
        && line.contains("'mist_protein_accession': 'P9'")));
}

#[test]
fn rerun_updates_by_accession_without_duplicates() {
    let mut conn = open_db_in_memory().unwrap();
    seed_genomes(&mut conn, &[("G1", "Pseudomonadota", "Escherichia")]);

    let first = tsv_file(HEADER, &[protein_row("G1", "P1", "350", "")]);
    load_domain_statistics_per_protein(&mut conn, &options_for(&first)).unwrap();

    let second = tsv_file(HEADER, &[protein_row("G1", "P1", "not-a-length", r#"{"PAS": 2}"#)]);
    let summary = load_domain_statistics_per_protein(&mut conn, &options_for(&second)).unwrap();
    assert_eq!((summary.created, summary.updated), (0, 1));
    assert_eq!(count_rows(&conn, "domain_statistics_per_protein"), 1);

    let repo = SqliteProteinStatsRepository::try_new(&conn).unwrap();
    let stored = repo.get_by_accession("P1").unwrap().unwrap();
    assert_eq!(stored.protein_length, None);
    assert_eq!(stored.domain_counts.unwrap().get("PAS"), Some(2));
}

#[test]
fn repeated_accession_keeps_the_last_row() {
    let mut conn = open_db_in_memory().unwrap();
    seed_genomes(&mut conn, &[("G1", "Pseudomonadota", "Escherichia")]);

    let file = tsv_file(
        HEADER,
        &[
            protein_row("G1", "P1", "100", ""),
            protein_row("G1", "P1", "200", ""),
        ],
    );
    let summary = load_domain_statistics_per_protein(&mut conn, &options_for(&file)).unwrap();
    assert_eq!(summary.created, 1);

    let repo = SqliteProteinStatsRepository::try_new(&conn).unwrap();
    let stored = repo.get_by_accession("P1").unwrap().unwrap();
    assert_eq!(stored.protein_length, Some(200));
}

#[test]
fn unknown_protein_type_aborts_without_writes() {
    let mut conn = open_db_in_memory().unwrap();
    seed_genomes(&mut conn, &[("G1", "Pseudomonadota", "Escherichia")]);

    let mut bad = protein_row("G1", "P2", "120", "");
    bad[4] = "kinase";
    let file = tsv_file(HEADER, &[protein_row("G1", "P1", "100", ""), bad]);

    let err = load_domain_statistics_per_protein(&mut conn, &options_for(&file)).unwrap_err();
    match err {
        LoadError::InvalidChoice { row, column, value } => {
            assert_eq!(row, 2);
            assert_eq!(column, "protein_type");
            assert_eq!(value, "kinase");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&conn, "domain_statistics_per_protein"), 0);
}

#[test]
fn list_filters_by_genome_and_length() {
    let mut conn = open_db_in_memory().unwrap();
    seed_genomes(
        &mut conn,
        &[
            ("G1", "Pseudomonadota", "Escherichia"),
            ("G2", "Pseudomonadota", "Salmonella"),
        ],
    );
    let file = tsv_file(
        HEADER,
        &[
            protein_row("G1", "P1", "100", ""),
            protein_row("G1", "P2", "300", ""),
            protein_row("G1", "P3", "500", ""),
            protein_row("G2", "P4", "300", ""),
        ],
    );
    load_domain_statistics_per_protein(&mut conn, &options_for(&file)).unwrap();

    let repo = SqliteProteinStatsRepository::try_new(&conn).unwrap();
    let hits = repo
        .list(&ProteinStatsQuery {
            genome_version: Some("G1".to_string()),
            protein_length_min: Some(200),
            protein_length_max: Some(600),
            page: Page::default(),
        })
        .unwrap();
    let accessions: Vec<_> = hits
        .iter()
        .map(|record| record.mist_protein_accession.as_str())
        .collect();
    assert_eq!(accessions, vec!["P2", "P3"]);
}
