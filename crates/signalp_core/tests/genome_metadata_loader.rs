mod common;

use common::{
    capture_logs, captured_lines, count_rows, options_for, seed_genomes, tsv_file, GENOME_HEADER,
};
use signalp_core::{
    load_genome_metadata, open_db_in_memory, GenomeRepository, LoadError, LoadOptions, Page,
    SqliteGenomeRepository,
};

#[test]
fn first_load_creates_and_rerun_updates() {
    let mut conn = open_db_in_memory().unwrap();
    let file = tsv_file(
        GENOME_HEADER,
        &[
            vec!["G1", "GCA_1", "100", "10", "Bacteria", "Pseudomonadota", "", "", "", "Escherichia", ""],
            vec!["G2", "GCA_2", "200", "20", "Archaea", "Halobacteriota", "", "", "", "Haloferax", ""],
        ],
    );

    let first = load_genome_metadata(&mut conn, &options_for(&file)).unwrap();
    assert_eq!((first.created, first.updated, first.skipped), (2, 0, 0));

    let second = load_genome_metadata(&mut conn, &options_for(&file)).unwrap();
    assert_eq!((second.created, second.updated, second.skipped), (0, 2, 0));
    assert_eq!(count_rows(&conn, "genome_metadata"), 2);

    let repo = SqliteGenomeRepository::try_new(&conn).unwrap();
    let genome = repo.get_genome("G1").unwrap().unwrap();
    assert_eq!(genome.genome_accession.as_deref(), Some("GCA_1"));
    assert_eq!(genome.genome_size, Some(100));
    assert_eq!(genome.gtdb.phylum.as_deref(), Some("Pseudomonadota"));
    assert_eq!(genome.gtdb.class, None);
    assert_eq!(genome.ncbi.phylum, None);
}

#[test]
fn changed_values_overwrite_stored_genome() {
    let mut conn = open_db_in_memory().unwrap();
    seed_genomes(&mut conn, &[("G1", "Pseudomonadota", "Escherichia")]);

    let file = tsv_file(
        &["genome_version", "genome_size", "protein_count"],
        &[vec!["G1", "not-a-number", "4242"]],
    );
    let summary = load_genome_metadata(&mut conn, &options_for(&file)).unwrap();
    assert_eq!(summary.updated, 1);

    let repo = SqliteGenomeRepository::try_new(&conn).unwrap();
    let genome = repo.get_genome("G1").unwrap().unwrap();
    assert_eq!(genome.genome_size, None);
    assert_eq!(genome.protein_count, Some(4242));
    // Columns absent from the file are cleared, not kept.
    assert_eq!(genome.gtdb.genus, None);
}

#[test]
fn rows_without_genome_version_are_skipped_with_warning() {
    capture_logs();
    let mut conn = open_db_in_memory().unwrap();
    let file = tsv_file(
        &["genome_version", "genome_accession"],
        &[vec!["G1", "GCA_1"], vec!["", "GCA_orphan_row"]],
    );

    let summary = load_genome_metadata(&mut conn, &options_for(&file)).unwrap();
    assert_eq!((summary.created, summary.skipped), (1, 1));

    let lines = captured_lines();
    let warning = lines
        .iter()
        .find(|line| line.contains("GCA_orphan_row"))
        .expect("skip warning with row content");
    assert!(warning.starts_with("WARN"));
    assert!(warning.contains("row=2"));
    assert!(warning.contains("field=genome_version"));
    assert!(lines
        .iter()
        .any(|line| line.contains("event=load_run") && line.contains("created=1")));
}

#[test]
fn missing_file_fails_before_touching_the_store() {
    let mut conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let options = LoadOptions::with_file(dir.path().join("absent.tsv"));

    let err = load_genome_metadata(&mut conn, &options).unwrap_err();
    assert!(matches!(err, LoadError::FileNotFound(_)));
    assert_eq!(count_rows(&conn, "genome_metadata"), 0);
}

#[test]
fn zero_batch_size_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let file = tsv_file(&["genome_version"], &[vec!["G1"]]);
    let mut options = options_for(&file);
    options.batch_size = 0;

    let err = load_genome_metadata(&mut conn, &options).unwrap_err();
    assert!(matches!(err, LoadError::InvalidBatchSize(0)));
}

#[test]
fn width_violation_rolls_back_the_whole_file() {
    let mut conn = open_db_in_memory().unwrap();
    let too_long = "x".repeat(101);
    let file = tsv_file(
        &["genome_version", "genome_accession"],
        &[vec!["G1", "GCA_1"], vec!["G2", too_long.as_str()]],
    );

    let err = load_genome_metadata(&mut conn, &options_for(&file)).unwrap_err();
    match err {
        LoadError::Repo(repo_err) => assert!(repo_err.is_constraint_violation()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&conn, "genome_metadata"), 0);
}

#[test]
fn genomes_list_in_version_order() {
    let mut conn = open_db_in_memory().unwrap();
    seed_genomes(
        &mut conn,
        &[
            ("G3", "Bacillota", "Bacillus"),
            ("G1", "Pseudomonadota", "Escherichia"),
            ("G2", "Pseudomonadota", "Salmonella"),
        ],
    );

    let repo = SqliteGenomeRepository::try_new(&conn).unwrap();
    let page = repo.list_genomes(&Page::new(2, 1)).unwrap();
    let versions: Vec<_> = page.iter().map(|g| g.genome_version.as_str()).collect();
    assert_eq!(versions, vec!["G2", "G3"]);
}
