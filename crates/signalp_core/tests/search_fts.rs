mod common;

use common::{options_for, seed_genomes, tsv_file};
use rusqlite::Connection;
use signalp_core::{
    load_domain_statistics_per_genome, load_domain_statistics_per_protein, open_db_in_memory,
    search_domains, DomainSearchQuery, SearchError, SearchScope,
};

const PROTEIN_HEADER: &[&str] = &[
    "genome",
    "mist_protein_accession",
    "protein_type",
    "source",
    "domains",
];

fn loaded() -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    seed_genomes(&mut conn, &[("G1", "Pseudomonadota", "Escherichia")]);
    let proteins = tsv_file(
        PROTEIN_HEADER,
        &[
            vec!["G1", "P1", "HK", "mist", "PAS HisKA HATPase_c"],
            vec!["G1", "P2", "rr", "mist", "Response_reg GerE"],
            vec!["G1", "P3", "HK", "rmodels", "HisKA HATPase_c"],
        ],
    );
    load_domain_statistics_per_protein(&mut conn, &options_for(&proteins)).unwrap();
    conn
}

#[test]
fn search_returns_matching_proteins() {
    let conn = loaded();

    let hits = search_domains(
        &conn,
        &DomainSearchQuery::new(SearchScope::Protein, "Response_reg"),
    )
    .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].label, "P2");
    assert_eq!(hits[0].scope, SearchScope::Protein);
    assert!(hits[0].snippet.contains("[Response_reg]"));
}

#[test]
fn plain_terms_must_all_match() {
    let conn = loaded();

    let hits = search_domains(
        &conn,
        &DomainSearchQuery::new(SearchScope::Protein, "HisKA PAS"),
    )
    .unwrap();
    let labels: Vec<_> = hits.iter().map(|hit| hit.label.as_str()).collect();
    assert_eq!(labels, vec!["P1"]);
}

#[test]
fn search_reflects_reloaded_domains() {
    let mut conn = loaded();
    let reload = tsv_file(
        PROTEIN_HEADER,
        &[vec!["G1", "P2", "rr", "mist", "Trans_reg_C"]],
    );
    load_domain_statistics_per_protein(&mut conn, &options_for(&reload)).unwrap();

    let old_hits = search_domains(
        &conn,
        &DomainSearchQuery::new(SearchScope::Protein, "GerE"),
    )
    .unwrap();
    assert!(old_hits.is_empty());

    let new_hits = search_domains(
        &conn,
        &DomainSearchQuery::new(SearchScope::Protein, "Trans_reg_C"),
    )
    .unwrap();
    assert_eq!(new_hits.len(), 1);
    assert_eq!(new_hits[0].label, "P2");
}

#[test]
fn scopes_search_their_own_table() {
    let mut conn = loaded();
    let genome_stats = tsv_file(
        &[
            "genome",
            "source",
            "protein_type",
            "domains",
            "domain_combination_type",
        ],
        &[vec!["G1", "mist", "HK", "Cache_3", "domain"]],
    );
    load_domain_statistics_per_genome(&mut conn, &options_for(&genome_stats)).unwrap();

    let genome_hits = search_domains(
        &conn,
        &DomainSearchQuery::new(SearchScope::Genome, "Cache_3"),
    )
    .unwrap();
    assert_eq!(genome_hits.len(), 1);
    assert_eq!(genome_hits[0].label, "G1");

    let protein_hits = search_domains(
        &conn,
        &DomainSearchQuery::new(SearchScope::Protein, "Cache_3"),
    )
    .unwrap();
    assert!(protein_hits.is_empty());
}

#[test]
fn blank_query_and_zero_limit_return_nothing() {
    let conn = loaded();

    let blank = search_domains(&conn, &DomainSearchQuery::new(SearchScope::Protein, "  "))
        .unwrap();
    assert!(blank.is_empty());

    let mut limited = DomainSearchQuery::new(SearchScope::Protein, "HisKA");
    limited.limit = 0;
    assert!(search_domains(&conn, &limited).unwrap().is_empty());

    limited.limit = 1;
    assert_eq!(search_domains(&conn, &limited).unwrap().len(), 1);
}

#[test]
fn raw_syntax_errors_map_to_invalid_query() {
    let conn = loaded();
    let mut query = DomainSearchQuery::new(SearchScope::Protein, "\"unterminated");
    query.raw_fts_syntax = true;

    let err = search_domains(&conn, &query).unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery { .. }));

    query.raw_fts_syntax = false;
    assert!(search_domains(&conn, &query).unwrap().is_empty());
}
