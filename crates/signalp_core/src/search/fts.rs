//! SQLite FTS5-based domain search.
//!
//! # Responsibility
//! - Provide keyword search over the `domains` field of each statistics table.
//! - Return typed hits carrying the record id and its natural identifier.
//!
//! # Invariants
//! - Result ordering is deterministic by bm25 rank, then record id.
//! - Blank queries return no hits without touching the index.

use crate::db::DbError;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing and DB interaction.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Statistics table a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    Protein,
    Genome,
    Taxon,
}

impl SearchScope {
    fn table(self) -> &'static str {
        match self {
            Self::Protein => "domain_statistics_per_protein",
            Self::Genome => "domain_statistics_per_genome",
            Self::Taxon => "domain_statistics_per_taxon",
        }
    }

    /// Natural identifier reported as the hit label.
    fn label_column(self) -> &'static str {
        match self {
            Self::Protein => "mist_protein_accession",
            Self::Genome => "genome_version",
            Self::Taxon => "gtdb_taxonomy_string",
        }
    }
}

/// Search options for full-text query behavior.
#[derive(Debug, Clone)]
pub struct DomainSearchQuery {
    /// User query text.
    pub text: String,
    pub scope: SearchScope,
    /// Maximum number of hits to return.
    pub limit: u32,
    /// Whether to pass text directly as raw FTS5 expression.
    ///
    /// Default is `false`, so domain names containing FTS operators stay literal.
    pub raw_fts_syntax: bool,
}

impl DomainSearchQuery {
    pub fn new(scope: SearchScope, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            scope,
            limit: DEFAULT_SEARCH_LIMIT,
            raw_fts_syntax: false,
        }
    }
}

/// Single search hit returned by [`search_domains`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub record_id: i64,
    pub scope: SearchScope,
    /// Accession, genome version or taxonomy string of the record.
    pub label: String,
    pub snippet: String,
}

/// Searches one statistics table by domain names and returns ranked hits.
///
/// Plain queries match records containing every whitespace-separated term.
pub fn search_domains(
    conn: &Connection,
    query: &DomainSearchQuery,
) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };

    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let table = query.scope.table();
    let label = query.scope.label_column();
    let sql = format!(
        "SELECT
            {table}.id AS record_id,
            {table}.{label} AS label,
            snippet({table}_fts, 0, '[', ']', ' ... ', 10) AS snippet
         FROM {table}_fts
         JOIN {table} ON {table}.id = {table}_fts.rowid
         WHERE {table}_fts MATCH ?1
         ORDER BY bm25({table}_fts), {table}.id ASC
         LIMIT ?2"
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params![match_expr, query.limit])
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_search_hit(row, query.scope)?);
    }

    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>, scope: SearchScope) -> SearchResult<SearchHit> {
    Ok(SearchHit {
        record_id: row.get("record_id")?,
        scope,
        label: row.get("label")?,
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &DomainSearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }

    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
                || msg.contains("no such column")
        }
        _ => false,
    }
}
