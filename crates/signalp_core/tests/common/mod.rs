#![allow(dead_code)]

use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use rusqlite::Connection;
use signalp_core::{load_genome_metadata, LoadOptions};
use std::io::Write;
use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};
use tempfile::NamedTempFile;

static CAPTURED: Lazy<Mutex<Vec<(ThreadId, String)>>> = Lazy::new(|| Mutex::new(Vec::new()));
static INSTALL: Once = Once::new();

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let line = format!("{} {}", record.level(), record.args());
        CAPTURED
            .lock()
            .unwrap()
            .push((thread::current().id(), line));
    }

    fn flush(&self) {}
}

/// Routes `log` records into an in-process buffer.
pub fn capture_logs() {
    INSTALL.call_once(|| {
        log::set_logger(&CaptureLogger).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
}

/// Lines logged so far by the calling test thread.
pub fn captured_lines() -> Vec<String> {
    let current = thread::current().id();
    CAPTURED
        .lock()
        .unwrap()
        .iter()
        .filter(|(thread_id, _)| *thread_id == current)
        .map(|(_, line)| line.clone())
        .collect()
}

/// Writes a TSV file from a header and rows of cells.
pub fn tsv_file(header: &[&str], rows: &[Vec<&str>]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", header.join("\t")).unwrap();
    for row in rows {
        writeln!(file, "{}", row.join("\t")).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn options_for(file: &NamedTempFile) -> LoadOptions {
    LoadOptions::with_file(file.path())
}

pub const GENOME_HEADER: &[&str] = &[
    "genome_version",
    "genome_accession",
    "genome_size",
    "protein_count",
    "gtdb_kingdom",
    "gtdb_phylum",
    "gtdb_class",
    "gtdb_order",
    "gtdb_family",
    "gtdb_genus",
    "gtdb_species",
];

/// Loads genomes `(version, phylum, genus)` with fixed remaining ranks.
pub fn seed_genomes(conn: &mut Connection, genomes: &[(&str, &str, &str)]) {
    let rows: Vec<Vec<&str>> = genomes
        .iter()
        .map(|(version, phylum, genus)| {
            vec![
                *version,
                "GCA_0001",
                "4000000",
                "3900",
                "Bacteria",
                *phylum,
                "Gammaproteobacteria",
                "Enterobacterales",
                "Enterobacteriaceae",
                *genus,
                "",
            ]
        })
        .collect();
    let file = tsv_file(GENOME_HEADER, &rows);
    load_genome_metadata(conn, &options_for(&file)).unwrap();
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
