//! Header-keyed TSV rows.

use crate::loader::{LoadError, LoadResult};
use csv::{ReaderBuilder, StringRecord};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::path::Path;
use std::rc::Rc;

/// One data line of the input, addressed by header name.
#[derive(Debug, Clone)]
pub(crate) struct TsvRow {
    number: u64,
    headers: Rc<StringRecord>,
    record: StringRecord,
}

impl TsvRow {
    /// 1-based position among data rows; the header is row 0.
    pub(crate) fn number(&self) -> u64 {
        self.number
    }

    /// Cell under `column`; absent and empty cells are both `None`.
    pub(crate) fn get(&self, column: &str) -> Option<&str> {
        let index = self.headers.iter().position(|header| header == column)?;
        self.record.get(index).filter(|value| !value.is_empty())
    }

    /// Cell under a column the row validator has already checked.
    pub(crate) fn required(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }

    pub(crate) fn owned(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }
}

/// Renders as `{'column': 'value', ...}` in header order.
impl Display for TsvRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (index, header) in self.headers.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match self.record.get(index) {
                Some(value) => write!(f, "'{header}': '{value}'")?,
                None => write!(f, "'{header}': None")?,
            }
        }
        f.write_str("}")
    }
}

/// Reads every data row of a tab-separated file with a header line.
///
/// Ragged rows are kept; cells beyond the header are ignored.
pub(crate) fn read_rows(path: &Path) -> LoadResult<Vec<TsvRow>> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let tsv_error = |source| LoadError::Tsv {
        path: path.to_path_buf(),
        source,
    };
    let headers = Rc::new(reader.headers().map_err(tsv_error)?.clone());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        rows.push(TsvRow {
            number: index as u64 + 1,
            headers: Rc::clone(&headers),
            record: record.map_err(tsv_error)?,
        });
    }
    Ok(rows)
}
