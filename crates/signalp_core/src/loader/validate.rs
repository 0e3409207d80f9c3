//! Row-level gatekeeping: required fields, choice cells and referenced keys.

use crate::loader::tsv::TsvRow;
use crate::loader::{LoadContext, LoadError, LoadResult};
use log::warn;
use std::collections::BTreeSet;

/// Keeps rows that carry every `required` column, logging each rejected row.
pub(crate) fn accept_rows(
    ctx: &LoadContext,
    rows: Vec<TsvRow>,
    required: &[&'static str],
    skipped: &mut usize,
) -> Vec<TsvRow> {
    let mut accepted = Vec::with_capacity(rows.len());
    for row in rows {
        match required.iter().find(|column| row.get(column).is_none()) {
            Some(column) => {
                warn!(
                    "event=row_skipped module=loader status=skipped loader={} run_id={} row={} reason=missing_required_field field={column} content={row}",
                    ctx.loader,
                    ctx.run_id,
                    row.number()
                );
                *skipped += 1;
            }
            None => accepted.push(row),
        }
    }
    accepted
}

/// Logs and counts a row whose referenced genome or taxon is unknown.
pub(crate) fn skip_unknown_reference(
    ctx: &LoadContext,
    row: &TsvRow,
    kind: &str,
    value: &str,
    skipped: &mut usize,
) {
    warn!(
        "event=row_skipped module=loader status=skipped loader={} run_id={} row={} reason=unknown_{kind} value={value} content={row}",
        ctx.loader,
        ctx.run_id,
        row.number()
    );
    *skipped += 1;
}

/// Distinct non-empty values of `column` across `rows`.
pub(crate) fn distinct_values(rows: &[TsvRow], column: &str) -> BTreeSet<String> {
    rows.iter().filter_map(|row| row.owned(column)).collect()
}

/// Parses a choice-typed cell; unknown values abort the invocation.
pub(crate) fn parse_choice_cell<T>(
    row: &TsvRow,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> LoadResult<T> {
    let value = row.required(column);
    parse(value).ok_or_else(|| LoadError::InvalidChoice {
        row: row.number(),
        column,
        value: value.to_string(),
    })
}
