//! Reconciliation between the base dataset and the log of completed edits.
//!
//! Completion is tracked per row in storage but decided per product: a
//! handle that has any completed row in the updated log counts as done for
//! every row that shares it.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::{
    config::{Columns, MergeMode},
    record::{Dataset, RecordKey, Row},
};

/// Positions of rows that are open for editing: non-blank title, non-blank
/// source description and no completion marker.
pub fn derive_eligible(base: &Dataset, columns: &Columns) -> Vec<usize> {
    base.rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| is_eligible(row, columns))
        .map(|(position, _)| position)
        .collect()
}

pub fn is_eligible(row: &Row, columns: &Columns) -> bool {
    !row.text(&columns.title).trim().is_empty()
        && !row.text(&columns.description).trim().is_empty()
        && !row.is_done(columns)
}

/// Writes each non-blank submission into every target column and marks the
/// row done. Blank or whitespace-only submissions are skipped. Returns the
/// handles that were touched.
pub fn apply_edits(
    base: &mut Dataset,
    columns: &Columns,
    edits: &IndexMap<RecordKey, String>,
) -> IndexSet<String> {
    let edits = edits
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect::<HashMap<_, _>>();
    if edits.is_empty() {
        return IndexSet::new();
    }
    for column in columns.targets.iter().chain([&columns.completion]) {
        base.ensure_column(column);
    }
    let mut touched = IndexSet::new();
    for row in base.rows_mut() {
        let key = row.key(columns);
        let Some(text) = edits.get(&key) else {
            continue;
        };
        for column in &columns.targets {
            row.set(column, text.as_str());
        }
        row.mark_done(columns, true);
        touched.insert(key.handle);
    }
    debug!(
        submitted = edits.len(),
        touched = touched.len(),
        "applied edits"
    );
    touched
}

/// Rows of `base` whose composite key is in `keys`, in base order.
pub fn touched_rows<'a>(
    base: &'a Dataset,
    columns: &'a Columns,
    keys: impl IntoIterator<Item = &'a RecordKey>,
) -> impl Iterator<Item = &'a Row> + 'a {
    let keys = keys.into_iter().collect::<HashSet<_>>();
    base.rows()
        .iter()
        .filter(move |row| keys.contains(&row.key(columns)))
}

/// Folds `new_rows` into the updated log. A row of `existing` survives
/// unless a row with the same composite key is in `new_rows`.
pub fn merge_into_updated<'a>(
    existing: &Dataset,
    new_rows: impl IntoIterator<Item = &'a Row>,
    columns: &Columns,
    mode: MergeMode,
) -> Dataset {
    // last write wins inside the batch as well
    let mut incoming = IndexMap::<RecordKey, Row>::new();
    for row in new_rows {
        let key = row.key(columns);
        incoming.shift_remove(&key);
        incoming.insert(key, row.clone());
    }

    let mut merged = existing.clone();
    match mode {
        MergeMode::AppendDistinct => {
            merged.retain(|row| !incoming.contains_key(&row.key(columns)));
            for row in incoming.into_values() {
                merged.push(row);
            }
        }
        MergeMode::FullOverwrite => {
            let positions = merged
                .rows()
                .iter()
                .enumerate()
                .map(|(position, row)| (row.key(columns), position))
                .collect::<HashMap<_, _>>();
            for (key, row) in incoming {
                match positions.get(&key) {
                    Some(&position) => merged.replace(position, row),
                    None => merged.push(row),
                }
            }
        }
    }
    debug!(
        before = existing.len(),
        after = merged.len(),
        ?mode,
        "merged into updated log"
    );
    merged
}

/// Handles that have at least one completed row in `updated`.
pub fn completed_identifiers(updated: &Dataset, columns: &Columns) -> HashSet<String> {
    let mut flags = HashMap::<&str, bool>::new();
    for row in updated.rows() {
        *flags.entry(row.handle(columns)).or_default() |= row.is_done(columns);
    }
    flags
        .into_iter()
        .filter(|(handle, done)| *done && !handle.is_empty())
        .map(|(handle, _)| handle.to_owned())
        .collect()
}

/// Marks every base row whose handle is completed in `updated`. Returns the
/// number of rows whose marker changed.
pub fn restore_completion_state(base: &mut Dataset, updated: &Dataset, columns: &Columns) -> usize {
    let completed = completed_identifiers(updated, columns);
    if completed.is_empty() {
        return 0;
    }
    base.ensure_column(&columns.completion);
    let mut changed = 0;
    for row in base.rows_mut() {
        if !row.is_done(columns) && completed.contains(row.handle(columns)) {
            row.mark_done(columns, true);
            changed += 1;
        }
    }
    debug!(
        products = completed.len(),
        rows = changed,
        "restored completion state"
    );
    changed
}
