use std::collections::HashSet;

use crate::error::Result;
use crate::table::{Cell, CellKey, Table};

/// What identifies a row when removing duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupKey<'a> {
    /// The whole row; a row with any empty cell counts as null.
    FullRow,
    /// One named column; rows with an empty key are null.
    Column(&'a str),
}

/// Drops null rows, then repeated keys, keeping the first occurrence in
/// original order.
pub fn deduplicate(table: Table, key: DedupKey<'_>) -> Result<Table> {
    let keep = match key {
        DedupKey::FullRow => first_occurrences(&table, |row| {
            row.iter().map(|c| c.key()).collect::<Option<Vec<CellKey<'_>>>>()
        }),
        DedupKey::Column(name) => {
            let idx = table.require_column(name)?;
            first_occurrences(&table, |row| row[idx].key().map(|k| vec![k]))
        }
    };
    Ok(table.retain_indices(&keep))
}

/// Drops rows whose key is null without removing duplicates.
pub fn drop_nulls(table: Table, key: DedupKey<'_>) -> Result<Table> {
    let keep: Vec<usize> = match key {
        DedupKey::FullRow => table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|c| !c.is_empty()))
            .map(|(i, _)| i)
            .collect(),
        DedupKey::Column(name) => {
            let idx = table.require_column(name)?;
            table
                .rows()
                .iter()
                .enumerate()
                .filter(|(_, row)| !row[idx].is_empty())
                .map(|(i, _)| i)
                .collect()
        }
    };
    Ok(table.retain_indices(&keep))
}

fn first_occurrences<'t, F>(table: &'t Table, key_of: F) -> Vec<usize>
where
    F: Fn(&'t [Cell]) -> Option<Vec<CellKey<'t>>>,
{
    let mut seen = HashSet::new();
    let mut keep = Vec::new();
    for (i, row) in table.rows().iter().enumerate() {
        let Some(key) = key_of(row.as_slice()) else {
            continue;
        };
        if seen.insert(key) {
            keep.push(i);
        }
    }
    keep
}
