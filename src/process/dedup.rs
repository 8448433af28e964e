// src/process/dedup.rs
use arrow::record_batch::RecordBatch;
use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;

/// Sort columns by name and drop every repeat of a name after its first
/// occurrence. Rows are left untouched.
pub fn remove_duplicates(table: &RecordBatch) -> Result<RecordBatch> {
    let schema = table.schema();
    let mut order: Vec<usize> = (0..schema.fields().len()).collect();
    // stable, so "first occurrence" keeps its meaning after sorting
    order.sort_by(|&a, &b| schema.field(a).name().cmp(schema.field(b).name()));

    let mut seen = HashSet::new();
    let keep: Vec<usize> = order
        .into_iter()
        .filter(|&idx| seen.insert(schema.field(idx).name().as_str()))
        .collect();

    let dropped = schema.fields().len() - keep.len();
    debug!(
        columns = schema.fields().len(),
        unique = keep.len(),
        "column count before deduplication"
    );
    if dropped > 0 {
        debug!(dropped, "dropping duplicate columns");
    }

    Ok(table.project(&keep)?)
}
