// src/process/split.rs
use arrow::array::{Array, BooleanArray, Int64Array, StringArray};
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use tracing::{error, info, instrument};

use super::columns::{DATE, ENSEMBLE, REAL, SECONDS, YEARS};
use crate::error::{ExportError, Result};

/// Name of the artifact holding every column of one ensemble.
pub const GRAND_SUMMARY: &str = "grand_summary";

/// Which columns travel with every vector, and which are never exported on
/// their own.
#[derive(Debug, Clone)]
pub struct ReservedColumns {
    pub identifiers: Vec<String>,
    pub excluded: HashSet<String>,
}

impl Default for ReservedColumns {
    fn default() -> Self {
        Self {
            identifiers: vec![REAL.to_string()],
            excluded: [REAL, ENSEMBLE, YEARS, SECONDS, DATE]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ReservedColumns {
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name) || self.identifiers.iter().any(|i| i == name)
    }
}

/// The rows of one ensemble id together with the realizations they cover.
#[derive(Debug, Clone)]
pub struct EnsembleGroup {
    pub tag: String,
    pub realization_ids: Vec<i64>,
    pub rows: RecordBatch,
}

impl EnsembleGroup {
    /// `[identifiers.., column]` for every non-reserved column, in table order.
    pub fn vector_tables<'a>(
        &'a self,
        reserved: &'a ReservedColumns,
    ) -> Result<impl Iterator<Item = Result<(String, RecordBatch)>> + 'a> {
        let schema = self.rows.schema();
        let id_idx = reserved
            .identifiers
            .iter()
            .map(|name| {
                schema
                    .index_of(name)
                    .map_err(|_| ExportError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<usize>>>()?;

        let data: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !reserved.is_excluded(f.name()))
            .map(|(idx, f)| (idx, f.name().clone()))
            .collect();

        Ok(data.into_iter().map(move |(idx, name)| -> Result<(String, RecordBatch)> {
            let mut keep = id_idx.clone();
            keep.push(idx);
            let table = self.rows.project(&keep)?;
            Ok((name, table))
        }))
    }
}

fn string_column<'a>(table: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    table
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| ExportError::MissingColumn(name.to_string()))
}

fn int_column<'a>(table: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    table
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| ExportError::MissingColumn(name.to_string()))
}

/// Partition `table` by its `ENSEMBLE` column, in order of first appearance.
pub fn group_by_ensemble(table: &RecordBatch) -> Result<Vec<EnsembleGroup>> {
    let ensembles = string_column(table, ENSEMBLE)?;

    let mut tags: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();
    for tag in ensembles.iter().flatten() {
        if seen.insert(tag) {
            tags.push(tag);
        }
    }

    tags.into_iter()
        .map(|tag| -> Result<EnsembleGroup> {
            let mask: BooleanArray = ensembles.iter().map(|v| Some(v == Some(tag))).collect();
            let rows = filter_record_batch(table, &mask)?;
            let reals = int_column(&rows, REAL)?;
            let realization_ids: Vec<i64> = reals
                .iter()
                .flatten()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            Ok(EnsembleGroup {
                tag: tag.to_string(),
                realization_ids,
                rows,
            })
        })
        .collect()
}

/// Result of one export attempt.
#[derive(Debug)]
pub struct ExportOutcome {
    pub tag: String,
    pub name: String,
    pub result: Result<PathBuf>,
}

/// Every export attempted by [`split_sum`], in the order they ran.
#[derive(Debug, Default)]
pub struct SplitReport {
    pub outcomes: Vec<ExportOutcome>,
}

impl SplitReport {
    pub fn exported(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExportOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Split `table` per ensemble id and per data column, handing each piece to
/// `export(table, name, tag, realization_ids)`.
///
/// With `keep_aggregated` the full rows of each ensemble are exported first
/// as [`GRAND_SUMMARY`]. A failing export is recorded in the report and the
/// remaining columns still run.
#[instrument(level = "info", skip_all, fields(rows = table.num_rows(), cols = table.num_columns()))]
pub fn split_sum<F>(
    table: &RecordBatch,
    reserved: &ReservedColumns,
    keep_aggregated: bool,
    mut export: F,
) -> Result<SplitReport>
where
    F: FnMut(&RecordBatch, &str, &str, &[i64]) -> Result<PathBuf>,
{
    let mut report = SplitReport::default();

    for group in group_by_ensemble(table)? {
        info!(tag = %group.tag, realizations = group.realization_ids.len(), rows = group.rows.num_rows(), "splitting ensemble");
        let mut count = 0usize;

        if keep_aggregated {
            let result = export(&group.rows, GRAND_SUMMARY, &group.tag, &group.realization_ids);
            record(&mut report, &group.tag, GRAND_SUMMARY, result, &mut count);
        }

        for piece in group.vector_tables(reserved)? {
            let (name, vector) = piece?;
            info!(tag = %group.tag, vector = %name, "creating file");
            let result = export(&vector, &name, &group.tag, &group.realization_ids);
            record(&mut report, &group.tag, &name, result, &mut count);
        }

        info!(tag = %group.tag, files = count, "files produced");
    }

    Ok(report)
}

fn record(
    report: &mut SplitReport,
    tag: &str,
    name: &str,
    result: Result<PathBuf>,
    count: &mut usize,
) {
    match &result {
        Ok(_) => *count += 1,
        Err(e) => error!(tag = %tag, name = %name, error = %e, "export failed"),
    }
    report.outcomes.push(ExportOutcome {
        tag: tag.to_string(),
        name: name.to_string(),
        result,
    });
}
