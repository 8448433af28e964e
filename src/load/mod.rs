// src/load/mod.rs
pub mod discover;
pub mod filter;

use arrow::array::{new_null_array, ArrayRef, Int64Array, StringArray};
use arrow::compute::{cast, concat_batches};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::{
    collections::HashMap,
    fs::File,
    io::Seek,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, warn};

use crate::error::{ExportError, Result};
use crate::process::columns::{DATE, ENSEMBLE, REAL, SECONDS, YEARS};

pub use discover::{find_meta_file, find_realizations, RealizationDir, TABLES_DIR};
pub use filter::VectorFilter;

/// Default location of a realization's summary export, relative to its run path.
pub const DEFAULT_SUMMARY_CSV: &str = "share/results/tables/summary.csv";

const INFER_SAMPLE: usize = 1_000;

fn is_time_column(name: &str) -> bool {
    matches!(name, DATE | YEARS | SECONDS)
}

/// Read one summary CSV into a single batch.
///
/// `DATE` and any non-numeric column become Utf8, every numeric column
/// becomes Float64. A vector without a single value, as in a header-only
/// file left by a failed realization, is typed Null so it takes the type
/// of the other realizations in [`union_concat`]. Columns that fail
/// `filter` are dropped, time columns are always kept.
pub fn read_summary_csv(path: &Path, filter: &VectorFilter) -> Result<RecordBatch> {
    let mut file = File::open(path)?;
    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(INFER_SAMPLE))?;
    file.rewind()?;

    let schema = Arc::new(inferred);
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(file)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let raw = concat_batches(&schema, &batches)?;

    let mut fields = Vec::with_capacity(raw.num_columns());
    let mut columns = Vec::with_capacity(raw.num_columns());
    for (field, col) in schema.fields().iter().zip(raw.columns()) {
        let name = field.name().as_str();
        if name == REAL || name == ENSEMBLE {
            debug!(column = name, file = %path.display(), "identifier already in source, ignoring");
            continue;
        }
        if !is_time_column(name) && !filter.matches(name) {
            continue;
        }
        let target = if name == DATE {
            DataType::Utf8
        } else if col.null_count() == col.len() {
            DataType::Null
        } else if field.data_type().is_numeric() {
            DataType::Float64
        } else {
            DataType::Utf8
        };
        let col = if target == DataType::Null {
            new_null_array(&target, col.len())
        } else if col.data_type() == &target {
            col.clone()
        } else {
            cast(col.as_ref(), &target)?
        };
        fields.push(Field::new(name, target, true));
        columns.push(col);
    }

    if columns.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::new(fields))));
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Prefix `batch` with constant `REAL` and `ENSEMBLE` columns.
pub fn tag_realization(batch: &RecordBatch, real: i64, ensemble: &str) -> Result<RecordBatch> {
    let n = batch.num_rows();
    let mut fields = vec![
        Field::new(REAL, DataType::Int64, false),
        Field::new(ENSEMBLE, DataType::Utf8, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![real; n])),
        Arc::new(StringArray::from(vec![ensemble; n])),
    ];
    fields.extend(batch.schema().fields().iter().map(|f| f.as_ref().clone()));
    columns.extend(batch.columns().iter().cloned());
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Column identity across realizations: a name plus its occurrence index,
/// so a vector repeated within one source survives until deduplication.
type ColumnKey = (String, usize);

fn keyed_fields(schema: &Schema) -> Vec<(ColumnKey, usize)> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, f)| {
            let n = seen.entry(f.name().as_str()).or_insert(0);
            let key = (f.name().clone(), *n);
            *n += 1;
            (key, idx)
        })
        .collect()
}

/// Stack realization batches whose column sets may differ.
///
/// The output schema is the union of inputs in first-appearance order;
/// a column absent from one input is null for its rows. A Null-typed column
/// takes the type seen in the other inputs; any other type conflict widens
/// to Utf8.
pub fn union_concat(parts: &[RecordBatch]) -> Result<RecordBatch> {
    let mut order: Vec<ColumnKey> = Vec::new();
    let mut types: HashMap<ColumnKey, DataType> = HashMap::new();
    for part in parts {
        let schema = part.schema();
        for (key, idx) in keyed_fields(&schema) {
            let dt = schema.field(idx).data_type();
            match types.get_mut(&key) {
                Some(existing) if existing == dt || dt == &DataType::Null => {}
                Some(existing) if existing == &DataType::Null => *existing = dt.clone(),
                Some(existing) => *existing = DataType::Utf8,
                None => {
                    types.insert(key.clone(), dt.clone());
                    order.push(key);
                }
            }
        }
    }

    let fields: Vec<Field> = order
        .iter()
        .map(|key| {
            let nullable = key.0 != REAL && key.0 != ENSEMBLE;
            Field::new(&key.0, types[key].clone(), nullable)
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut aligned = Vec::with_capacity(parts.len());
    for part in parts {
        let lookup: HashMap<ColumnKey, usize> = keyed_fields(&part.schema()).into_iter().collect();
        let columns = order
            .iter()
            .map(|key| -> Result<ArrayRef> {
                let dt = &types[key];
                match lookup.get(key) {
                    Some(&idx) => {
                        let col = part.column(idx);
                        if col.data_type() == dt {
                            Ok(col.clone())
                        } else {
                            Ok(cast(col.as_ref(), dt)?)
                        }
                    }
                    None => Ok(new_null_array(dt, part.num_rows())),
                }
            })
            .collect::<Result<Vec<ArrayRef>>>()?;
        aligned.push(RecordBatch::try_new(schema.clone(), columns)?);
    }

    Ok(concat_batches(&schema, &aligned)?)
}

/// Load every realization's summary CSV under `root` into one EnsembleTable.
///
/// Realizations without the summary file are skipped with a warning; it is
/// an error only when none has one.
#[tracing::instrument(level = "info", skip(root, summary_csv, filter), fields(root = %root.display()))]
pub fn load_ensemble(root: &Path, summary_csv: &Path, filter: &VectorFilter) -> Result<RecordBatch> {
    let realizations = find_realizations(root)?;
    let mut parts = Vec::with_capacity(realizations.len());
    for dir in &realizations {
        let csv_path: PathBuf = dir.path.join(summary_csv);
        if !csv_path.is_file() {
            warn!(real = dir.real, ensemble = %dir.ensemble, path = %csv_path.display(), "no summary, skipping realization");
            continue;
        }
        let batch = read_summary_csv(&csv_path, filter)?;
        debug!(real = dir.real, ensemble = %dir.ensemble, rows = batch.num_rows(), cols = batch.num_columns(), "loaded summary");
        parts.push(tag_realization(&batch, dir.real, &dir.ensemble)?);
    }

    if parts.is_empty() {
        return Err(ExportError::Discovery(format!(
            "no realization under {} has {}",
            root.display(),
            summary_csv.display()
        )));
    }

    let table = union_concat(&parts)?;
    info!(
        realizations = parts.len(),
        rows = table.num_rows(),
        cols = table.num_columns(),
        "loaded ensemble"
    );
    Ok(table)
}
