// src/export/mod.rs
pub mod writer;

use arrow::record_batch::RecordBatch;
use serde_yaml::Mapping;
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use crate::error::Result;
use crate::metadata::{enrich_fmu, fix_meta, set_name, ExportConfig, ExportMetadata};

pub use writer::{artifact_stem, FileExporter};

/// On-disk table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    #[default]
    Arrow,
    Parquet,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Arrow => "arrow",
            TableFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arrow" | "feather" => Ok(TableFormat::Arrow),
            "parquet" => Ok(TableFormat::Parquet),
            other => Err(format!("unknown table format {:?} (arrow, parquet)", other)),
        }
    }
}

/// Writes a table plus its sidecar metadata file.
pub trait TableExporter {
    fn config(&self) -> &ExportConfig;

    /// Base metadata for `table`; its `data.name` is only a default.
    fn generate_metadata(&self, table: &RecordBatch) -> Result<Mapping>;

    /// Write `table` as `name` qualified by `tag`, with `metadata` as the
    /// sidecar. Returns the data file path.
    fn export(&self, table: &RecordBatch, metadata: &Mapping, name: &str, tag: &str)
        -> Result<PathBuf>;
}

/// Export `table` as `name` and patch its sidecar with the `fmu` block built
/// from `meta`.
pub fn export_with_metadata<E: TableExporter + ?Sized>(
    exporter: &E,
    table: &RecordBatch,
    name: &str,
    meta: &ExportMetadata,
) -> Result<PathBuf> {
    let mut metadata = exporter.generate_metadata(table)?;
    set_name(&mut metadata, name);
    let exported = exporter.export(table, &metadata, name, &meta.tag)?;
    debug!(path = %exported.display(), "exported");

    let fmu = enrich_fmu(&exporter.config().fmu_template, meta)?;
    fix_meta(&exported, fmu)?;
    Ok(exported)
}

/// Exporter for collections of realizations belonging to one case.
pub struct AggExporter<E> {
    inner: E,
    case_name: String,
}

impl<E: TableExporter> AggExporter<E> {
    /// The case name is the last component of `case_path`.
    pub fn new(inner: E, case_path: &Path) -> Self {
        let case_name = case_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { inner, case_name }
    }

    pub fn case_name(&self) -> &str {
        &self.case_name
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Export `table` as `name` for ensemble `tag`, then stamp the sidecar
    /// with the aggregation over `realization_ids`.
    pub fn export_and_fix(
        &self,
        table: &RecordBatch,
        name: &str,
        tag: &str,
        realization_ids: &[i64],
    ) -> Result<PathBuf> {
        let meta = ExportMetadata::collection(&self.case_name, tag, realization_ids);
        export_with_metadata(&self.inner, table, name, &meta)
    }
}
