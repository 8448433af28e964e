// src/export/writer.rs
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_yaml::{Mapping, Value};
use std::{
    borrow::Cow,
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use super::{TableExporter, TableFormat};
use crate::error::{ExportError, Result};
use crate::load::TABLES_DIR;
use crate::metadata::enrich::write_yaml_atomic;
use crate::metadata::generate::set_file;
use crate::metadata::{generate_metadata, sidecar_path, ExportConfig, CONTENT_TIMESERIES};

fn is_unsafe(c: char) -> bool {
    c == '/' || c == '\\' || c.is_whitespace()
}

/// `s` with path separators and whitespace replaced by `_`. Borrowed when
/// nothing had to change.
fn sanitise(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }
    let clean: String = s
        .chars()
        .map(|c| if is_unsafe(c) { '_' } else { c })
        .collect();
    // distinct vectors such as `A/B` and `A_B` now share a file name
    warn!(original = s, file_name = %clean, "sanitised name for artifact file");
    Cow::Owned(clean)
}

/// `<name>--<tag>`, or just `<name>` without a tag. Path separators and
/// whitespace in either part become `_`.
pub fn artifact_stem(name: &str, tag: &str) -> String {
    if tag.is_empty() {
        sanitise(name).into_owned()
    } else {
        format!("{}--{}", sanitise(name), sanitise(tag))
    }
}

fn write_arrow_ipc(path: &Path, table: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(file, &table.schema())?;
    writer.write(table)?;
    writer.finish()?;
    Ok(())
}

fn write_parquet(path: &Path, table: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, table.schema(), Some(props))
        .map_err(|e| ExportError::export(&path.display().to_string(), e))?;
    writer
        .write(table)
        .map_err(|e| ExportError::export(&path.display().to_string(), e))?;
    writer
        .close()
        .map_err(|e| ExportError::export(&path.display().to_string(), e))?;
    Ok(())
}

/// Writes tables under `<root>/share/results/tables`.
#[derive(Debug, Clone)]
pub struct FileExporter {
    root: PathBuf,
    config: ExportConfig,
    format: TableFormat,
    content: String,
}

impl FileExporter {
    pub fn new(root: impl Into<PathBuf>, config: ExportConfig, format: TableFormat) -> Self {
        Self {
            root: root.into(),
            config,
            format,
            content: CONTENT_TIMESERIES.to_string(),
        }
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join(TABLES_DIR)
    }

    fn write_artifact(
        &self,
        table: &RecordBatch,
        metadata: &Mapping,
        name: &str,
        tag: &str,
    ) -> Result<PathBuf> {
        let dir = self.tables_dir();
        fs::create_dir_all(&dir)?;

        let file_name = format!("{}.{}", artifact_stem(name, tag), self.format.extension());
        let path = dir.join(&file_name);
        // write under a temporary name, then move into place
        let tmp_path = dir.join(format!(".{}.tmp", file_name));
        match self.format {
            TableFormat::Arrow => write_arrow_ipc(&tmp_path, table)?,
            TableFormat::Parquet => write_parquet(&tmp_path, table)?,
        }
        fs::rename(&tmp_path, &path)?;

        let mut metadata = metadata.clone();
        let relative = format!("{}/{}", TABLES_DIR, file_name);
        let absolute = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        set_file(&mut metadata, tag, &relative, &absolute.display().to_string());
        write_yaml_atomic(&sidecar_path(&path), &Value::Mapping(metadata))?;

        debug!(path = %path.display(), rows = table.num_rows(), "wrote table");
        Ok(path)
    }
}

impl TableExporter for FileExporter {
    fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn generate_metadata(&self, table: &RecordBatch) -> Result<Mapping> {
        generate_metadata(&self.config, &self.content, self.format, table)
    }

    fn export(
        &self,
        table: &RecordBatch,
        metadata: &Mapping,
        name: &str,
        tag: &str,
    ) -> Result<PathBuf> {
        self.write_artifact(table, metadata, name, tag)
            .map_err(|e| match e {
                e @ ExportError::Export { .. } => e,
                other => ExportError::export(name, other),
            })
    }
}
