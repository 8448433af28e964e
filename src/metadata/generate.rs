// src/metadata/generate.rs
use arrow::record_batch::RecordBatch;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::ExportConfig;
use crate::error::Result;
use crate::export::TableFormat;
use crate::process::columns::{DATE, ENSEMBLE, REAL};

/// Content descriptor for summary vectors.
pub const CONTENT_TIMESERIES: &str = "timeseries";

#[derive(Debug, Serialize)]
struct TableSpec {
    columns: Vec<String>,
    num_columns: usize,
    num_rows: usize,
    size: usize,
}

#[derive(Debug, Serialize)]
struct DataBlock {
    name: String,
    content: String,
    layout: &'static str,
    format: String,
    table_index: Vec<String>,
    spec: TableSpec,
}

#[derive(Debug, Serialize)]
struct TrackEvent {
    datetime: String,
    event: &'static str,
}

/// Name used when the caller does not provide one: the table's last column.
fn default_name(table: &RecordBatch) -> String {
    table
        .schema()
        .fields()
        .last()
        .map(|f| f.name().clone())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Base metadata for `table`, before any name, file or `fmu` details.
pub fn generate_metadata(
    config: &ExportConfig,
    content: &str,
    format: TableFormat,
    table: &RecordBatch,
) -> Result<Mapping> {
    let schema = table.schema();
    let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let table_index: Vec<String> = [REAL, ENSEMBLE, DATE]
        .into_iter()
        .filter(|c| columns.iter().any(|name| name == c))
        .map(|c| c.to_string())
        .collect();
    let name = default_name(table);

    let data = DataBlock {
        name: name.clone(),
        content: content.to_string(),
        layout: "table",
        format: format.to_string(),
        table_index,
        spec: TableSpec {
            num_columns: columns.len(),
            columns,
            num_rows: table.num_rows(),
            size: table.get_array_memory_size(),
        },
    };
    let tracklog = vec![TrackEvent {
        datetime: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        event: "created",
    }];

    let mut meta = Mapping::new();
    meta.insert(Value::from("class"), Value::from("table"));
    meta.insert(Value::from("source"), Value::from("fmu"));
    meta.insert(Value::from("tracklog"), serde_yaml::to_value(&tracklog)?);
    for (key, value) in &config.passthrough {
        meta.insert(key.clone(), value.clone());
    }
    meta.insert(Value::from("data"), serde_yaml::to_value(&data)?);
    let mut display = Mapping::new();
    display.insert(Value::from("name"), Value::from(name));
    meta.insert(Value::from("display"), Value::Mapping(display));
    Ok(meta)
}

/// Force `data.name` and `display.name` to `name`.
pub fn set_name(meta: &mut Mapping, name: &str) {
    for block in ["data", "display"] {
        if let Some(Value::Mapping(m)) = meta.get_mut(block) {
            m.insert(Value::from("name"), Value::from(name));
        }
    }
}

/// Record the tag and file location of an export.
pub(crate) fn set_file(meta: &mut Mapping, tag: &str, relative: &str, absolute: &str) {
    if let Some(Value::Mapping(data)) = meta.get_mut("data") {
        if tag.is_empty() {
            data.remove("tagname");
        } else {
            data.insert(Value::from("tagname"), Value::from(tag));
        }
    }
    let mut file = Mapping::new();
    file.insert(Value::from("relative_path"), Value::from(relative));
    file.insert(Value::from("absolute_path"), Value::from(absolute));
    meta.insert(Value::from("file"), Value::Mapping(file));
}
