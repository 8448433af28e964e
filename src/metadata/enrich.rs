// src/metadata/enrich.rs
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{ExportError, Result};

/// Aggregation descriptor for a collection of realizations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub operation: String,
    pub realization_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    pub reference: String,
}

/// Provenance of one exported artifact, passed explicitly per export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    pub case_name: String,
    pub tag: String,
    pub aggregation: Option<Aggregation>,
    pub workflow: Workflow,
}

impl ExportMetadata {
    /// A plain collection of `realization_ids` made by the eclipse workflow.
    pub fn collection(case_name: &str, tag: &str, realization_ids: &[i64]) -> Self {
        Self {
            case_name: case_name.to_string(),
            tag: tag.to_string(),
            aggregation: Some(Aggregation {
                operation: "collection".to_string(),
                realization_ids: realization_ids.to_vec(),
            }),
            workflow: Workflow {
                reference: "eclipse".to_string(),
            },
        }
    }

    /// A single-realization export: no aggregation block.
    pub fn single(case_name: &str, tag: &str) -> Self {
        Self {
            case_name: case_name.to_string(),
            tag: tag.to_string(),
            aggregation: None,
            workflow: Workflow {
                reference: "eclipse".to_string(),
            },
        }
    }
}

/// Build the `fmu` block for an artifact from the seed template.
///
/// `aggregation` and `workflow` are replaced outright. A non-empty tag
/// becomes `iteration.name`, and the seed iteration's `id` and `uuid` are
/// dropped. The case name is only filled in when the template does not
/// already name the case.
pub fn enrich_fmu(template: &Mapping, meta: &ExportMetadata) -> Result<Mapping> {
    let mut fmu = template.clone();

    if let Some(aggregation) = &meta.aggregation {
        fmu.insert(Value::from("aggregation"), serde_yaml::to_value(aggregation)?);
    } else {
        fmu.remove("aggregation");
    }
    fmu.insert(Value::from("workflow"), serde_yaml::to_value(&meta.workflow)?);

    if !meta.tag.is_empty() {
        let iteration = fmu
            .entry(Value::from("iteration"))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !iteration.is_mapping() {
            *iteration = Value::Mapping(Mapping::new());
        }
        if let Value::Mapping(iteration) = iteration {
            iteration.remove("id");
            iteration.remove("uuid");
            iteration.insert(Value::from("name"), Value::from(meta.tag.as_str()));
        }
    }

    if !meta.case_name.is_empty() {
        let case = fmu
            .entry(Value::from("case"))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if let Value::Mapping(case) = case {
            if !case.contains_key("name") {
                case.insert(Value::from("name"), Value::from(meta.case_name.as_str()));
            }
        }
    }

    Ok(fmu)
}

/// `.<file name>.yml` next to `data_path`.
pub fn sidecar_path(data_path: &Path) -> PathBuf {
    let name = data_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = data_path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!(".{}.yml", name))
}

/// Replace the `fmu` block of the sidecar belonging to `export_path`.
///
/// Returns the sidecar path. Fails with [`ExportError::MetadataNotFound`]
/// when the export left no sidecar behind.
pub fn fix_meta(export_path: &Path, fmu: Mapping) -> Result<PathBuf> {
    let meta_path = sidecar_path(export_path);
    if !meta_path.is_file() {
        return Err(ExportError::MetadataNotFound(meta_path));
    }

    let mut doc: Value = serde_yaml::from_reader(File::open(&meta_path)?)?;
    let root = doc
        .as_mapping_mut()
        .ok_or_else(|| ExportError::export(&meta_path.display().to_string(), "sidecar is not a mapping"))?;
    root.insert(Value::from("fmu"), Value::Mapping(fmu));

    write_yaml_atomic(&meta_path, &doc)?;
    debug!(path = %meta_path.display(), "metadata modified");
    Ok(meta_path)
}

/// Write to a `.tmp` sibling, then rename over `path`.
pub(crate) fn write_yaml_atomic(path: &Path, doc: &Value) -> Result<()> {
    let tmp_path = path.with_extension("yml.tmp");
    let tmp = File::create(&tmp_path)?;
    serde_yaml::to_writer(tmp, doc)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
