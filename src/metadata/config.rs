// src/metadata/config.rs
use serde_yaml::{Mapping, Value};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{ExportError, Result};

/// Top-level blocks copied verbatim from the seed into every export.
pub const PASSTHROUGH_KEYS: [&str; 3] = ["masterdata", "access", "model"];

/// Export configuration seeded from an existing metadata document.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// File the configuration was read from.
    pub source: PathBuf,
    /// `masterdata`, `access` and `model`, when present.
    pub passthrough: Mapping,
    /// The seed's `fmu` block minus its realization-level keys.
    pub fmu_template: Mapping,
}

fn read_mapping(path: &Path) -> Result<Mapping> {
    let file = File::open(path).map_err(|e| ExportError::config(path, e))?;
    let doc: Value = serde_yaml::from_reader(file).map_err(|e| ExportError::config(path, e))?;
    match doc {
        Value::Mapping(m) => Ok(m),
        _ => Err(ExportError::config(path, "top level is not a mapping")),
    }
}

fn passthrough(doc: &Mapping) -> Mapping {
    let mut out = Mapping::new();
    for key in PASSTHROUGH_KEYS {
        if let Some(v) = doc.get(key) {
            out.insert(Value::from(key), v.clone());
        }
    }
    out
}

impl ExportConfig {
    /// Seed from a realization export's sidecar metadata.
    ///
    /// The `fmu` block must carry `realization` and `context`; both are
    /// dropped since an aggregation belongs to no single realization.
    pub fn from_seed_metadata(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading seed metadata");
        let doc = read_mapping(path)?;

        let mut fmu = match doc.get("fmu") {
            Some(Value::Mapping(m)) => m.clone(),
            Some(_) => return Err(ExportError::config(path, "`fmu` is not a mapping")),
            None => return Err(ExportError::config(path, "missing `fmu` block")),
        };
        for key in ["realization", "context"] {
            if fmu.remove(key).is_none() {
                return Err(ExportError::config(path, format!("missing `fmu.{}`", key)));
            }
        }
        for (key, value) in &fmu {
            debug!(key = ?key, value = ?value, "fmu template");
        }

        Ok(Self {
            source: path.to_path_buf(),
            passthrough: passthrough(&doc),
            fmu_template: fmu,
        })
    }

    /// Read a global model configuration, as used for single-realization
    /// exports. No `fmu` block is required.
    pub fn from_global_config(path: &Path) -> Result<Self> {
        let doc = read_mapping(path)?;
        let fmu_template = match doc.get("fmu") {
            Some(Value::Mapping(m)) => {
                let mut m = m.clone();
                m.remove("realization");
                m.remove("context");
                m
            }
            _ => Mapping::new(),
        };
        Ok(Self {
            source: path.to_path_buf(),
            passthrough: passthrough(&doc),
            fmu_template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SEED: &str = r#"
class: table
masterdata:
  smda:
    field:
      - identifier: DROGON
access:
  asset:
    name: Drogon
model:
  name: ff
  revision: "21.1"
fmu:
  case:
    name: ff_case
    uuid: 8e5c1e5e-0000-0000-0000-000000000000
  iteration:
    name: iter-0
  realization:
    id: 0
    name: realization-0
  context:
    stage: realization
data:
  name: summary
"#;

    #[test]
    fn seed_drops_realization_and_context() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join(".summary.arrow.yml");
        fs::write(&path, SEED)?;

        let cfg = ExportConfig::from_seed_metadata(&path)?;
        assert!(cfg.fmu_template.get("realization").is_none());
        assert!(cfg.fmu_template.get("context").is_none());
        assert!(cfg.fmu_template.get("case").is_some());
        assert!(cfg.fmu_template.get("iteration").is_some());
        assert_eq!(cfg.passthrough.len(), 3);
        assert!(cfg.passthrough.get("data").is_none());
        Ok(())
    }

    #[test]
    fn seed_without_realization_is_configuration_error() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("meta.yml");
        fs::write(&path, "fmu:\n  case:\n    name: x\n  context:\n    stage: realization\n")?;

        let err = ExportConfig::from_seed_metadata(&path).unwrap_err();
        match err {
            ExportError::Configuration { reason, .. } => assert!(reason.contains("fmu.realization")),
            other => panic!("unexpected error {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn seed_without_fmu_is_configuration_error() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("meta.yml");
        fs::write(&path, "class: table\n")?;
        assert!(matches!(
            ExportConfig::from_seed_metadata(&path),
            Err(ExportError::Configuration { .. })
        ));
        Ok(())
    }

    #[test]
    fn malformed_yaml_is_configuration_error() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("meta.yml");
        fs::write(&path, "fmu: [unclosed\n")?;
        assert!(matches!(
            ExportConfig::from_seed_metadata(&path),
            Err(ExportError::Configuration { .. })
        ));
        Ok(())
    }

    #[test]
    fn global_config_needs_no_fmu() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("global_variables.yml");
        fs::write(&path, "masterdata:\n  smda: {}\nmodel:\n  name: ff\nstratigraphy: {}\n")?;
        let cfg = ExportConfig::from_global_config(&path)?;
        assert!(cfg.fmu_template.is_empty());
        assert_eq!(cfg.passthrough.len(), 2);
        Ok(())
    }
}
