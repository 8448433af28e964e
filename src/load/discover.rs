// src/load/discover.rs
use glob::{glob, Pattern};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ExportError, Result};

/// Where the realization-level exports keep their table metadata.
pub const TABLES_DIR: &str = "share/results/tables";

static REALIZATION_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^realization-(\d+)$").expect("static regex"));

/// One `realization-<N>/<ensemble>` run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizationDir {
    pub real: i64,
    pub ensemble: String,
    pub path: PathBuf,
}

fn root_pattern(root: &Path, rest: &str) -> String {
    format!("{}/{}", Pattern::escape(&root.display().to_string()), rest)
}

/// First `realization-*/iter-*/share/results/tables/*.yml` under `root`,
/// in sorted order. Used to seed the export configuration.
pub fn find_meta_file(root: &Path) -> Result<PathBuf> {
    let pattern = root_pattern(root, &format!("realization-*/iter-*/{}/*.yml", TABLES_DIR));
    debug!(pattern = %pattern, "finding meta files");
    let first = glob(&pattern)
        .map_err(|e| ExportError::Discovery(format!("bad pattern {}: {}", pattern, e)))?
        .filter_map(|entry| entry.ok())
        .next()
        .ok_or_else(|| {
            ExportError::Discovery(format!("no metadata file matches {}", pattern))
        })?;
    debug!(meta = %first.display(), "seed metadata");
    Ok(first)
}

/// All `realization-<N>/iter-<M>` directories, ordered by ensemble then
/// realization number.
pub fn find_realizations(root: &Path) -> Result<Vec<RealizationDir>> {
    let pattern = root_pattern(root, "realization-*/iter-*");
    let mut found = Vec::new();
    for path in glob(&pattern)
        .map_err(|e| ExportError::Discovery(format!("bad pattern {}: {}", pattern, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_dir())
    {
        let ensemble = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        let real = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .and_then(|n| REALIZATION_DIR.captures(n))
            .and_then(|caps| caps[1].parse::<i64>().ok());
        match real {
            Some(real) => found.push(RealizationDir {
                real,
                ensemble,
                path,
            }),
            None => debug!(dir = %path.display(), "not a realization directory, skipping"),
        }
    }
    found.sort_by(|a, b| a.ensemble.cmp(&b.ensemble).then(a.real.cmp(&b.real)));
    Ok(found)
}
