// src/pipeline.rs
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{ExportError, Result};
use crate::export::{AggExporter, FileExporter, TableFormat};
use crate::load::{find_meta_file, load_ensemble, VectorFilter};
use crate::metadata::ExportConfig;
use crate::process::{remove_duplicates, split_sum, ReservedColumns, SplitReport};
use crate::upload::{upload_pattern, upload_to_sumo, UploadStatus};

/// Everything one aggregation run needs.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub scratch_path: PathBuf,
    pub filter: VectorFilter,
    pub summary_csv: PathBuf,
    pub format: TableFormat,
    pub keep_aggregated: bool,
    pub env: String,
    /// Upload program; `None` skips the upload.
    pub upload_command: Option<String>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub report: SplitReport,
    /// `None` when the upload was disabled or skipped after failures.
    pub upload: Option<UploadStatus>,
}

impl RunSummary {
    /// Fails with [`ExportError::ExportsFailed`] when any artifact was not
    /// exported. The binary exits non-zero on this.
    pub fn ensure_success(&self) -> Result<()> {
        if self.report.is_success() {
            return Ok(());
        }
        Err(ExportError::ExportsFailed {
            failed: self.report.failed(),
            total: self.report.outcomes.len(),
        })
    }
}

/// Load, deduplicate, split and export the ensemble under
/// `opts.scratch_path`, then upload the exported tables.
///
/// Configuration and discovery problems abort before anything is written.
/// Individual export failures are collected in the returned report; when
/// there are any the upload is skipped.
#[tracing::instrument(level = "info", skip_all, fields(case = %opts.scratch_path.display()))]
pub fn run_aggregation(opts: &AggregateOptions) -> Result<RunSummary> {
    let seed = find_meta_file(&opts.scratch_path)?;
    let config = ExportConfig::from_seed_metadata(&seed)?;
    let exporter = AggExporter::new(
        FileExporter::new(&opts.scratch_path, config, opts.format),
        &opts.scratch_path,
    );

    let table = load_ensemble(&opts.scratch_path, &opts.summary_csv, &opts.filter)?;
    let table = remove_duplicates(&table)?;

    let report = split_sum(
        &table,
        &ReservedColumns::default(),
        opts.keep_aggregated,
        |t, name, tag, reals| exporter.export_and_fix(t, name, tag, reals),
    )?;

    let exported = report.exported().count();
    if !report.is_success() {
        for failed in report.failures() {
            if let Err(e) = &failed.result {
                error!(tag = %failed.tag, name = %failed.name, error = %e, "not exported");
            }
        }
        warn!(exported, failed = report.failed(), "skipping upload after export failures");
        return Ok(RunSummary {
            report,
            upload: None,
        });
    }
    info!(exported, case = exporter.case_name(), "all exports written");

    let upload = opts
        .upload_command
        .as_deref()
        .map(|program| upload(program, &opts.scratch_path, opts.format, &opts.env));
    Ok(RunSummary { report, upload })
}

fn upload(program: &str, case_path: &Path, format: TableFormat, env: &str) -> UploadStatus {
    let pattern = upload_pattern(case_path, format);
    let status = upload_to_sumo(program, case_path, &pattern, env);
    if status != UploadStatus::Completed {
        warn!(status = ?status, "upload did not complete, exported files are still in place");
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::{DEFAULT_SUMMARY_CSV, TABLES_DIR};
    use crate::metadata::sidecar_path;
    use serde_yaml::Value;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const SEED: &str = "\
masterdata:
  smda:
    field:
      - identifier: DROGON
fmu:
  case:
    name: ff_case
  iteration:
    name: iter-0
    id: 0
    uuid: 6f5c3a3e-0000-4000-8000-000000000000
  realization:
    id: 0
  context:
    stage: realization
";

    /// Two ensembles, three realizations each, with one repeated column.
    fn scratch() -> anyhow::Result<TempDir> {
        let root = tempdir()?;
        for iter in ["iter-0", "iter-1"] {
            for real in 0..3 {
                let tables = root
                    .path()
                    .join(format!("realization-{}/{}", real, iter))
                    .join(TABLES_DIR);
                fs::create_dir_all(&tables)?;
                fs::write(
                    tables.join("summary.csv"),
                    format!(
                        "DATE,YEARS,OILRATE,WATRATE,OILRATE\n2020-01-01,0,{r}00,{r}0,{r}00\n2021-01-01,1,{r}10,{r}1,{r}10\n",
                        r = real + 1
                    ),
                )?;
            }
        }
        let seed_dir = root.path().join("realization-0/iter-0").join(TABLES_DIR);
        fs::write(seed_dir.join(".summary.arrow.yml"), SEED)?;
        Ok(root)
    }

    fn options(root: &Path, upload_command: Option<&str>) -> AggregateOptions {
        AggregateOptions {
            scratch_path: root.to_path_buf(),
            filter: VectorFilter::all(),
            summary_csv: PathBuf::from(DEFAULT_SUMMARY_CSV),
            format: TableFormat::Arrow,
            keep_aggregated: false,
            env: "dev".to_string(),
            upload_command: upload_command.map(str::to_string),
        }
    }

    #[test]
    fn end_to_end() -> anyhow::Result<()> {
        crate::logging::init_test_logging();
        let root = scratch()?;
        let summary = run_aggregation(&options(root.path(), None))?;

        assert!(summary.report.is_success());
        assert_eq!(summary.report.outcomes.len(), 4);
        assert!(summary.upload.is_none());
        summary.ensure_success()?;

        let tables = root.path().join(TABLES_DIR);
        for name in [
            "OILRATE--iter-0",
            "OILRATE--iter-1",
            "WATRATE--iter-0",
            "WATRATE--iter-1",
        ] {
            let data = tables.join(format!("{}.arrow", name));
            assert!(data.is_file(), "{} missing", data.display());
            let doc: Value = serde_yaml::from_reader(fs::File::open(sidecar_path(&data))?)?;
            let ids: Vec<i64> =
                serde_yaml::from_value(doc["fmu"]["aggregation"]["realization_ids"].clone())?;
            assert_eq!(ids, vec![0, 1, 2]);
            assert_eq!(doc["fmu"]["workflow"]["reference"], Value::from("eclipse"));
            assert!(doc["fmu"].get("realization").is_none());
            assert_eq!(
                doc["masterdata"]["smda"]["field"][0]["identifier"],
                Value::from("DROGON")
            );
        }
        Ok(())
    }

    #[test]
    fn keep_aggregated_adds_grand_summary() -> anyhow::Result<()> {
        let root = scratch()?;
        let mut opts = options(root.path(), None);
        opts.keep_aggregated = true;
        let summary = run_aggregation(&opts)?;
        assert_eq!(summary.report.outcomes.len(), 6);
        assert!(root
            .path()
            .join(TABLES_DIR)
            .join("grand_summary--iter-1.arrow")
            .is_file());
        Ok(())
    }

    #[test]
    fn failing_upload_still_succeeds() -> anyhow::Result<()> {
        let root = scratch()?;
        let summary = run_aggregation(&options(root.path(), Some("false")))?;
        assert!(summary.report.is_success());
        assert_eq!(summary.upload, Some(UploadStatus::Failed { code: Some(1) }));
        Ok(())
    }

    #[test]
    fn rerun_is_idempotent() -> anyhow::Result<()> {
        let root = scratch()?;
        run_aggregation(&options(root.path(), None))?;
        let path = root.path().join(TABLES_DIR).join("OILRATE--iter-0.arrow");
        let first = fs::read(&path)?;
        run_aggregation(&options(root.path(), None))?;
        assert_eq!(first, fs::read(&path)?);
        Ok(())
    }

    #[test]
    fn vector_filter_limits_exports() -> anyhow::Result<()> {
        let root = scratch()?;
        let mut opts = options(root.path(), None);
        opts.filter = VectorFilter::parse("WAT*")?;
        let summary = run_aggregation(&opts)?;
        let names: Vec<&str> = summary
            .report
            .outcomes
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["WATRATE", "WATRATE"]);
        Ok(())
    }

    #[test]
    fn failed_export_skips_upload_and_fails_run() -> anyhow::Result<()> {
        let root = scratch()?;
        // a directory where the artifact should go makes the final rename fail
        let blocker = root.path().join(TABLES_DIR).join("OILRATE--iter-0.arrow");
        fs::create_dir_all(blocker.join("occupied"))?;

        let summary = run_aggregation(&options(root.path(), Some("true")))?;
        assert_eq!(summary.report.failed(), 1);
        assert!(summary.upload.is_none());

        let failed = summary.report.failures().next().unwrap();
        assert_eq!((failed.tag.as_str(), failed.name.as_str()), ("iter-0", "OILRATE"));
        assert!(matches!(failed.result, Err(ExportError::Export { .. })));

        // the remaining columns are still written
        for name in ["OILRATE--iter-1", "WATRATE--iter-0", "WATRATE--iter-1"] {
            assert!(root.path().join(TABLES_DIR).join(format!("{}.arrow", name)).is_file());
        }
        assert!(matches!(
            summary.ensure_success(),
            Err(ExportError::ExportsFailed { failed: 1, total: 4 })
        ));
        Ok(())
    }

    #[test]
    fn iteration_name_follows_tag() -> anyhow::Result<()> {
        let root = scratch()?;
        run_aggregation(&options(root.path(), None))?;
        for tag in ["iter-0", "iter-1"] {
            let data = root.path().join(TABLES_DIR).join(format!("WATRATE--{}.arrow", tag));
            let doc: Value = serde_yaml::from_reader(fs::File::open(sidecar_path(&data))?)?;
            assert_eq!(doc["fmu"]["iteration"]["name"], Value::from(tag));
            assert!(doc["fmu"]["iteration"].get("uuid").is_none());
            assert!(doc["fmu"]["iteration"].get("id").is_none());
        }
        Ok(())
    }

    #[test]
    fn missing_seed_aborts() {
        let root = tempdir().unwrap();
        let err = run_aggregation(&options(root.path(), None)).unwrap_err();
        assert!(matches!(err, ExportError::Discovery(_)));
    }
}
