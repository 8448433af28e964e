//! Command-line arguments for both binaries.

use clap::Parser;
use std::path::PathBuf;

use crate::export::TableFormat;
use crate::load::DEFAULT_SUMMARY_CSV;
use crate::upload::DEFAULT_UPLOAD_COMMAND;

/// Long options that historically took a single dash.
const LEGACY_LONG_FLAGS: [&str; 2] = ["env", "keep_aggregated"];

/// Rewrite `-env` / `-keep_aggregated` (and `-env=dev`) to their `--` form.
pub fn normalize_legacy_flags<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(rest) = arg.strip_prefix('-') else {
                return arg;
            };
            if rest.starts_with('-') {
                return arg;
            }
            let flag = rest.split('=').next().unwrap_or(rest);
            if LEGACY_LONG_FLAGS.contains(&flag) {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

/// Splits aggregated summary vectors into single files
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct AggregateArgs {
    /// Path to the scratch ensemble
    pub scratch_path: PathBuf,

    /// Filter on vectors: glob patterns separated by commas or spaces
    pub vector_filter: String,

    /// Sumo environment to upload to
    #[arg(long = "env", default_value = "prod")]
    pub env: String,

    /// Also export each ensemble's full table as grand_summary
    #[arg(long = "keep_aggregated")]
    pub keep_aggregated: bool,

    /// Debug logging
    #[arg(short = 'd')]
    pub debug: bool,

    /// Table file format
    #[arg(long, default_value_t = TableFormat::Arrow)]
    pub format: TableFormat,

    /// Summary CSV, relative to each realization's run path
    #[arg(long, default_value = DEFAULT_SUMMARY_CSV)]
    pub summary_csv: PathBuf,

    /// Program invoked to upload the exported tables
    #[arg(long, default_value = DEFAULT_UPLOAD_COMMAND, env = "SUMO_UPLOAD_COMMAND")]
    pub upload_command: String,

    /// Export only, do not upload
    #[arg(long)]
    pub skip_upload: bool,
}

/// Exports a summary table with metadata
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ExportTableArgs {
    /// Summary CSV of one realization
    pub table_path: PathBuf,

    /// Global model configuration (yaml)
    pub config_path: PathBuf,

    /// Vector filter
    #[arg(long, num_args = 0.., default_values_t = vec!["*".to_string()])]
    pub vectors: Vec<String>,

    /// Name of the exported table
    #[arg(long, default_value = "summary")]
    pub name: String,

    /// Run path the table is exported under
    #[arg(long, default_value = ".")]
    pub output_root: PathBuf,

    /// Table file format
    #[arg(long, default_value_t = TableFormat::Arrow)]
    pub format: TableFormat,

    /// Debug logging
    #[arg(short = 'd')]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_flags_rewritten() {
        let args = normalize_legacy_flags([
            "ensemble-export",
            "/scratch/case",
            "*",
            "-env",
            "dev",
            "-keep_aggregated",
            "-d",
            "--format",
            "parquet",
        ]);
        assert_eq!(
            args,
            vec![
                "ensemble-export",
                "/scratch/case",
                "*",
                "--env",
                "dev",
                "--keep_aggregated",
                "-d",
                "--format",
                "parquet",
            ]
        );
    }

    #[test]
    fn legacy_flag_with_value() {
        assert_eq!(normalize_legacy_flags(["-env=dev"]), vec!["--env=dev"]);
    }

    #[test]
    fn aggregate_defaults() {
        let args = AggregateArgs::parse_from(normalize_legacy_flags(["ensemble-export", "/s", "F*"]));
        assert_eq!(args.env, "prod");
        assert!(!args.keep_aggregated);
        assert!(!args.debug);
        assert_eq!(args.format, TableFormat::Arrow);
        assert_eq!(args.summary_csv, PathBuf::from(DEFAULT_SUMMARY_CSV));
        assert!(!args.skip_upload);
    }

    #[test]
    fn aggregate_legacy_form_parses() {
        let args = AggregateArgs::parse_from(normalize_legacy_flags([
            "ensemble-export",
            "/s",
            "*",
            "-env",
            "dev",
            "-keep_aggregated",
            "-d",
        ]));
        assert_eq!(args.env, "dev");
        assert!(args.keep_aggregated);
        assert!(args.debug);
    }

    #[test]
    fn export_table_defaults() {
        let args = ExportTableArgs::parse_from(["export-table", "summary.csv", "global.yml"]);
        assert_eq!(args.vectors, vec!["*"]);
        assert_eq!(args.name, "summary");
        assert_eq!(args.output_root, PathBuf::from("."));
    }
}
