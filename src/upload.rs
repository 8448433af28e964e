// src/upload.rs
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::export::TableFormat;
use crate::load::TABLES_DIR;

pub const DEFAULT_UPLOAD_COMMAND: &str = "sumo_upload";

/// How an upload attempt ended. Never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Completed,
    Failed { code: Option<i32> },
    SpawnFailed(String),
}

/// Run `command` to completion, logging stdout at debug and stderr at warn.
pub fn command_runner(command: &[String]) -> UploadStatus {
    let Some((program, args)) = command.split_first() else {
        warn!("empty command, nothing to run");
        return UploadStatus::SpawnFailed("empty command".to_string());
    };
    info!(command = %command.join(" "), "running");

    let output = match Command::new(program).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            warn!(command = %command.join(" "), error = %e, "could not run command");
            return UploadStatus::SpawnFailed(e.to_string());
        }
    };

    if !output.stdout.is_empty() {
        debug!("{}", String::from_utf8_lossy(&output.stdout));
    }
    if !output.stderr.is_empty() {
        warn!("{}", String::from_utf8_lossy(&output.stderr));
    }

    if output.status.success() {
        UploadStatus::Completed
    } else {
        warn!(command = %command.join(" "), status = ?output.status.code(), "command failed");
        UploadStatus::Failed {
            code: output.status.code(),
        }
    }
}

/// `<case>/share/results/tables/*.<ext>`
pub fn upload_pattern(case_path: &Path, format: TableFormat) -> String {
    format!(
        "{}/{}/*.{}",
        case_path.display(),
        TABLES_DIR,
        format.extension()
    )
}

/// `<program> <case_path> <pattern> <env>`
pub fn upload_to_sumo(program: &str, case_path: &Path, pattern: &str, env: &str) -> UploadStatus {
    command_runner(&[
        program.to_string(),
        case_path.display().to_string(),
        pattern.to_string(),
        env.to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pattern_follows_format() {
        assert_eq!(
            upload_pattern(Path::new("/scratch/case"), TableFormat::Arrow),
            "/scratch/case/share/results/tables/*.arrow"
        );
        assert_eq!(
            upload_pattern(Path::new("/scratch/case"), TableFormat::Parquet),
            "/scratch/case/share/results/tables/*.parquet"
        );
    }

    #[test]
    fn success() {
        assert_eq!(command_runner(&cmd(&["true"])), UploadStatus::Completed);
    }

    #[test]
    fn exit_code_one_is_not_fatal() {
        crate::logging::init_test_logging();
        assert_eq!(
            command_runner(&cmd(&["false"])),
            UploadStatus::Failed { code: Some(1) }
        );
    }

    #[test]
    fn missing_program() {
        let status = upload_to_sumo(
            "definitely-not-an-installed-uploader",
            Path::new("/tmp/case"),
            "/tmp/case/share/results/tables/*.arrow",
            "dev",
        );
        assert!(matches!(status, UploadStatus::SpawnFailed(_)));
    }

    #[test]
    fn empty_command() {
        assert!(matches!(command_runner(&[]), UploadStatus::SpawnFailed(_)));
    }
}
