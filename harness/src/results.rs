//! Result capture and persistence.
//!
//! When a results directory is given, each case run leaves `meta.json`,
//! `checks.json` and the raw CLI streams behind for later inspection.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::executor::CliResult;
use crate::outcome::Outcome;
use crate::validators::Judgment;

/// Input for capturing the results of one case run.
#[derive(Debug)]
pub struct CaptureInput<'a> {
    pub case_id: &'a str,
    /// Case file on disk, hashed for reproducibility tracking when present.
    pub case_path: Option<&'a Path>,
    pub run_id: &'a str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: &'a CliResult,
    pub judgment: &'a Judgment,
    pub outcome: Outcome,
}

/// Metadata for a case run, persisted to `meta.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunMeta {
    pub case_id: String,
    pub run_id: String,
    /// SHA-256 of the case file.
    pub case_hash: Option<String>,
    pub command: Vec<String>,
    pub outcome: Outcome,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    pub exit_code: i32,
    pub timed_out: bool,
    /// Non-fatal errors encountered during capture.
    pub errors: Vec<String>,
}

/// Identifier for a harness run, shared by every case it executes.
pub fn new_run_id(now: DateTime<Utc>) -> String {
    format!("run-{}", now.format("%Y%m%d_%H%M%S_%3f"))
}

pub fn results_dir(base_dir: &Path, case_id: &str, run_id: &str) -> PathBuf {
    base_dir.join(case_id).join(run_id)
}

/// Write `meta.json`, `checks.json`, `stdout.log` and `stderr.log`.
#[instrument(skip_all, fields(case_id = %input.case_id, run_id = %input.run_id))]
pub fn capture_results(base_dir: &Path, input: &CaptureInput<'_>) -> Result<PathBuf> {
    let dir = results_dir(base_dir, input.case_id, input.run_id);
    fs::create_dir_all(&dir).with_context(|| format!("create results dir {}", dir.display()))?;

    let mut errors = Vec::new();
    let case_hash = match input.case_path.map(file_sha256) {
        Some(Ok(hash)) => Some(hash),
        Some(Err(err)) => {
            errors.push(format!("case hash: {err}"));
            None
        }
        None => None,
    };
    if !errors.is_empty() {
        warn!(errors = ?errors, "result capture had errors");
    }

    let duration = input.finished_at - input.started_at;
    let meta = RunMeta {
        case_id: input.case_id.to_string(),
        run_id: input.run_id.to_string(),
        case_hash,
        command: input.result.command.clone(),
        outcome: input.outcome,
        start_time: input.started_at.to_rfc3339(),
        end_time: input.finished_at.to_rfc3339(),
        duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        exit_code: input.result.exit_code,
        timed_out: input.result.timed_out,
        errors,
    };

    write_json(&dir.join("meta.json"), &meta)?;
    write_json(&dir.join("checks.json"), input.judgment)?;
    fs::write(dir.join("stdout.log"), &input.result.stdout).context("write stdout.log")?;
    fs::write(dir.join("stderr.log"), &input.result.stderr).context("write stderr.log")?;

    debug!(results_dir = %dir.display(), "results captured");
    Ok(dir)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value).context("serialize json")?;
    fs::write(path, format!("{contents}\n")).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn file_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(contents);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::CheckOutcome;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn results_dir_is_stable() {
        let dir = results_dir(Path::new("/tmp/results"), "case", "run-1");
        assert_eq!(dir, PathBuf::from("/tmp/results/case/run-1"));
    }

    #[test]
    fn run_id_format() {
        let now = Utc
            .with_ymd_and_hms(2026, 1, 18, 12, 0, 0)
            .single()
            .expect("timestamp");
        assert_eq!(new_run_id(now), "run-20260118_120000_000");
    }

    #[test]
    fn writes_meta_checks_and_streams() {
        let temp = tempfile::tempdir().expect("tempdir");
        let case_path = temp.path().join("case.yml");
        fs::write(&case_path, "test: {}\n").expect("case");

        let result = CliResult {
            exit_code: 0,
            stdout: "INFO wrote output\n".to_string(),
            stderr: String::new(),
            execution_time: Duration::from_millis(20),
            command: vec!["sample_app".to_string(), "--config".to_string()],
            working_dir: temp.path().to_path_buf(),
            timed_out: false,
            spawn_failed: false,
            truncated_bytes: 0,
        };
        let judgment = Judgment {
            checks: vec![CheckOutcome {
                label: "exit_code(0)".to_string(),
                passed: true,
                detail: None,
            }],
        };
        let input = CaptureInput {
            case_id: "case",
            case_path: Some(&case_path),
            run_id: "run-1",
            started_at: Utc::now(),
            finished_at: Utc::now(),
            result: &result,
            judgment: &judgment,
            outcome: Outcome::Pass,
        };

        let dir = capture_results(&temp.path().join("results"), &input).expect("capture");
        let meta: RunMeta =
            serde_json::from_str(&fs::read_to_string(dir.join("meta.json")).expect("meta"))
                .expect("parse meta");
        assert_eq!(meta.outcome, Outcome::Pass);
        assert_eq!(meta.case_hash.as_deref().map(str::len), Some(64));
        assert!(meta.errors.is_empty());

        let checks: Judgment =
            serde_json::from_str(&fs::read_to_string(dir.join("checks.json")).expect("checks"))
                .expect("parse checks");
        assert_eq!(checks, judgment);
        assert_eq!(
            fs::read_to_string(dir.join("stdout.log")).expect("stdout"),
            "INFO wrote output\n"
        );
    }

    #[test]
    fn missing_case_file_is_recorded_not_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("gone.yml");
        let result = CliResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: String::new(),
            execution_time: Duration::from_millis(1),
            command: Vec::new(),
            working_dir: temp.path().to_path_buf(),
            timed_out: false,
            spawn_failed: false,
            truncated_bytes: 0,
        };
        let judgment = Judgment::default();
        let input = CaptureInput {
            case_id: "case",
            case_path: Some(&missing),
            run_id: "run-2",
            started_at: Utc::now(),
            finished_at: Utc::now(),
            result: &result,
            judgment: &judgment,
            outcome: Outcome::Fail,
        };

        let dir = capture_results(temp.path(), &input).expect("capture");
        let meta: RunMeta =
            serde_json::from_str(&fs::read_to_string(dir.join("meta.json")).expect("meta"))
                .expect("parse meta");
        assert!(meta.case_hash.is_none());
        assert_eq!(meta.errors.len(), 1);
    }
}
