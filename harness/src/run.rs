//! Case execution orchestration.
//!
//! Coordinates workspace creation, CLI execution, assertion checks and
//! optional result capture.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::case::{CaseFile, Category};
use crate::executor::{CliResult, Executor};
use crate::outcome::{Outcome, classify_outcome};
use crate::results::{CaptureInput, capture_results, new_run_id};
use crate::validators::{Judgment, judge};
use crate::workspace::{build_args, create_workspace};

/// Settings shared by every case in one harness run.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Default per-case timeout; a case's `inputs.timeout_secs` overrides it.
    pub timeout: Duration,
    /// Maximum bytes kept from each of stdout and stderr.
    pub output_limit_bytes: usize,
    /// Leave workspaces on disk after the run.
    pub keep_workspaces: bool,
    /// Where to write per-case artifacts, if anywhere.
    pub results_dir: Option<PathBuf>,
    pub run_id: String,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            output_limit_bytes: 100_000,
            keep_workspaces: false,
            results_dir: None,
            run_id: new_run_id(Utc::now()),
        }
    }
}

/// Result of running a single case.
#[derive(Debug)]
pub struct CaseRun {
    pub case_id: String,
    pub category: Category,
    pub outcome: Outcome,
    pub result: CliResult,
    pub judgment: Judgment,
    /// Workspace root, when it was kept on disk.
    pub workspace: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
}

/// Run one case end-to-end against `binary`.
#[instrument(skip_all, fields(case_id = %case.test.id))]
pub fn run_case(binary: &Path, case: &CaseFile, options: &HarnessOptions) -> Result<CaseRun> {
    debug!("creating workspace");
    let workspace =
        create_workspace(case, options.keep_workspaces).context("create workspace")?;
    let root = workspace.root();

    let timeout = Duration::from_secs(case.timeout_secs(options.timeout.as_secs()));
    let executor = Executor::new(binary, timeout, options.output_limit_bytes);
    let args = build_args(case, root);

    let started_at = Utc::now();
    let result = executor.run(&args, root);
    let finished_at = Utc::now();
    info!(exit_code = result.exit_code, timed_out = result.timed_out, "cli finished");

    let judgment = judge(&case.assertions, &result, root).context("run checks")?;
    let outcome = classify_outcome(&result, &judgment);

    let results_dir = match &options.results_dir {
        Some(base) => {
            let input = CaptureInput {
                case_id: &case.test.id,
                case_path: case.source.as_deref(),
                run_id: &options.run_id,
                started_at,
                finished_at,
                result: &result,
                judgment: &judgment,
                outcome,
            };
            Some(capture_results(base, &input).context("capture results")?)
        }
        None => None,
    };

    info!(outcome = ?outcome, "case complete");
    Ok(CaseRun {
        case_id: case.test.id.clone(),
        category: case.test.category,
        outcome,
        result,
        judgment,
        workspace: options.keep_workspaces.then(|| root.to_path_buf()),
        results_dir,
    })
}

/// Narrow `cases` to the requested ids (all when empty) and category.
///
/// Every requested id must exist.
pub fn select_cases(
    cases: Vec<CaseFile>,
    ids: &[String],
    category: Option<Category>,
) -> Result<Vec<CaseFile>> {
    for id in ids {
        if !cases.iter().any(|case| &case.test.id == id) {
            bail!("case {id} not found");
        }
    }
    Ok(cases
        .into_iter()
        .filter(|case| ids.is_empty() || ids.contains(&case.test.id))
        .filter(|case| category.is_none_or(|wanted| case.test.category == wanted))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, category: &str) -> CaseFile {
        CaseFile::parse_str(&format!(
            "test: {{ id: {id}, name: x, category: {category} }}\nassertions:\n  execution: {{ exit_code: 0 }}\n"
        ))
        .expect("case parses")
    }

    #[test]
    fn selects_by_id_and_category() {
        let cases = vec![case("a", "unit"), case("b", "feature"), case("c", "unit")];

        let all = select_cases(cases.clone(), &[], None).expect("all");
        assert_eq!(all.len(), 3);

        let units = select_cases(cases.clone(), &[], Some(Category::Unit)).expect("units");
        let ids: Vec<&str> = units.iter().map(|c| c.test.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let picked = select_cases(cases.clone(), &["b".to_string()], None).expect("picked");
        assert_eq!(picked.len(), 1);

        let err = select_cases(cases, &["zzz".to_string()], None).expect_err("missing");
        assert!(err.to_string().contains("zzz"));
    }

    #[cfg(unix)]
    #[test]
    fn runs_case_against_a_stand_in_binary() {
        let temp = tempfile::tempdir().expect("tempdir");
        let case = CaseFile::parse_str(
            r#"
test: { id: fake, name: fake, category: example }
inputs:
  args: ["-c", "mkdir -p output && echo hi > output/output.txt && echo INFO done"]
assertions:
  execution:
    exit_code: 0
    stdout_contains: ["INFO done"]
  files:
    - { type: file_equals, path: output/output.txt, content: "hi\n" }
"#,
        )
        .expect("case");
        let options = HarnessOptions {
            results_dir: Some(temp.path().join("results")),
            run_id: "run-test".to_string(),
            ..HarnessOptions::default()
        };

        let run = run_case(Path::new("sh"), &case, &options).expect("run");
        assert_eq!(run.outcome, Outcome::Pass, "{:?}", run.judgment);
        assert!(run.workspace.is_none());
        let results = run.results_dir.expect("results dir");
        assert!(results.join("meta.json").exists());
        assert!(results.ends_with("fake/run-test"));
    }

    #[cfg(unix)]
    #[test]
    fn kept_workspace_is_reported() {
        let case = CaseFile::parse_str(
            r#"
test: { id: keep, name: keep, category: unit }
inputs:
  args: ["-c", "exit 2"]
assertions:
  execution: { exit_code: 0 }
"#,
        )
        .expect("case");
        let options = HarnessOptions {
            keep_workspaces: true,
            ..HarnessOptions::default()
        };

        let run = run_case(Path::new("sh"), &case, &options).expect("run");
        assert_eq!(run.outcome, Outcome::Fail);
        let workspace = run.workspace.expect("kept workspace");
        assert!(workspace.is_dir());
        std::fs::remove_dir_all(workspace).expect("cleanup");
    }
}
