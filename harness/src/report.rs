use std::collections::BTreeMap;

use crate::case::Category;
use crate::outcome::Outcome;
use crate::run::CaseRun;

#[derive(Debug, Default, PartialEq)]
pub struct ReportSummary {
    pub cases: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub total_secs: f64,
    /// Category → (passed, total).
    pub by_category: BTreeMap<Category, (usize, usize)>,
}

impl ReportSummary {
    pub fn all_passed(&self) -> bool {
        self.passed == self.cases
    }
}

pub fn summarize(runs: &[CaseRun]) -> ReportSummary {
    let mut summary = ReportSummary::default();
    for run in runs {
        summary.cases += 1;
        match run.outcome {
            Outcome::Pass => summary.passed += 1,
            Outcome::Fail => summary.failed += 1,
            Outcome::Error => summary.errored += 1,
        }
        summary.total_secs += run.result.execution_time.as_secs_f64();
        let entry = summary.by_category.entry(run.category).or_insert((0, 0));
        if run.outcome == Outcome::Pass {
            entry.0 += 1;
        }
        entry.1 += 1;
    }
    summary
}

/// One line per case, with failing check details indented beneath it.
pub fn render_case(run: &CaseRun) -> Vec<String> {
    let mut lines = vec![format!(
        "case: id={} outcome={:?} exit_code={} secs={:.2}",
        run.case_id,
        run.outcome,
        run.result.exit_code,
        run.result.execution_time.as_secs_f64()
    )];
    for failure in run.judgment.failures() {
        lines.push(format!(
            "  failed: {} {}",
            failure.label,
            failure.detail.as_deref().unwrap_or("")
        ));
    }
    if run.outcome == Outcome::Error {
        lines.push(format!("  error: {}", run.result.stderr.trim()));
    }
    lines
}

pub fn render_summary(summary: &ReportSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "report: cases={} pass={} fail={} error={} secs={:.2}",
        summary.cases, summary.passed, summary.failed, summary.errored, summary.total_secs
    )];
    for (category, (passed, total)) in &summary.by_category {
        lines.push(format!("report: category {} {}/{}", category, passed, total));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CliResult;
    use crate::validators::{CheckOutcome, Judgment};
    use std::path::PathBuf;
    use std::time::Duration;

    fn case_run(id: &str, category: Category, outcome: Outcome) -> CaseRun {
        let passed = outcome == Outcome::Pass;
        CaseRun {
            case_id: id.to_string(),
            category,
            outcome,
            result: CliResult {
                exit_code: if passed { 0 } else { 1 },
                stdout: String::new(),
                stderr: String::new(),
                execution_time: Duration::from_millis(500),
                command: Vec::new(),
                working_dir: PathBuf::from("/tmp"),
                timed_out: false,
                spawn_failed: false,
                truncated_bytes: 0,
            },
            judgment: Judgment {
                checks: vec![CheckOutcome {
                    label: "exit_code(0)".to_string(),
                    passed,
                    detail: (!passed).then(|| "expected exit code 0, got 1".to_string()),
                }],
            },
            workspace: None,
            results_dir: None,
        }
    }

    #[test]
    fn summarizes_by_outcome_and_category() {
        let runs = vec![
            case_run("a", Category::Unit, Outcome::Pass),
            case_run("b", Category::Unit, Outcome::Fail),
            case_run("c", Category::Feature, Outcome::Pass),
            case_run("d", Category::Feature, Outcome::Error),
        ];
        let summary = summarize(&runs);
        assert_eq!(summary.cases, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errored, 1);
        assert!((summary.total_secs - 2.0).abs() < 1e-9);
        assert_eq!(summary.by_category.get(&Category::Unit), Some(&(1, 2)));
        assert_eq!(summary.by_category.get(&Category::Feature), Some(&(1, 2)));
        assert!(!summary.all_passed());

        let lines = render_summary(&summary);
        assert_eq!(lines[0], "report: cases=4 pass=2 fail=1 error=1 secs=2.00");
        assert_eq!(lines[1], "report: category unit 1/2");
        assert_eq!(lines[2], "report: category feature 1/2");
    }

    #[test]
    fn renders_failures_beneath_case_line() {
        let lines = render_case(&case_run("b", Category::Unit, Outcome::Fail));
        assert_eq!(lines[0], "case: id=b outcome=Fail exit_code=1 secs=0.50");
        assert_eq!(lines[1], "  failed: exit_code(0) expected exit code 0, got 1");
    }

    #[test]
    fn empty_summary_counts_as_passed() {
        let summary = summarize(&[]);
        assert!(summary.all_passed());
    }
}
