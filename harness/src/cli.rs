//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::case::{Category, discover_cases};
use crate::report::{render_case, render_summary, summarize};
use crate::run::{HarnessOptions, run_case, select_cases};

/// Print every case id with its category.
pub fn list_cases(cases_dir: &Path) -> Result<()> {
    let cases = discover_cases(cases_dir)?;
    for case in cases {
        println!("{} {}", case.test.id, case.test.category);
    }
    Ok(())
}

/// Run the selected cases against `binary` and print a report.
///
/// Returns whether every case passed.
pub fn run_cases_by_id(
    cases_dir: &Path,
    binary: &Path,
    ids: &[String],
    category: Option<Category>,
    options: &HarnessOptions,
) -> Result<bool> {
    let cases = discover_cases(cases_dir)?;
    let cases = select_cases(cases, ids, category)?;
    if cases.is_empty() {
        bail!("no cases matched in {}", cases_dir.display());
    }
    debug!(count = cases.len(), "cases selected");

    info!(run_id = %options.run_id, count = cases.len(), "starting run");
    let mut runs = Vec::with_capacity(cases.len());
    for case in &cases {
        let run = run_case(binary, case, options)
            .with_context(|| format!("run case {}", case.test.id))?;
        for line in render_case(&run) {
            println!("{line}");
        }
        if let Some(workspace) = &run.workspace {
            println!("  workspace: {}", workspace.display());
        }
        if let Some(results) = &run.results_dir {
            println!("  results: {}", results.display());
        }
        runs.push(run);
    }

    let summary = summarize(&runs);
    for line in render_summary(&summary) {
        println!("{line}");
    }
    Ok(summary.all_passed())
}
