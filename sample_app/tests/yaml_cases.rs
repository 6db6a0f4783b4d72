//! Runs every YAML case under `tests/cases/` through the harness.

use std::path::{Path, PathBuf};

use harness::case::discover_cases;
use harness::outcome::Outcome;
use harness::report::render_case;
use harness::run::{HarnessOptions, run_case};

fn cases_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("cases")
}

#[test]
fn yaml_cases_pass() {
    let cases = discover_cases(&cases_dir()).expect("discover cases");
    assert!(!cases.is_empty(), "no cases in {}", cases_dir().display());

    let binary = Path::new(env!("CARGO_BIN_EXE_sample_app"));
    let options = HarnessOptions::default();
    let mut failures = Vec::new();
    for case in &cases {
        let run = run_case(binary, case, &options).expect("run case");
        if run.outcome != Outcome::Pass {
            failures.extend(render_case(&run));
        }
    }

    assert!(failures.is_empty(), "failing cases:\n{}", failures.join("\n"));
}
