use serde::{Deserialize, Serialize};

use crate::executor::CliResult;
use crate::validators::Judgment;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
    /// The CLI timed out or could not be started, so its checks say nothing.
    Error,
}

pub fn classify_outcome(result: &CliResult, judgment: &Judgment) -> Outcome {
    if result.timed_out || result.spawn_failed {
        return Outcome::Error;
    }
    if judgment.passed() {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::CheckOutcome;
    use std::path::PathBuf;
    use std::time::Duration;

    fn result(exit_code: i32, stderr: &str, timed_out: bool) -> CliResult {
        CliResult {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
            execution_time: Duration::from_millis(1),
            command: Vec::new(),
            working_dir: PathBuf::from("/tmp"),
            timed_out,
            spawn_failed: stderr.starts_with("Command failed:"),
            truncated_bytes: 0,
        }
    }

    fn judgment(pass: bool) -> Judgment {
        Judgment {
            checks: vec![CheckOutcome {
                label: "exit_code(0)".to_string(),
                passed: pass,
                detail: None,
            }],
        }
    }

    #[test]
    fn pass_when_all_checks_pass() {
        assert_eq!(classify_outcome(&result(0, "", false), &judgment(true)), Outcome::Pass);
    }

    #[test]
    fn fail_when_a_check_fails() {
        assert_eq!(classify_outcome(&result(1, "", false), &judgment(false)), Outcome::Fail);
    }

    #[test]
    fn error_when_cli_did_not_complete() {
        let timed_out = result(-1, "Command timed out after 1 seconds", true);
        assert_eq!(classify_outcome(&timed_out, &judgment(true)), Outcome::Error);
        let spawn_failed = result(-1, "Command failed: spawn command", false);
        assert_eq!(classify_outcome(&spawn_failed, &judgment(false)), Outcome::Error);
    }
}
