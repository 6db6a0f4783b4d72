//! Assertion evaluation.
//!
//! Turns the `assertions` section of a case into a list of check outcomes
//! for one CLI result.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::case::{Assertions, ExecutionAssertions, FileCheck};
use crate::executor::CliResult;

/// Log markers that count as a logged error for `no_errors_logged`.
const ERROR_MARKERS: [&str; 3] = [" ERROR ", "panicked at", "stack backtrace"];
/// Log markers that count as a logged warning for `no_warnings_logged`.
const WARNING_MARKERS: [&str; 2] = [" WARN ", "WARNING"];

/// Collected check outcomes for a case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Judgment {
    pub checks: Vec<CheckOutcome>,
}

impl Judgment {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|check| !check.passed)
    }
}

/// Result of a single check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckOutcome {
    pub label: String,
    pub passed: bool,
    /// Why the check failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckOutcome {
    fn pass(label: String) -> Self {
        Self {
            label,
            passed: true,
            detail: None,
        }
    }

    fn fail(label: String, detail: String) -> Self {
        Self {
            label,
            passed: false,
            detail: Some(detail),
        }
    }

    fn from_check(label: String, outcome: std::result::Result<(), String>) -> Self {
        match outcome {
            Ok(()) => Self::pass(label),
            Err(detail) => Self::fail(label, detail),
        }
    }
}

/// Evaluate every assertion against `result` and the files under `workspace_root`.
#[instrument(skip_all, fields(file_checks = assertions.files.len()))]
pub fn judge(assertions: &Assertions, result: &CliResult, workspace_root: &Path) -> Result<Judgment> {
    let mut checks = execution_checks(&assertions.execution, result)?;
    for check in &assertions.files {
        let outcome = file_check(check, workspace_root);
        debug!(check = %outcome.label, passed = outcome.passed, "check result");
        checks.push(outcome);
    }
    Ok(Judgment { checks })
}

fn execution_checks(expected: &ExecutionAssertions, result: &CliResult) -> Result<Vec<CheckOutcome>> {
    let mut checks = Vec::new();

    if let Some(code) = expected.exit_code {
        let label = format!("exit_code({code})");
        checks.push(if result.exit_code == code {
            CheckOutcome::pass(label)
        } else {
            CheckOutcome::fail(
                label,
                format!(
                    "expected exit code {code}, got {}\nstdout: {}\nstderr: {}",
                    result.exit_code, result.stdout, result.stderr
                ),
            )
        });
    }
    for text in &expected.stdout_contains {
        checks.push(contains_check("stdout_contains", &result.stdout, text, true));
    }
    for text in &expected.stdout_not_contains {
        checks.push(contains_check("stdout_not_contains", &result.stdout, text, false));
    }
    for text in &expected.stderr_contains {
        checks.push(contains_check("stderr_contains", &result.stderr, text, true));
    }
    if let Some(pattern) = &expected.stdout_matches {
        let regex = Regex::new(pattern).with_context(|| format!("compile regex {pattern}"))?;
        let label = format!("stdout_matches({pattern})");
        checks.push(if regex.is_match(&result.stdout) {
            CheckOutcome::pass(label)
        } else {
            CheckOutcome::fail(label, format!("pattern not found in stdout: {}", result.stdout))
        });
    }
    if let Some(max) = expected.max_execution_time {
        let actual = result.execution_time.as_secs_f64();
        let label = format!("max_execution_time({max})");
        checks.push(if actual <= max {
            CheckOutcome::pass(label)
        } else {
            CheckOutcome::fail(
                label,
                format!("execution time {actual:.2}s exceeds maximum {max:.2}s"),
            )
        });
    }
    if expected.no_errors_logged {
        checks.push(marker_check("no_errors_logged", &ERROR_MARKERS, result));
    }
    if expected.no_warnings_logged {
        checks.push(marker_check("no_warnings_logged", &WARNING_MARKERS, result));
    }
    Ok(checks)
}

fn marker_check(label: &str, markers: &[&str], result: &CliResult) -> CheckOutcome {
    let found = markers
        .iter()
        .find(|marker| result.stdout.contains(**marker) || result.stderr.contains(**marker));
    match found {
        None => CheckOutcome::pass(label.to_string()),
        Some(marker) => CheckOutcome::fail(
            label.to_string(),
            format!("output contains '{}'", marker.trim()),
        ),
    }
}

fn contains_check(kind: &str, haystack: &str, needle: &str, want: bool) -> CheckOutcome {
    let label = format!("{kind}({needle})");
    match (haystack.contains(needle), want) {
        (true, true) | (false, false) => CheckOutcome::pass(label),
        (false, true) => CheckOutcome::fail(label, format!("'{needle}' not found in: {haystack}")),
        (true, false) => CheckOutcome::fail(label, format!("'{needle}' unexpectedly found in: {haystack}")),
    }
}

fn file_check(check: &FileCheck, root: &Path) -> CheckOutcome {
    match check {
        FileCheck::FileExists { path } => CheckOutcome::from_check(
            format!("file_exists({})", path.display()),
            if root.join(path).exists() {
                Ok(())
            } else {
                Err(format!("file does not exist: {}", path.display()))
            },
        ),
        FileCheck::FileNotExists { path } => CheckOutcome::from_check(
            format!("file_not_exists({})", path.display()),
            if root.join(path).exists() {
                Err(format!("file exists but should not: {}", path.display()))
            } else {
                Ok(())
            },
        ),
        FileCheck::DirExists { path } => CheckOutcome::from_check(
            format!("dir_exists({})", path.display()),
            if root.join(path).is_dir() {
                Ok(())
            } else {
                Err(format!("not a directory: {}", path.display()))
            },
        ),
        FileCheck::DirEmpty { path } => CheckOutcome::from_check(
            format!("dir_empty({})", path.display()),
            dir_entries(root, path).and_then(|entries| {
                if entries.is_empty() {
                    Ok(())
                } else {
                    Err(format!("directory {} contains {entries:?}", path.display()))
                }
            }),
        ),
        FileCheck::DirNotEmpty { path } => CheckOutcome::from_check(
            format!("dir_not_empty({})", path.display()),
            dir_entries(root, path).and_then(|entries| {
                if entries.is_empty() {
                    Err(format!("directory is empty: {}", path.display()))
                } else {
                    Ok(())
                }
            }),
        ),
        FileCheck::FileEquals { path, content } => CheckOutcome::from_check(
            format!("file_equals({})", path.display()),
            read_text(root, path).and_then(|actual| {
                if &actual == content {
                    Ok(())
                } else {
                    Err(format!("expected {content:?}, got {actual:?}"))
                }
            }),
        ),
        FileCheck::FileContains { path, text } => CheckOutcome::from_check(
            format!("file_contains({}, {text})", path.display()),
            read_text(root, path).and_then(|actual| {
                if actual.contains(text.as_str()) {
                    Ok(())
                } else {
                    Err(format!("'{text}' missing from {}", path.display()))
                }
            }),
        ),
        FileCheck::FileNotContains { path, text } => CheckOutcome::from_check(
            format!("file_not_contains({}, {text})", path.display()),
            read_text(root, path).and_then(|actual| {
                if actual.contains(text.as_str()) {
                    Err(format!("'{text}' found in {}", path.display()))
                } else {
                    Ok(())
                }
            }),
        ),
        FileCheck::FileContainsLines { path, lines } => CheckOutcome::from_check(
            format!("file_contains_lines({})", path.display()),
            read_text(root, path).and_then(|actual| {
                match lines.iter().find(|line| !actual.contains(line.as_str())) {
                    None => Ok(()),
                    Some(missing) => {
                        Err(format!("{} missing expected line '{missing}'", path.display()))
                    }
                }
            }),
        ),
        FileCheck::FileLineCount { path, count } => CheckOutcome::from_check(
            format!("file_line_count({}, {count})", path.display()),
            read_text(root, path).and_then(|actual| {
                let lines = actual.lines().count();
                if lines == *count {
                    Ok(())
                } else {
                    Err(format!("expected {count} lines, got {lines}"))
                }
            }),
        ),
        FileCheck::FileEmpty { path } => CheckOutcome::from_check(
            format!("file_empty({})", path.display()),
            file_len(root, path).and_then(|len| {
                if len == 0 {
                    Ok(())
                } else {
                    Err(format!("file is not empty: {} ({len} bytes)", path.display()))
                }
            }),
        ),
        FileCheck::FileNotEmpty { path } => CheckOutcome::from_check(
            format!("file_not_empty({})", path.display()),
            file_len(root, path).and_then(|len| {
                if len == 0 {
                    Err(format!("file is empty: {}", path.display()))
                } else {
                    Ok(())
                }
            }),
        ),
        FileCheck::FilesEqual { left, right } => CheckOutcome::from_check(
            format!("files_equal({}, {})", left.display(), right.display()),
            read_bytes(root, left).and_then(|a| {
                read_bytes(root, right).and_then(|b| {
                    if a == b {
                        Ok(())
                    } else {
                        Err(format!(
                            "{} and {} have different content",
                            left.display(),
                            right.display()
                        ))
                    }
                })
            }),
        ),
        FileCheck::FileValidUtf8 { path } => CheckOutcome::from_check(
            format!("file_valid_utf8({})", path.display()),
            read_text(root, path).map(|_| ()),
        ),
    }
}

fn read_bytes(root: &Path, path: &Path) -> std::result::Result<Vec<u8>, String> {
    fs::read(root.join(path)).map_err(|err| format!("read {}: {err}", path.display()))
}

fn read_text(root: &Path, path: &Path) -> std::result::Result<String, String> {
    let bytes = read_bytes(root, path)?;
    String::from_utf8(bytes).map_err(|err| format!("{} is not valid UTF-8: {err}", path.display()))
}

fn file_len(root: &Path, path: &Path) -> std::result::Result<u64, String> {
    fs::metadata(root.join(path))
        .map(|meta| meta.len())
        .map_err(|err| format!("stat {}: {err}", path.display()))
}

fn dir_entries(root: &Path, path: &Path) -> std::result::Result<Vec<String>, String> {
    let entries = fs::read_dir(root.join(path))
        .map_err(|err| format!("read directory {}: {err}", path.display()))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| format!("read entry: {err}"))?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}
