//! Case file parsing and validation.
//!
//! Cases are YAML files with `test`, `inputs` and `assertions` sections.
//! See `sample_app/tests/cases/` for examples.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder in explicit `args` replaced by the workspace root.
pub const WORKSPACE_PLACEHOLDER: &str = "{workspace}";
/// File name used for `inputs.config`.
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Directory name used for `inputs.config_dir`.
pub const CONFIG_DIR_NAME: &str = "config";

/// A parsed case file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseFile {
    pub test: CaseMeta,
    #[serde(default)]
    pub inputs: CaseInputs,
    pub assertions: Assertions,
    /// File the case was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Case metadata.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Unit,
    Feature,
    Integration,
    Example,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Unit => "unit",
            Category::Feature => "feature",
            Category::Integration => "integration",
            Category::Example => "example",
        };
        f.write_str(label)
    }
}

/// Files to seed into the workspace and how to invoke the CLI.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CaseInputs {
    /// Written to `config.json` at the workspace root.
    pub config: Option<Value>,
    /// Written as individual files under `config/`.
    #[serde(default)]
    pub config_dir: BTreeMap<String, Value>,
    /// Raw files (workspace-relative path → contents).
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Explicit CLI arguments; derived from the config inputs when absent.
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub verbose: bool,
    /// Per-case override of the harness timeout.
    pub timeout_secs: Option<u64>,
}

/// Expectations checked after the CLI exits.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Assertions {
    #[serde(default)]
    pub execution: ExecutionAssertions,
    #[serde(default)]
    pub files: Vec<FileCheck>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExecutionAssertions {
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout_contains: Vec<String>,
    #[serde(default)]
    pub stdout_not_contains: Vec<String>,
    #[serde(default)]
    pub stderr_contains: Vec<String>,
    /// Regular expression searched for in stdout.
    pub stdout_matches: Option<String>,
    /// Upper bound on wall-clock time, in seconds.
    pub max_execution_time: Option<f64>,
    #[serde(default)]
    pub no_errors_logged: bool,
    #[serde(default)]
    pub no_warnings_logged: bool,
}

impl ExecutionAssertions {
    fn is_empty(&self) -> bool {
        self.exit_code.is_none()
            && self.stdout_contains.is_empty()
            && self.stdout_not_contains.is_empty()
            && self.stderr_contains.is_empty()
            && self.stdout_matches.is_none()
            && self.max_execution_time.is_none()
            && !self.no_errors_logged
            && !self.no_warnings_logged
    }
}

/// Filesystem expectation, relative to the workspace root.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileCheck {
    FileExists { path: PathBuf },
    FileNotExists { path: PathBuf },
    DirExists { path: PathBuf },
    DirEmpty { path: PathBuf },
    DirNotEmpty { path: PathBuf },
    /// Exact contents.
    FileEquals { path: PathBuf, content: String },
    FileContains { path: PathBuf, text: String },
    FileNotContains { path: PathBuf, text: String },
    /// Every entry appears somewhere in the file.
    FileContainsLines { path: PathBuf, lines: Vec<String> },
    FileLineCount { path: PathBuf, count: usize },
    FileEmpty { path: PathBuf },
    FileNotEmpty { path: PathBuf },
    FilesEqual { left: PathBuf, right: PathBuf },
    FileValidUtf8 { path: PathBuf },
}

impl FileCheck {
    /// Every workspace-relative path the check reads.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            FileCheck::FileExists { path }
            | FileCheck::FileNotExists { path }
            | FileCheck::DirExists { path }
            | FileCheck::DirEmpty { path }
            | FileCheck::DirNotEmpty { path }
            | FileCheck::FileEquals { path, .. }
            | FileCheck::FileContains { path, .. }
            | FileCheck::FileNotContains { path, .. }
            | FileCheck::FileContainsLines { path, .. }
            | FileCheck::FileLineCount { path, .. }
            | FileCheck::FileEmpty { path }
            | FileCheck::FileNotEmpty { path }
            | FileCheck::FileValidUtf8 { path } => vec![path.as_path()],
            FileCheck::FilesEqual { left, right } => vec![left.as_path(), right.as_path()],
        }
    }
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        let mut case =
            Self::parse_str(&contents).with_context(|| format!("load case {}", path.display()))?;
        case.source = Some(path.to_path_buf());
        Ok(case)
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = serde_yaml::from_str(contents).context("parse case yaml")?;
        case.validate()?;
        Ok(case)
    }

    /// Timeout for this case, falling back to `default_secs`.
    pub fn timeout_secs(&self, default_secs: u64) -> u64 {
        self.inputs.timeout_secs.unwrap_or(default_secs)
    }

    fn validate(&self) -> Result<()> {
        validate_case_id(&self.test.id)?;
        if self.test.name.trim().is_empty() {
            bail!("test.name must be non-empty");
        }
        if self.inputs.timeout_secs == Some(0) {
            bail!("inputs.timeout_secs must be > 0");
        }
        for name in self.inputs.config_dir.keys() {
            if matches!(name.as_str(), "" | "." | "..") || name.contains('/') || name.contains('\\') {
                bail!("inputs.config_dir key '{name}' must be a plain file name");
            }
        }
        for path in self.inputs.files.keys() {
            validate_relative(Path::new(path))
                .with_context(|| format!("inputs.files '{path}' invalid"))?;
        }
        if let Some(args) = &self.inputs.args
            && args.iter().any(|arg| arg.is_empty())
        {
            bail!("inputs.args must not contain empty strings");
        }

        let execution = &self.assertions.execution;
        if execution.is_empty() && self.assertions.files.is_empty() {
            bail!("assertions must contain at least one check");
        }
        if let Some(pattern) = &execution.stdout_matches {
            Regex::new(pattern).context("assertions.execution.stdout_matches invalid")?;
        }
        if let Some(max) = execution.max_execution_time
            && (max.is_nan() || max <= 0.0)
        {
            bail!("assertions.execution.max_execution_time must be > 0");
        }
        for (index, check) in self.assertions.files.iter().enumerate() {
            for path in check.paths() {
                validate_relative(path)
                    .with_context(|| format!("assertions.files[{index}] invalid"))?;
            }
        }
        Ok(())
    }
}

/// Discover and load all case files (`*.yml`, `*.yaml`) in a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if !matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yml" | "yaml")
        ) {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.test.id.cmp(&right.test.id));
    for pair in cases.windows(2) {
        if pair[0].test.id == pair[1].test.id {
            return Err(anyhow!("duplicate test.id {}", pair[0].test.id));
        }
    }
    Ok(cases)
}

fn validate_case_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("test.id must be non-empty");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("test.id must use [a-z0-9_-] only");
    }
    Ok(())
}

/// Paths must stay inside the workspace.
fn validate_relative(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("path must be non-empty");
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("path {} must be relative to the workspace", path.display()),
        }
    }
    Ok(())
}
