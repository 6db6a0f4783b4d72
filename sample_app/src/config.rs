//! Configuration resolution.
//!
//! A config path is either a single JSON file or a directory. In directory
//! mode every `*.json` file directly inside it is merged in filename order,
//! with later files overriding keys set by earlier ones. Only two keys are
//! recognized (`output_dir` and `test`); everything else is carried along and
//! ignored.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Merged key-value mapping read from one or more JSON files.
pub type ConfigMap = Map<String, Value>;

pub const OUTPUT_DIR_KEY: &str = "output_dir";
pub const TEST_KEY: &str = "test";

/// Value written when the mapping has no `test` key.
pub const DEFAULT_TEST_VALUE: &str = "Hello World";
/// Output directory (relative to the working directory) used when `output_dir` is unset or empty.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Load the configuration mapping from a file or a directory of JSON files.
///
/// A file whose JSON root is not an object yields an empty mapping. A path
/// that is neither a file nor a directory is an error.
pub fn load_config_from_path(path: &Path) -> Result<ConfigMap> {
    if path.is_file() {
        return Ok(into_map(read_json(path)?));
    }
    if path.is_dir() {
        let mut merged = ConfigMap::new();
        for file in json_files_in(path)? {
            debug!(file = %file.display(), "merging config file");
            if let Value::Object(map) = read_json(&file)? {
                merged.extend(map);
            }
        }
        return Ok(merged);
    }
    bail!("config path not found: {}", path.display())
}

/// The `test` value, or [`DEFAULT_TEST_VALUE`] when absent.
pub fn test_value(config: &ConfigMap) -> Result<String> {
    match config.get(TEST_KEY) {
        None => Ok(DEFAULT_TEST_VALUE.to_string()),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => bail!(
            "configuration '{TEST_KEY}' must be a string, got {}",
            json_type_name(other)
        ),
    }
}

/// Typed view of the single persisted setting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub output_dir: Option<String>,
}

impl AppConfig {
    /// Load from a JSON file. A non-object root yields the default config.
    pub fn load(path: &Path) -> Result<Self> {
        let value = read_json(path)?;
        Self::from_map(&into_map(value))
    }

    /// Pick the recognized keys out of an already-resolved mapping.
    ///
    /// `null` and a missing key both mean "unset"; any other non-string value
    /// is rejected.
    pub fn from_map(config: &ConfigMap) -> Result<Self> {
        let output_dir = match config.get(OUTPUT_DIR_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(dir)) => Some(dir.clone()),
            Some(other) => bail!(
                "configuration '{OUTPUT_DIR_KEY}' must be a string, got {}",
                json_type_name(other)
            ),
        };
        Ok(Self { output_dir })
    }

    /// Write `{"output_dir": ...}` and nothing else (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(self).context("serialize config json")?;
        buf.push('\n');
        write_atomic(path, &buf)
    }

    /// Absolute output directory: the configured path when non-empty,
    /// otherwise `<cwd>/output`. Relative paths resolve against `cwd`.
    pub fn resolve_output_dir(&self, cwd: &Path) -> PathBuf {
        let configured = self
            .output_dir
            .as_deref()
            .filter(|dir| !dir.is_empty())
            .unwrap_or(DEFAULT_OUTPUT_DIR);
        normalize(&cwd.join(configured))
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn into_map(value: Value) -> ConfigMap {
    match value {
        Value::Object(map) => map,
        _ => ConfigMap::new(),
    }
}

/// Regular `*.json` files directly inside `dir`, sorted by name.
fn json_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read config dir {}", dir.display()))? {
        let entry = entry.context("read config entry")?;
        let path = entry.path();
        // `*.json` glob semantics: a file named exactly `.json` matches too.
        let matches = entry.file_name().to_string_lossy().ends_with(".json");
        if !matches || !path.is_file() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lexically collapse `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
