//! Workspace creation.
//!
//! Each case runs in its own temporary directory seeded from the case inputs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::TempDir;
use tracing::debug;

use crate::case::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, CaseFile, WORKSPACE_PLACEHOLDER};

/// An isolated workspace for running a case.
///
/// The directory is removed on drop unless it was created with `keep = true`.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Create a workspace for `case` and write its config and seeded files.
pub fn create_workspace(case: &CaseFile, keep: bool) -> Result<Workspace> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("{}_", case.test.id))
        .disable_cleanup(keep)
        .tempdir()
        .context("create workspace dir")?;
    let root = dir.path();

    if let Some(config) = &case.inputs.config {
        write_json(&root.join(CONFIG_FILE_NAME), config)?;
    }
    if !case.inputs.config_dir.is_empty() {
        let config_dir = root.join(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("create {}", config_dir.display()))?;
        for (name, value) in &case.inputs.config_dir {
            write_json(&config_dir.join(name), value)?;
        }
    }
    for (relative, contents) in &case.inputs.files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    }

    debug!(root = %root.display(), keep, "workspace ready");
    Ok(Workspace { dir })
}

/// CLI arguments for `case` run inside `root`.
///
/// Explicit `inputs.args` win (with `{workspace}` substituted); otherwise the
/// config directory, then the config file, is passed via `--config`. With
/// neither, no `--config` is passed and the CLI reads its working directory.
pub fn build_args(case: &CaseFile, root: &Path) -> Vec<String> {
    let root_str = root.display().to_string();
    let mut args = match &case.inputs.args {
        Some(explicit) => explicit
            .iter()
            .map(|arg| arg.replace(WORKSPACE_PLACEHOLDER, &root_str))
            .collect(),
        None => config_args(case, root),
    };
    if case.inputs.verbose && !args.iter().any(|arg| arg == "--verbose" || arg == "-v") {
        args.push("--verbose".to_string());
    }
    args
}

fn config_args(case: &CaseFile, root: &Path) -> Vec<String> {
    let target: Option<PathBuf> = if !case.inputs.config_dir.is_empty() {
        Some(root.join(CONFIG_DIR_NAME))
    } else if case.inputs.config.is_some() {
        Some(root.join(CONFIG_FILE_NAME))
    } else {
        None
    };
    match target {
        Some(path) => vec!["--config".to_string(), path.display().to_string()],
        None => Vec::new(),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(value).context("serialize json")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
