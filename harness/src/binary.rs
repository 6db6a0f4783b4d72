//! Locating (and building) the CLI under test.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::info;

/// Cargo package and binary name of the CLI.
pub const APP_PACKAGE: &str = "sample_app";

/// Build the CLI with `cargo build -p sample_app` and return its path.
pub fn build_app_binary(repo_root: &Path) -> Result<PathBuf> {
    info!(package = APP_PACKAGE, "building binary");
    let output = Command::new("cargo")
        .arg("build")
        .arg("-p")
        .arg(APP_PACKAGE)
        .current_dir(repo_root)
        .output()
        .context("build app binary")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} build failed: {}", APP_PACKAGE, stderr.trim());
    }
    let path = app_binary_path(repo_root);
    if !path.exists() {
        bail!("binary not found at {}", path.display());
    }
    Ok(path)
}

pub fn app_binary_path(repo_root: &Path) -> PathBuf {
    let binary = format!("{APP_PACKAGE}{}", std::env::consts::EXE_SUFFIX);
    repo_root.join("target").join("debug").join(binary)
}

/// Use `explicit` when given, otherwise build from `repo_root`.
pub fn resolve_binary(explicit: Option<&Path>, repo_root: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => bail!("binary not found at {}", path.display()),
        None => build_app_binary(repo_root),
    }
}
