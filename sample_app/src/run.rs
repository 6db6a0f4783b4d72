//! The single CLI pipeline: config path → merged mapping → output file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::config::{AppConfig, load_config_from_path, test_value};

/// Name of the artifact written into the output directory.
pub const OUTPUT_FILE_NAME: &str = "output.txt";

/// Inputs for one invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// File or directory to read; defaults to `working_dir`.
    pub config_path: Option<PathBuf>,
    /// Directory that relative paths (config and output) resolve against.
    pub working_dir: PathBuf,
}

/// What a successful invocation touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub config_path: PathBuf,
    pub output_dir: PathBuf,
    pub output_file: PathBuf,
}

/// Resolve config, ensure the output directory, write `<test>\n` to `output.txt`.
///
/// Every failure is terminal; nothing is retried or rolled back. The output
/// directory is created before the `test` value is checked, so a type error
/// can leave an empty directory behind but never touches `output.txt`.
#[instrument(skip_all)]
pub fn run(options: &RunOptions) -> Result<RunReport> {
    let config_path = match &options.config_path {
        Some(path) => options.working_dir.join(path),
        None => options.working_dir.clone(),
    };
    info!(config = %config_path.display(), "using config");

    let config = load_config_from_path(&config_path).context("failed to load configuration")?;
    debug!(keys = config.len(), "configuration loaded");

    let output_dir = AppConfig::from_map(&config)?.resolve_output_dir(&options.working_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("create output directory {}", output_dir.display()))?;
    info!(output_dir = %output_dir.display(), "output directory ready");

    let value = test_value(&config)?;
    let output_file = write_output(&output_dir, &value).context("failed to write output")?;
    info!(output = %output_file.display(), "wrote output");

    Ok(RunReport {
        config_path,
        output_dir,
        output_file,
    })
}

/// Overwrite `<dir>/output.txt` with `value` plus one newline.
fn write_output(dir: &Path, value: &str) -> Result<PathBuf> {
    let path = dir.join(OUTPUT_FILE_NAME);
    fs::write(&path, format!("{value}\n")).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
