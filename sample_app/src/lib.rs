//! Minimal config-to-file CLI.
//!
//! Reads a JSON configuration (a single file, or a directory of `*.json`
//! files merged in filename order), takes its `test` string and writes it to
//! `<output_dir>/output.txt`.
//!
//! - **[`config`]**: path resolution and merging, typed `output_dir` view.
//! - **[`run`]**: the one pipeline the binary executes.

pub mod config;
pub mod exit_codes;
pub mod logging;
pub mod run;
