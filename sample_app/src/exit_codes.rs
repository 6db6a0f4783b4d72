//! Stable exit codes for the `sample_app` CLI.

/// Output was written.
pub const OK: i32 = 0;
/// Any handled failure: missing config path, malformed JSON, wrong value type,
/// or an I/O error creating the output directory or writing the file.
pub const FAILURE: i32 = 1;
