//! YAML-driven integration harness for `sample_app`.
//!
//! Each case file describes inputs (config files, seeded files, CLI
//! arguments) and assertions about the process result and the files it
//! leaves in its workspace. Cases run sequentially, each in a fresh
//! temporary directory.

pub mod binary;
pub mod case;
pub mod cli;
pub mod executor;
pub mod logging;
pub mod outcome;
pub mod report;
pub mod results;
pub mod run;
pub mod validators;
pub mod workspace;
