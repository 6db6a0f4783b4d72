use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use harness::binary::resolve_binary;
use harness::case::Category;
use harness::run::HarnessOptions;
use harness::{cli, logging};

const DEFAULT_CASES_DIR: &str = "sample_app/tests/cases";

#[derive(Parser)]
#[command(name = "harness", version, about = "YAML test harness for sample_app")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List case ids and categories.
    List {
        #[arg(long, value_name = "DIR", default_value = DEFAULT_CASES_DIR)]
        cases_dir: PathBuf,
    },
    /// Run cases (all of them when no ids are given).
    Run {
        case_ids: Vec<String>,
        #[arg(long, value_name = "DIR", default_value = DEFAULT_CASES_DIR)]
        cases_dir: PathBuf,
        /// Binary under test; built with cargo when omitted.
        #[arg(long, value_name = "PATH")]
        bin: Option<PathBuf>,
        #[arg(long, value_enum)]
        category: Option<Category>,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
        #[arg(long)]
        keep_workspaces: bool,
        #[arg(long, value_name = "DIR")]
        results_dir: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match execute(Cli::parse()) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn execute(cli: Cli) -> Result<bool> {
    let repo_root = std::env::current_dir().context("resolve current directory")?;
    match cli.command {
        Command::List { cases_dir } => {
            cli::list_cases(&repo_root.join(cases_dir))?;
            Ok(true)
        }
        Command::Run {
            case_ids,
            cases_dir,
            bin,
            category,
            timeout_secs,
            keep_workspaces,
            results_dir,
        } => {
            let binary = resolve_binary(bin.as_deref(), &repo_root)?;
            let options = HarnessOptions {
                timeout: Duration::from_secs(timeout_secs),
                keep_workspaces,
                results_dir,
                ..HarnessOptions::default()
            };
            cli::run_cases_by_id(
                &repo_root.join(cases_dir),
                &binary,
                &case_ids,
                category,
                &options,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_filters() {
        let cli = Cli::try_parse_from([
            "harness",
            "run",
            "basic",
            "merge",
            "--category",
            "feature",
            "--timeout-secs",
            "5",
            "--keep-workspaces",
        ])
        .expect("parse");
        match cli.command {
            Command::Run {
                case_ids,
                category,
                timeout_secs,
                keep_workspaces,
                cases_dir,
                ..
            } => {
                assert_eq!(case_ids, vec!["basic", "merge"]);
                assert_eq!(category, Some(Category::Feature));
                assert_eq!(timeout_secs, 5);
                assert!(keep_workspaces);
                assert_eq!(cases_dir, PathBuf::from(DEFAULT_CASES_DIR));
            }
            Command::List { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn list_takes_cases_dir() {
        let cli = Cli::try_parse_from(["harness", "list", "--cases-dir", "cases"]).expect("parse");
        assert!(matches!(cli.command, Command::List { cases_dir } if cases_dir == PathBuf::from("cases")));
    }
}
