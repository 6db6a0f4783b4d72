use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};

use sample_app::exit_codes;
use sample_app::logging;
use sample_app::run::{RunOptions, run};

#[derive(Parser)]
#[command(
    name = "sample_app",
    version,
    about = "Write the configured 'test' value to <output_dir>/output.txt"
)]
struct Cli {
    /// Path to a config JSON file or a directory of JSON files (default: current directory).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug-level log output.
    #[arg(short, long)]
    verbose: bool,

    /// Ignored; accepted so existing scripts that pass a command keep working.
    command: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let code = match execute(&cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            error!("{:#}", err);
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}

fn execute(cli: &Cli) -> Result<()> {
    if let Some(command) = &cli.command {
        debug!(command = %command, "ignoring positional command");
    }
    let working_dir = std::env::current_dir().context("read current directory")?;
    run(&RunOptions {
        config_path: cli.config.clone(),
        working_dir,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["sample_app"]);
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parse_short_flags_and_ignored_command() {
        let cli = Cli::parse_from(["sample_app", "-c", "cfg", "-v", "generate"]);
        assert_eq!(cli.config, Some(PathBuf::from("cfg")));
        assert!(cli.verbose);
        assert_eq!(cli.command.as_deref(), Some("generate"));
    }

    #[test]
    fn parse_long_flags() {
        let cli = Cli::parse_from(["sample_app", "--config", "dir", "--verbose"]);
        assert_eq!(cli.config, Some(PathBuf::from("dir")));
        assert!(cli.verbose);
    }
}
