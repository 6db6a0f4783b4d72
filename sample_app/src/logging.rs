//! Log output for the CLI.
//!
//! Unlike the harness diagnostics, these lines are part of the product output:
//! they go to stdout and carry a timestamp, level and target on every line so
//! callers (and the YAML harness) can grep for the resolved config path and
//! output directory.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stdout subscriber.
///
/// `verbose` lowers the level from `info` to `debug`; it has no other effect.
pub fn init(verbose: bool) {
    let filter = EnvFilter::new(level(verbose));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(false)
                .with_target(true),
        )
        .init();
}

fn level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_selects_debug() {
        assert_eq!(level(true), "debug");
        assert_eq!(level(false), "info");
    }
}
