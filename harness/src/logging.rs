//! Harness diagnostics.
//!
//! The case report (`case:` and `report:` lines) is the harness's product and
//! goes to stdout. Tracing from case orchestration, workspace setup and the
//! executor goes to stderr, filtered by `RUST_LOG` (default `warn`), so
//! turning diagnostics up never changes the report a caller parses.
//!
//! ```bash
//! RUST_LOG=harness::executor=debug cargo run -p harness -- run basic_file_config
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber. Call once, before any case runs.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
