//! Tracing subscriber setup for the `oddball` binary.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the `-v` flags, e.g. `ODDBALL_LOG=oddball_experiment=trace`.
pub const LOG_ENV: &str = "ODDBALL_LOG";

/// - 0 → `"info"`
/// - 1 → `"debug"`
/// - 2+ → `"trace"`
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global fmt subscriber on stderr. Safe to call twice.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));

    let use_ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_ansi)
        .with_target(verbosity >= 1)
        .with_writer(std::io::stderr)
        .try_init();
}
