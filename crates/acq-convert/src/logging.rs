//! Diagnostic logging setup shared by the binaries

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber
///
/// Warnings and errors are always shown; `verbose` adds per-file and
/// per-channel detail. The filter is fixed here and ignores `RUST_LOG`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
