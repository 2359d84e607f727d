//! Tracing subscriber setup for binaries and tests.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize a tracing subscriber, reading the filter from `RUST_LOG` and
/// falling back to `info`.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_with_default("info")
}

/// Initialize a tracing subscriber with `default_level` used when `RUST_LOG`
/// is unset.
///
/// Fails if a global subscriber is already installed.
pub fn init_with_default(
    default_level: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
