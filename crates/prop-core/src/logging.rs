//! Optional tracing subscriber bootstrap

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Level used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Install a compact stdout subscriber for the engine's diagnostics.
///
/// `RUST_LOG` selects the levels, defaulting to [`DEFAULT_LOG_FILTER`] so
/// that only non-converging filter chains and misbehaving converters are
/// reported. Fails if a global subscriber is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_with_filter(DEFAULT_LOG_FILTER)
}

/// Same as [`init`] with a custom fallback filter, e.g. `"prop_core=debug"`.
pub fn init_with_filter(fallback: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
