//! Logging initialization and configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when nothing else is configured.
pub const DEFAULT_FILTER: &str = "zerocut=warn";

/// Build the log filter.
///
/// Priority: explicit `level` (from `--log-level`), then `ZEROCUT_LOG_LEVEL`,
/// then `RUST_LOG`, then [`DEFAULT_FILTER`]. A bare level such as `debug`
/// is scoped to this crate.
pub fn filter(level: Option<&str>) -> EnvFilter {
    let directive = level
        .map(str::to_string)
        .or_else(|| std::env::var("ZEROCUT_LOG_LEVEL").ok())
        .filter(|s| !s.trim().is_empty());

    match directive {
        Some(d) => {
            EnvFilter::try_new(scoped(&d)).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    }
}

fn scoped(directive: &str) -> String {
    let d = directive.trim();
    if matches!(d, "error" | "warn" | "info" | "debug" | "trace") {
        format!("zerocut={d}")
    } else {
        d.to_string()
    }
}

/// Initialize the logging system.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init(level: Option<&str>) {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init(level: Option<&str>) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}
