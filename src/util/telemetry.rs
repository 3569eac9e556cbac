//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor the configuration supplies one.
pub const DEFAULT_LOG_FILTER: &str = "course_admission=info";

/// Install a default fmt subscriber unless the host application already set one.
///
/// `RUST_LOG` wins over `fallback_filter`; `fallback_filter` wins over
/// [`DEFAULT_LOG_FILTER`].
pub fn init_tracing(fallback_filter: Option<&str>) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(fallback_filter.unwrap_or(DEFAULT_LOG_FILTER))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
