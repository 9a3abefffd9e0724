//! Logging setup for the scanner services.
//!
//! HTTP plumbing crates log heavily at debug level; they are pinned to
//! `warn` unless `RUST_LOG` says otherwise.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Modules pinned to `warn`.
pub const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls", "tower_http"];

/// Build the filter directives for a base level.
fn directives(log_level: &str) -> String {
    NOISY_MODULES
        .iter()
        .fold(String::from(log_level), |mut acc, module| {
            acc.push_str(&format!(",{module}=warn"));
            acc
        })
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(log_level)))
}

/// Initialize logging.
///
/// * `log_level` - Base log level (trace, debug, info, warn, error)
/// * `log_format` - "json" for structured JSON, anything else for pretty output
///
/// Calling this twice is harmless; the second registration is ignored.
pub fn init_logging(log_level: &str, log_format: &str) {
    let subscriber = tracing_subscriber::registry().with(build_filter(log_level));

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        let _ = subscriber.with(fmt_layer).try_init();
    }

    tracing::info!(
        log_level = %log_level,
        log_format = %log_format,
        noise_filtered = NOISY_MODULES.len(),
        "Logging initialized"
    );
}

/// Create a tracing span for one scan session.
///
/// # Example
///
/// ```ignore
/// let span = scan_span!(session_id, continuous = true);
/// async move { /* ... */ }.instrument(span).await;
/// ```
#[macro_export]
macro_rules! scan_span {
    ($session_id:expr) => {
        tracing::info_span!("scan_session", session_id = %$session_id)
    };
    ($session_id:expr, $($field:tt)*) => {
        tracing::info_span!("scan_session", session_id = %$session_id, $($field)*)
    };
}
