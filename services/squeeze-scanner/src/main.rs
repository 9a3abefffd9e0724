//! Squeeze Scanner - short squeeze scoring and streamed batch scans.

use anyhow::{Context, Result};
use squeeze_common::config::Config;
use squeeze_common::logging::init_logging;
use squeeze_common::Validate;
use squeeze_scanner::ScannerService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    // Load configuration (file, then environment)
    let config = Config::load_with_env()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    config.validate().context("Invalid configuration")?;

    tracing::info!("Squeeze Scanner v{}", env!("CARGO_PKG_VERSION"));

    if config.provider.kind == squeeze_common::ProviderKind::Ortex && config.ortex_api_key().is_none() {
        tracing::warn!("Ortex provider selected but ORTEX_API_KEY is not set; scans will fail");
    }

    let service = ScannerService::new(config).context("Failed to initialize scanner")?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
