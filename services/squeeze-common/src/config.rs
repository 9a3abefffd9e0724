//! Configuration for the squeeze scanner services.
//!
//! Configuration is read from `~/.squeeze/config.json`. Every field has a
//! default, so a missing file (or a partial one) yields a usable config.
//! Selected values can be overridden through environment variables, see
//! [`Config::apply_env_overrides`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".squeeze"),
        |dirs| dirs.home_dir().join(".squeeze"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Bind address and port of the scanner HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default: "127.0.0.1" (local only)
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4480
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "json" for structured output, "pretty" for humans
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Scanner Configuration
// ============================================================================

/// Batch scheduling, pacing and universe settings for the scan orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Symbols fetched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between two batches, in milliseconds (provider rate limits)
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Delay between two per-item updates, in milliseconds.
    /// Purely presentational; 0 releases all items at once.
    #[serde(default = "default_item_stagger_ms")]
    pub item_stagger_ms: u64,

    /// Wait between two cycles in continuous mode, in seconds
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Upper bound on cycles for a continuous session
    #[serde(default = "default_max_continuous_cycles")]
    pub max_continuous_cycles: u32,

    /// How many expanded-universe symbols are merged into an explicit symbol list
    #[serde(default = "default_expanded_merge_cap")]
    pub expanded_merge_cap: usize,

    /// How many expanded-universe symbols are scanned when no symbols are given
    #[serde(default = "default_expanded_default_cap")]
    pub expanded_default_cap: usize,

    /// Capacity of the per-session event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            item_stagger_ms: default_item_stagger_ms(),
            cycle_interval_secs: default_cycle_interval_secs(),
            max_continuous_cycles: default_max_continuous_cycles(),
            expanded_merge_cap: default_expanded_merge_cap(),
            expanded_default_cap: default_expanded_default_cap(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay_ms() -> u64 {
    2_000
}

fn default_item_stagger_ms() -> u64 {
    100
}

fn default_cycle_interval_secs() -> u64 {
    30
}

fn default_max_continuous_cycles() -> u32 {
    1_000
}

fn default_expanded_merge_cap() -> usize {
    50
}

fn default_expanded_default_cap() -> usize {
    100
}

fn default_event_buffer() -> usize {
    64
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Which metrics provider backs the scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deterministic synthetic metrics
    #[default]
    Demo,
    /// Live Ortex REST API
    Ortex,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "ortex" | "live" => Ok(Self::Ortex),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Metrics provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider selection
    #[serde(default)]
    pub kind: ProviderKind,

    /// Ortex API key. Usually supplied through `ORTEX_API_KEY`.
    #[serde(default)]
    pub ortex_api_key: Option<String>,

    /// Ortex API base URL
    #[serde(default = "default_ortex_base_url")]
    pub ortex_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            ortex_api_key: None,
            ortex_base_url: default_ortex_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_ortex_base_url() -> String {
    "https://api.ortex.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    /// Scoring weights and rule thresholds. Kept as raw JSON here; the
    /// scanner crate owns the typed tables and fills in defaults.
    #[serde(default)]
    pub scoring: Option<serde_json::Value>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("SQUEEZE_PORT") {
            match port.parse() {
                Ok(p) => self.network.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid SQUEEZE_PORT"),
            }
        }

        if let Ok(bind) = std::env::var("SQUEEZE_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Ok(level) = std::env::var("SQUEEZE_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(format) = std::env::var("SQUEEZE_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Ok(provider) = std::env::var("SQUEEZE_PROVIDER") {
            match provider.parse() {
                Ok(kind) => self.provider.kind = kind,
                Err(e) => tracing::warn!(error = %e, "Ignoring invalid SQUEEZE_PROVIDER"),
            }
        }

        if let Ok(key) = std::env::var("ORTEX_API_KEY") {
            if !key.trim().is_empty() {
                self.provider.ortex_api_key = Some(key);
            }
        }
    }

    /// Ortex API key, if one is configured and non-empty.
    pub fn ortex_api_key(&self) -> Option<&str> {
        self.provider
            .ortex_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
