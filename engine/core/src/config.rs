//! TOML Configuration File Support
//!
//! This module provides centralized configuration loading for the engine,
//! supporting a TOML configuration file at `~/.config/deckhand/deckhand.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. Environment variables (`DECKHAND_*`)
//! 2. TOML configuration file
//! 3. Default values
//!
//! Provider credentials (`ALAI_EMAIL`, `ALAI_PASSWORD`, `ALAI_API_KEY`,
//! `FIRECRAWL_API_KEY`) are deliberately *not* part of this file: secrets are
//! read from the environment only. See [`crate::auth`] and [`crate::scrape`].
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file follows XDG Base Directory specification:
//! - `$XDG_CONFIG_HOME/deckhand/deckhand.toml` (typically `~/.config/deckhand/deckhand.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [provider]
//! api_base = "https://alai-standalone-backend.getalai.com"
//! stream_base = "wss://alai-standalone-backend.getalai.com"
//! auth_base = "https://api.getalai.com"
//! origin = "https://app.getalai.com"
//! viewer_base = "https://app.getalai.com/view"
//!
//! [timeouts]
//! http_secs = 120
//! stream_secs = 120
//!
//! [scrape]
//! extract_base = "https://api.firecrawl.dev"
//! max_attempts = 5
//! poll_interval_secs = 2
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Provider section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderToml {
    /// HTTPS base URL for the presentation REST API
    pub api_base: Option<String>,

    /// WSS base URL for the variant generation stream
    pub stream_base: Option<String>,

    /// HTTPS base URL for the token endpoint
    pub auth_base: Option<String>,

    /// Origin header value required by the provider
    pub origin: Option<String>,

    /// Base URL for shareable viewer links
    pub viewer_base: Option<String>,
}

/// Timeouts section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsToml {
    /// REST request timeout in seconds
    pub http_secs: Option<u64>,

    /// Generation stream drain timeout in seconds
    pub stream_secs: Option<u64>,
}

/// Scrape section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeToml {
    /// HTTPS base URL for the extraction service
    pub extract_base: Option<String>,

    /// Maximum extraction attempts before giving up
    pub max_attempts: Option<u32>,

    /// Interval between extraction job polls in seconds
    pub poll_interval_secs: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckhandToml {
    /// Provider endpoint configuration section
    pub provider: ProviderToml,

    /// Timeout configuration section
    pub timeouts: TimeoutsToml,

    /// Scrape configuration section
    pub scrape: ScrapeToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Remote presentation provider endpoints
#[derive(Clone, Debug)]
pub struct ProviderEndpoints {
    /// HTTPS base URL for the presentation REST API
    pub api_base: String,

    /// WSS base URL for the variant generation stream
    pub stream_base: String,

    /// HTTPS base URL for the token endpoint
    pub auth_base: String,

    /// Origin header value required by the provider
    pub origin: String,

    /// Base URL for shareable viewer links
    pub viewer_base: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            api_base: "https://alai-standalone-backend.getalai.com".to_string(),
            stream_base: "wss://alai-standalone-backend.getalai.com".to_string(),
            auth_base: "https://api.getalai.com".to_string(),
            origin: "https://app.getalai.com".to_string(),
            viewer_base: "https://app.getalai.com/view".to_string(),
        }
    }
}

/// Webpage extraction settings
#[derive(Clone, Debug)]
pub struct ScrapeConfig {
    /// HTTPS base URL for the extraction service
    pub extract_base: String,

    /// Maximum extraction attempts before giving up
    pub max_attempts: u32,

    /// Interval between extraction job polls
    pub poll_interval: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            extract_base: "https://api.firecrawl.dev".to_string(),
            max_attempts: 5,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Centralized configuration for the engine
///
/// This struct consolidates all configuration from multiple sources and tracks
/// where values came from. Use [`load_config`] to load configuration with
/// proper priority handling.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Remote presentation provider endpoints
    pub provider: ProviderEndpoints,

    /// REST request timeout
    pub http_timeout: Duration,

    /// Generation stream drain timeout
    ///
    /// Bounds a hung remote stream; a single slide attempt never waits longer
    /// than this for the server to finish streaming variants.
    pub stream_timeout: Duration,

    /// Webpage extraction settings
    pub scrape: ScrapeConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderEndpoints::default(),
            http_timeout: Duration::from_secs(120),
            stream_timeout: Duration::from_secs(120),
            scrape: ScrapeConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/deckhand/deckhand.toml` or
/// `~/.config/deckhand/deckhand.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("deckhand").join("deckhand.toml"))
}

/// Load configuration from all sources with proper priority
///
/// Priority order (highest first):
/// 1. Environment variables
/// 2. TOML configuration file
/// 3. Default values
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if a
/// resolved value is invalid. A missing config file is not an error (defaults
/// are used).
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if a resolved value is invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<EngineConfig, ConfigError> {
    // Start with defaults
    let mut config = EngineConfig::default();

    // Try to load from file
    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: DeckhandToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Apply environment variables (overrides file values)
    apply_env_config(&mut config);

    validate_config(&config)?;

    Ok(config)
}

/// Validate resolved configuration values
fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.http_timeout.is_zero() {
        return Err(ConfigError::ValidationError(
            "http timeout must be nonzero".to_string(),
        ));
    }
    // A zero stream timeout would reintroduce the unbounded hang on a stalled
    // generation stream.
    if config.stream_timeout.is_zero() {
        return Err(ConfigError::ValidationError(
            "stream timeout must be nonzero".to_string(),
        ));
    }
    if config.scrape.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "scrape max_attempts must be nonzero".to_string(),
        ));
    }
    Ok(())
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut EngineConfig, toml: &DeckhandToml) {
    // Provider settings
    if let Some(ref base) = toml.provider.api_base {
        config.provider.api_base = base.clone();
    }
    if let Some(ref base) = toml.provider.stream_base {
        config.provider.stream_base = base.clone();
    }
    if let Some(ref base) = toml.provider.auth_base {
        config.provider.auth_base = base.clone();
    }
    if let Some(ref origin) = toml.provider.origin {
        config.provider.origin = origin.clone();
    }
    if let Some(ref base) = toml.provider.viewer_base {
        config.provider.viewer_base = base.clone();
    }

    // Timeout settings
    if let Some(secs) = toml.timeouts.http_secs {
        config.http_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = toml.timeouts.stream_secs {
        config.stream_timeout = Duration::from_secs(secs);
    }

    // Scrape settings
    if let Some(ref base) = toml.scrape.extract_base {
        config.scrape.extract_base = base.clone();
    }
    if let Some(attempts) = toml.scrape.max_attempts {
        config.scrape.max_attempts = attempts;
    }
    if let Some(secs) = toml.scrape.poll_interval_secs {
        config.scrape.poll_interval = Duration::from_secs(secs);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut EngineConfig) {
    if let Ok(base) = std::env::var("DECKHAND_API_BASE") {
        config.provider.api_base = base;
        config.source = ConfigSource::Env;
    }
    if let Ok(base) = std::env::var("DECKHAND_STREAM_BASE") {
        config.provider.stream_base = base;
        config.source = ConfigSource::Env;
    }
    if let Ok(base) = std::env::var("DECKHAND_AUTH_BASE") {
        config.provider.auth_base = base;
        config.source = ConfigSource::Env;
    }
    if let Ok(origin) = std::env::var("DECKHAND_ORIGIN") {
        config.provider.origin = origin;
        config.source = ConfigSource::Env;
    }
    if let Ok(base) = std::env::var("DECKHAND_VIEWER_BASE") {
        config.provider.viewer_base = base;
        config.source = ConfigSource::Env;
    }

    if let Ok(secs) = std::env::var("DECKHAND_HTTP_TIMEOUT_SECS") {
        if let Ok(s) = secs.parse::<u64>() {
            config.http_timeout = Duration::from_secs(s);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(secs) = std::env::var("DECKHAND_STREAM_TIMEOUT_SECS") {
        if let Ok(s) = secs.parse::<u64>() {
            config.stream_timeout = Duration::from_secs(s);
            config.source = ConfigSource::Env;
        }
    }

    if let Ok(base) = std::env::var("DECKHAND_EXTRACT_BASE") {
        config.scrape.extract_base = base;
        config.source = ConfigSource::Env;
    }
    if let Ok(attempts) = std::env::var("DECKHAND_SCRAPE_MAX_ATTEMPTS") {
        if let Ok(n) = attempts.parse::<u32>() {
            config.scrape.max_attempts = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(secs) = std::env::var("DECKHAND_SCRAPE_POLL_SECS") {
        if let Ok(s) = secs.parse::<u64>() {
            config.scrape.poll_interval = Duration::from_secs(s);
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
