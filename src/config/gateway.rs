use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

use config::{
    builder::DefaultState, Config as RawConfig, ConfigBuilder, ConfigError, Environment, File,
    FileFormat,
};

use super::{BackendConfig, FanoutConfig, HttpConfig, LoggingConfig};
use crate::ConfigValidationError;

/// Main application configuration
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Metering backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Account fetch concurrency
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// HTTP API configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sub-accounts owned by each owner id
    #[serde(default)]
    pub accounts: BTreeMap<String, Vec<String>>,
}

impl Config {
    /// Default configuration directory
    pub const CONFIG_DIR: &'static str = "config";

    /// Environment variable prefix
    const ENV_PREFIX: &'static str = "USAGE_GATEWAY";

    /// Build configuration using the following priority (highest to lowest):
    /// 1. Environment variables (USAGE_GATEWAY_*, `__` between nested keys)
    /// 2. Local configuration file (config/local.yaml)
    /// 3. Environment specific file (config/{env}.yaml)
    /// 4. Default configuration (config/default.yaml)
    /// 5. Built-in defaults
    pub fn new() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Self::defaults()?
            // Load default config file
            .add_source(
                File::new(&format!("{}/default", Self::CONFIG_DIR), FileFormat::Yaml)
                    .required(false),
            )
            // Load environment specific config
            .add_source(
                File::new(
                    &format!("{}/{}", Self::CONFIG_DIR, environment),
                    FileFormat::Yaml,
                )
                .required(false),
            )
            // Load local overrides
            .add_source(
                File::new(&format!("{}/local", Self::CONFIG_DIR), FileFormat::Yaml).required(false),
            )
            .add_source(Self::environment())
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate().map_err(Self::validation_error)?;

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            // Load the specified config file
            .add_source(File::from(path))
            // Add env vars as overrides
            .add_source(Self::environment())
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate().map_err(Self::validation_error)?;

        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.backend.validate()?;
        self.fanout.validate()?;
        self.http.validate()?;
        self.logging.validate()?;

        if let Some(owner) = self.accounts.keys().find(|owner| owner.is_empty()) {
            return Err(ConfigValidationError::config(format!(
                "Owner id must not be empty (accounts entry {:?})",
                owner
            )));
        }

        Ok(())
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Config::default();

        // Set defaults for each field manually
        RawConfig::builder()
            // Backend configuration
            .set_default("backend.url", defaults.backend.url)?
            .set_default("backend.token_subject", defaults.backend.token_subject)?
            .set_default(
                "backend.token_ttl",
                format!("{}s", defaults.backend.token_ttl.as_secs()),
            )?
            .set_default(
                "backend.request_timeout",
                format!("{}s", defaults.backend.request_timeout.as_secs()),
            )?
            .set_default(
                "backend.connect_timeout",
                format!("{}s", defaults.backend.connect_timeout.as_secs()),
            )?
            // Fan-out configuration
            .set_default(
                "fanout.max_concurrent_fetches",
                defaults.fanout.max_concurrent_fetches as i64,
            )?
            // HTTP configuration
            .set_default("http.enabled", defaults.http.enabled)?
            .set_default("http.bind_addr", defaults.http.bind_addr)?
            .set_default("http.bind_port", defaults.http.bind_port)?
            // Logging configuration
            .set_default("logging.log_dir", defaults.logging.log_dir)?
            .set_default("logging.file_output", defaults.logging.file_output)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .set_default(
                "logging.include_location",
                defaults.logging.include_location,
            )?
            .set_default("logging.thread_ids", defaults.logging.thread_ids)?
            .set_default("logging.thread_names", defaults.logging.thread_names)
    }

    fn environment() -> Environment {
        Environment::with_prefix(Self::ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn validation_error(err: ConfigValidationError) -> ConfigError {
        ConfigError::Message(err.to_string())
    }
}
