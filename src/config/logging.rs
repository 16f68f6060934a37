use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::ConfigValidationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory to store log files
    pub log_dir: String,

    /// Also write logs to a daily rolling file in `log_dir`
    pub file_output: bool,

    /// Minimum log level for console output
    pub level: String,

    /// Log format (pretty or json)
    pub format: String,

    /// Whether to include source code location in logs
    pub include_location: bool,

    /// Whether to include thread IDs in logs
    pub thread_ids: bool,

    /// Whether to include thread names in logs
    pub thread_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            file_output: false,
            level: "info".to_string(),
            format: "pretty".to_string(),
            include_location: false,
            thread_ids: false,
            thread_names: false,
        }
    }
}

impl Config {
    const LEVELS: [&'static str; 5] = ["error", "warn", "info", "debug", "trace"];
    const FORMATS: [&'static str; 2] = ["pretty", "json"];

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let level = self.level.to_lowercase();
        if !Self::LEVELS.contains(&level.as_str()) {
            return Err(ConfigValidationError::logging(format!(
                "Invalid log level: {}",
                self.level
            )));
        }

        if !Self::FORMATS.contains(&self.format.as_str()) {
            return Err(ConfigValidationError::logging(format!(
                "Invalid log format: {}",
                self.format
            )));
        }

        if self.file_output && self.log_dir.is_empty() {
            return Err(ConfigValidationError::logging(
                "log_dir must not be empty when file_output is enabled",
            ));
        }

        Ok(())
    }

    pub fn get_level_filter(&self) -> LevelFilter {
        match self.level.to_lowercase().as_str() {
            "error" => LevelFilter::ERROR,
            "warn" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO, // Fallback to INFO if invalid
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}
