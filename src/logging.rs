use time::UtcOffset;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::{config::LoggingConfig, errors::InitializationError, GatewayError};

const LOG_FILE_PREFIX: &str = "usage-gateway.log";

/// Installs the global subscriber.
///
/// `RUST_LOG` directives take precedence over the configured level. When file
/// output is enabled the returned guard must be kept alive to flush the
/// writer on exit.
pub fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, GatewayError> {
    config.validate()?;

    let timer = OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        time::format_description::well_known::Rfc3339,
    );

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(config.thread_ids)
        .with_thread_names(config.thread_names)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_level(true)
        .with_timer(timer.clone());

    let console = if config.is_json() {
        console.json().with_filter(env_filter(config)).boxed()
    } else {
        console.with_filter(env_filter(config)).boxed()
    };

    let (file, guard) = if config.file_output {
        let appender = rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_timer(timer)
            .with_writer(writer)
            .json()
            .with_filter(env_filter(config))
            .boxed();

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| {
            GatewayError::init(InitializationError::logging(format!(
                "Failed to initialize logging: {}",
                e
            )))
        })?;

    Ok(guard)
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(config.get_level_filter().into())
        .from_env_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_is_rejected_before_init() {
        let config = LoggingConfig {
            format: "xml".to_string(),
            ..Default::default()
        };

        assert!(matches!(setup_logging(&config), Err(GatewayError::Config(_))));
    }
}
