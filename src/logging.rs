// src/logging.rs

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Инициализировать tracing. RUST_LOG важнее уровня из конфигурации.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_lowercase()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.enable_json_output {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
