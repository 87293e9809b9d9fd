//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, BrokerSettings, FeedConfig, GatewaySettings, LoggingConfig,
    TradingSettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// Environment variables use the `INTRADAY` prefix with `__` separators,
/// e.g. `INTRADAY__GATEWAY__MIN_SUBMIT_DELAY_MS=500`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("INTRADAY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
