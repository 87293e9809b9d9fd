//! Validate configuration command.

use anyhow::Result;
use intraday_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!("Broker API: {}", config.broker.api_base);
            println!("Gateway delay: {}ms", config.gateway.min_submit_delay_ms);
            println!("Aggregation span: {}m", config.trading.aggregation_span);
            println!(
                "EMA periods: {} / {}",
                config.trading.ema_fast, config.trading.ema_slow
            );
            println!("Default quantity: {}", config.trading.default_quantity);
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
