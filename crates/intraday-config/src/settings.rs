//! Configuration structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub trading: TradingSettings,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "intraday".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Brokerage API hosts and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Standard API host (data, order status/cancel, feed authorize)
    pub api_base: String,
    /// Low-latency host for order placement
    pub hft_base: String,
    /// Environment variable holding the access token
    pub access_token_env: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.upstox.com".to_string(),
            hft_base: "https://api-hft.upstox.com".to_string(),
            access_token_env: "UPSTOX_ACCESS_TOKEN".to_string(),
        }
    }
}

/// Live feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Seconds to wait before reconnecting after a transport error
    pub reconnect_delay_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 5,
        }
    }
}

/// Order gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Minimum milliseconds between order submissions
    pub min_submit_delay_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            min_submit_delay_ms: 250,
        }
    }
}

/// Trading and pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSettings {
    /// Base candles per aggregated candle
    pub aggregation_span: usize,
    /// Base candles in one full trading session
    pub session_minutes: usize,
    /// Fast EMA period
    pub ema_fast: usize,
    /// Slow EMA period
    pub ema_slow: usize,
    /// Shares bought per BUY signal unless overridden per instrument
    pub default_quantity: u32,
    /// Milliseconds between order status polls
    pub poll_interval_ms: u64,
    /// Maximum status polls before giving up on an order
    pub poll_limit: usize,
    /// Exchange price tick; limit prices round to a multiple of it
    pub price_tick: Decimal,
    /// Percentage step between profit ladder rungs
    pub ladder_step_pct: f64,
    /// Number of profit rungs generated per entry
    pub ladder_levels: usize,
}

impl Default for TradingSettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            aggregation_span: 5,
            session_minutes: 375,
            ema_fast: 9,
            ema_slow: 20,
            default_quantity: 1,
            poll_interval_ms: 300,
            poll_limit: 1000,
            price_tick: dec!(0.05),
            ladder_step_pct: 1.0,
            ladder_levels: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.gateway.min_submit_delay_ms, 250);
        assert_eq!(config.trading.aggregation_span, 5);
        assert_eq!(config.trading.price_tick, dec!(0.05));
        assert_eq!(config.feed.reconnect_delay_secs, 5);
    }

    #[test]
    fn test_partial_toml_overlays_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [gateway]
            min_submit_delay_ms = 500

            [trading]
            aggregation_span = 5
            session_minutes = 375
            ema_fast = 9
            ema_slow = 20
            default_quantity = 20
            poll_interval_ms = 300
            poll_limit = 1000
            price_tick = "0.05"
            ladder_step_pct = 1.0
            ladder_levels = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.min_submit_delay_ms, 500);
        assert_eq!(config.trading.default_quantity, 20);
        // Untouched sections fall back to defaults
        assert_eq!(config.broker.api_base, "https://api.upstox.com");
    }
}
