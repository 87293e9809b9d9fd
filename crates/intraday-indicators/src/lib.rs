//! Streaming technical indicators and the indicator pipeline.
//!
//! Indicators here are incremental: they fold completed aggregated candles
//! into cumulative state one at a time and can produce a best-effort
//! real-time estimate between candle completions. Each keeps an append-only
//! sample history.

pub mod ema;
pub mod pipeline;
pub mod series;
pub mod vwap;

pub use ema::Ema;
pub use pipeline::IndicatorPipeline;
pub use series::SampleSeries;
pub use vwap::Vwap;
