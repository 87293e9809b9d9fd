//! Core types and traits for the intraday trading engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Candle, Tick, IndicatorSample)
//! - Trade signals and target levels
//! - Order and position types
//! - Traits for indicators, the order API, market data and signal policies

pub mod error;
pub mod traits;
pub mod types;

pub use error::{TradingError, TradingResult};
pub use traits::*;
pub use types::*;
