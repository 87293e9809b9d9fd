//! Core traits for the intraday trading engine.

mod indicator;
mod market_data;
mod order_api;
mod policy;

pub use indicator::{EstimateInput, Indicator};
pub use market_data::{HistoricalSource, InstrumentChannels, MarketFeed, MarketStatus};
pub use order_api::OrderApi;
pub use policy::{HoldPolicy, SignalPolicy};
