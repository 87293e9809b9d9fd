//! Core data types for the intraday trading engine.

mod candle;
mod instrument;
mod order;
mod position;
mod signal;
mod snapshot;
mod tick;

pub use candle::Candle;
pub use instrument::{Instrument, Segment};
pub use order::{
    OrderDetails, OrderPayload, OrderRequest, OrderStatus, OrderType, Side, MARKET_PRICE_SENTINEL,
};
pub use position::{OrderRef, Position};
pub use signal::{SignalKind, TargetLevel, TradeSignal, STOP_LEVEL};
pub use snapshot::{IndicatorSample, IndicatorSnapshot};
pub use tick::Tick;
