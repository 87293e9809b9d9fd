//! Real-time aggregation and per-instrument orchestration.
//!
//! Data flow per instrument: live feed -> candle/tick channels ->
//! [`CandleAggregator`] -> indicator pipeline -> [`SignalEngine`] ->
//! trade-signal channel -> position controller. [`FeedManager`]
//! supervises the shared feed connection and the set of
//! [`InstrumentWorker`]s subscribed to it.

mod aggregator;
mod levels;
mod manager;
mod signal_engine;
mod worker;

pub use aggregator::CandleAggregator;
pub use levels::LevelLadder;
pub use manager::FeedManager;
pub use signal_engine::SignalEngine;
pub use worker::{InstrumentWorker, WorkerHandle, WorkerSettings};
