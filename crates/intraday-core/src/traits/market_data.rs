//! Market data collaborator interfaces.

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::mpsc;

use crate::error::{DataError, FeedError};
use crate::types::{Candle, Instrument, Tick};

/// Trait for historical candle sources.
#[async_trait]
pub trait HistoricalSource: Send + Sync {
    /// Fetch base-interval candles up to and including `date`, ordered
    /// oldest to newest. Empty results are valid.
    async fn historical_candles(
        &self,
        instrument: &Instrument,
        date: NaiveDate,
    ) -> Result<Vec<Candle>, DataError>;

    /// Fetch the current session's base-interval candles, ordered oldest
    /// to newest. Empty results are valid.
    async fn intraday_candles(&self, instrument: &Instrument) -> Result<Vec<Candle>, DataError>;
}

/// Market open/closed state derived from the first feed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketStatus {
    Open,
    #[default]
    Closed,
}

/// Per-instrument delivery channels registered with the live feed.
#[derive(Debug)]
pub struct InstrumentChannels {
    /// Completed base-interval candles
    pub candles: mpsc::Sender<Candle>,
    /// Trade prints
    pub ticks: mpsc::Sender<Tick>,
}

/// Trait for the shared live-data connection.
///
/// Subscriptions take effect on the next message cycle.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Register an instrument for delivery into the given channels.
    async fn subscribe(
        &self,
        instrument: &Instrument,
        channels: InstrumentChannels,
    ) -> Result<(), FeedError>;

    /// Stop delivery for an instrument and drop its channels.
    async fn unsubscribe(&self, instrument: &Instrument) -> Result<(), FeedError>;

    /// Open/closed state derived from the first message after connect.
    async fn market_status(&self) -> MarketStatus;
}
