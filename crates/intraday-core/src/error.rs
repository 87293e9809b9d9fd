//! Error types for the intraday trading engine.

use chrono::NaiveDate;
use thiserror::Error;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Indicator precondition and calculation errors.
///
/// These are fatal to the indicator that raised them, never to the
/// pipeline as a whole.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Insufficient history: need {required} candles, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Indicator not initialized: {0}")]
    Uninitialized(String),
}

/// Historical/intraday data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Live feed errors.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Retryable: connection closed, timeout, refused, DNS failure.
    #[error("Feed transport error: {0}")]
    Transport(String),

    /// Fatal to the connection: malformed frames, unexpected protocol state.
    #[error("Feed protocol error: {0}")]
    Protocol(String),

    #[error("Feed subscription error: {0}")]
    Subscription(String),
}

/// Order validation, submission and lifecycle errors.
#[derive(Error, Debug)]
pub enum OrderError {
    /// Bad caller input; fails fast, never queued.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// The brokerage rejected or failed the request.
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Order API error: {0}")]
    Api(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Order gateway unavailable")]
    GatewayClosed,

    #[error("Order {order_id} did not reach a terminal status after {attempts} polls")]
    PollTimeout { order_id: String, attempts: usize },
}

/// Signal handling errors.
#[derive(Error, Debug)]
pub enum SignalError {
    /// A BUY signal dated outside the current trading day must never
    /// trigger a live order.
    #[error("Stale BUY signal dated {signal_date}, today is {today}")]
    StaleSignal {
        signal_date: NaiveDate,
        today: NaiveDate,
    },
}

/// Result type alias for engine operations.
pub type TradingResult<T> = Result<T, TradingError>;
