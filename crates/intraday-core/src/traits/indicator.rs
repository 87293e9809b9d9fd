//! Streaming indicator trait.

use crate::error::IndicatorError;
use crate::types::{Candle, IndicatorSample, Tick};

/// Input for a real-time estimate between candle completions.
///
/// Each indicator names the input kind it understands by matching on this
/// union and returning `None` for the rest; there is no downcasting.
#[derive(Debug, Clone, Copy)]
pub enum EstimateInput<'a> {
    /// A live trade print (price-driven indicators)
    Tick(&'a Tick),
    /// A completed base-interval candle not yet folded into an aggregate
    /// (volume-driven indicators)
    PartialCandle(&'a Candle),
}

/// One streaming statistic over a sequence of aggregated candles.
///
/// `update` commits cumulative state; `estimate` produces a best-effort
/// value reflecting data not yet committed and must leave everything
/// `update` maintains untouched.
pub trait Indicator: Send {
    /// Fold one completed aggregated candle into cumulative state and
    /// append a sample.
    fn update(&mut self, candle: &Candle) -> Result<(), IndicatorError>;

    /// Best-effort real-time value between candle completions.
    ///
    /// Returns `None` when the input kind is not understood or no
    /// committed value exists yet. May buffer estimate-only inputs, but
    /// never mutates state committed by `update`.
    fn estimate(&mut self, input: EstimateInput<'_>) -> Option<f64>;

    /// Seed cumulative state from a historical candle window.
    ///
    /// The default is a no-op for indicators that do not support history
    /// seeding; the pipeline skips them rather than erroring.
    fn seed_history(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
        let _ = candles;
        Ok(())
    }

    /// Most recent committed sample.
    fn current(&self) -> Option<&IndicatorSample>;

    /// All committed samples, oldest first.
    fn history(&self) -> &[IndicatorSample];
}
