//! Exponential moving average over aggregated candle closes.

use intraday_core::error::IndicatorError;
use intraday_core::{Candle, EstimateInput, Indicator, IndicatorSample};

use crate::series::SampleSeries;

/// Exponential moving average of closing prices.
///
/// Smoothing factor is `2 / (period + 1)` unless an explicit smoothing
/// span overrides it. Must be seeded from history before the first
/// `update`: the seed value is the simple average of the last `period`
/// closes of the provided window.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    previous: Option<f64>,
    series: SampleSeries,
}

impl Ema {
    /// Create an EMA with the given period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "period must be greater than 0");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            previous: None,
            series: SampleSeries::new(),
        }
    }

    /// Create an EMA whose smoothing factor is derived from an explicit
    /// span instead of the period.
    pub fn with_smoothing(period: usize, smoothing_span: usize) -> Self {
        assert!(period > 0, "period must be greater than 0");
        assert!(smoothing_span > 0, "smoothing span must be greater than 0");
        Self {
            period,
            alpha: 2.0 / (smoothing_span as f64 + 1.0),
            previous: None,
            series: SampleSeries::new(),
        }
    }

    /// The configured period.
    pub fn period(&self) -> usize {
        self.period
    }

    /// The smoothing factor in use.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn step(&self, price: f64, previous: f64) -> f64 {
        self.alpha * price + (1.0 - self.alpha) * previous
    }
}

impl Indicator for Ema {
    fn update(&mut self, candle: &Candle) -> Result<(), IndicatorError> {
        let previous = self
            .previous
            .ok_or_else(|| IndicatorError::Uninitialized("EMA".to_string()))?;

        let value = self.step(candle.close, previous);
        self.previous = Some(value);
        self.series.record(value, candle.timestamp);
        Ok(())
    }

    fn estimate(&mut self, input: EstimateInput<'_>) -> Option<f64> {
        match input {
            EstimateInput::Tick(tick) => {
                let previous = self.previous?;
                Some(self.step(tick.last_price, previous))
            }
            EstimateInput::PartialCandle(_) => None,
        }
    }

    fn seed_history(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
        if candles.len() < self.period {
            return Err(IndicatorError::InsufficientHistory {
                required: self.period,
                available: candles.len(),
            });
        }

        let tail = &candles[candles.len() - self.period..];
        let sma = tail.iter().map(|c| c.close).sum::<f64>() / self.period as f64;

        self.previous = Some(sma);
        self.series.record(sma, tail[tail.len() - 1].timestamp);
        Ok(())
    }

    fn current(&self) -> Option<&IndicatorSample> {
        self.series.current()
    }

    fn history(&self) -> &[IndicatorSample] {
        self.series.history()
    }
}
