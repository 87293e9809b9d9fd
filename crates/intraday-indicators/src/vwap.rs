//! Volume-weighted average price over aggregated candles.

use intraday_core::error::IndicatorError;
use intraday_core::{Candle, EstimateInput, Indicator, IndicatorSample};

use crate::series::SampleSeries;

/// Cumulative VWAP using the typical price (HLC average) per candle.
///
/// Estimates project the VWAP as if a buffered run of not-yet-committed
/// base-interval candles were merged in; the buffer is cleared whenever a
/// real candle commits so nothing is double counted.
#[derive(Debug, Clone, Default)]
pub struct Vwap {
    cumulative_price_volume: f64,
    cumulative_volume: u64,
    partial: Vec<Candle>,
    series: SampleSeries,
}

impl Vwap {
    /// Create an empty VWAP.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total committed volume.
    pub fn cumulative_volume(&self) -> u64 {
        self.cumulative_volume
    }
}

impl Indicator for Vwap {
    fn update(&mut self, candle: &Candle) -> Result<(), IndicatorError> {
        self.cumulative_price_volume += candle.typical_price() * candle.volume as f64;
        self.cumulative_volume += candle.volume;

        let value = if self.cumulative_volume == 0 {
            0.0
        } else {
            self.cumulative_price_volume / self.cumulative_volume as f64
        };
        self.series.record(value, candle.timestamp);
        self.partial.clear();
        Ok(())
    }

    fn estimate(&mut self, input: EstimateInput<'_>) -> Option<f64> {
        match input {
            EstimateInput::PartialCandle(candle) => {
                self.series.current()?;
                self.partial.push(*candle);

                let buffer_pv: f64 = self
                    .partial
                    .iter()
                    .map(|c| c.typical_price() * c.volume as f64)
                    .sum();
                let buffer_volume: u64 = self.partial.iter().map(|c| c.volume).sum();

                let projected_volume = self.cumulative_volume + buffer_volume;
                if projected_volume == 0 {
                    return Some(0.0);
                }
                Some((self.cumulative_price_volume + buffer_pv) / projected_volume as f64)
            }
            EstimateInput::Tick(_) => None,
        }
    }

    fn current(&self) -> Option<&IndicatorSample> {
        self.series.current()
    }

    fn history(&self) -> &[IndicatorSample] {
        self.series.history()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn candle(i: i64, high: f64, low: f64, close: f64, volume: u64) -> Candle {
        let start: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Candle::new(start + Duration::minutes(5 * i), low, high, low, close, volume)
    }

    #[test]
    fn test_vwap_single_candle_is_typical_price() {
        let mut vwap = Vwap::new();
        let c = candle(0, 102.0, 98.0, 100.0, 500);

        vwap.update(&c).unwrap();
        assert!((vwap.current().unwrap().value - c.typical_price()).abs() < 1e-10);
    }

    #[test]
    fn test_volume_accumulates_and_stays_in_range() {
        let mut vwap = Vwap::new();
        let candles = [
            candle(0, 102.0, 98.0, 100.0, 500),
            candle(1, 105.0, 101.0, 104.0, 300),
            candle(2, 104.0, 100.0, 101.0, 700),
        ];

        let mut last_volume = 0;
        for c in &candles {
            vwap.update(c).unwrap();
            assert!(vwap.cumulative_volume() >= last_volume);
            last_volume = vwap.cumulative_volume();

            let value = vwap.current().unwrap().value;
            assert!(value >= 98.0 && value <= 105.0);
        }
        assert_eq!(vwap.cumulative_volume(), 1500);
    }

    #[test]
    fn test_zero_volume_yields_zero() {
        let mut vwap = Vwap::new();
        vwap.update(&candle(0, 102.0, 98.0, 100.0, 0)).unwrap();
        assert_eq!(vwap.current().unwrap().value, 0.0);
    }

    #[test]
    fn test_estimate_projects_without_committing() {
        let mut vwap = Vwap::new();
        vwap.update(&candle(0, 102.0, 98.0, 100.0, 500)).unwrap();
        let committed = vwap.current().unwrap().value;

        let partial = candle(1, 110.0, 108.0, 109.0, 500);
        let estimate = vwap
            .estimate(EstimateInput::PartialCandle(&partial))
            .unwrap();
        assert!(estimate > committed);

        // Committed state untouched
        assert_eq!(vwap.cumulative_volume(), 500);
        assert!((vwap.current().unwrap().value - committed).abs() < 1e-10);
    }

    #[test]
    fn test_estimate_buffer_accumulates_within_interval() {
        let mut vwap = Vwap::new();
        vwap.update(&candle(0, 102.0, 98.0, 100.0, 500)).unwrap();

        let first = candle(1, 110.0, 108.0, 109.0, 100);
        let second = candle(2, 110.0, 108.0, 109.0, 100);
        vwap.estimate(EstimateInput::PartialCandle(&first)).unwrap();
        let estimate = vwap
            .estimate(EstimateInput::PartialCandle(&second))
            .unwrap();

        // Both buffered candles project into the estimate
        let expected_pv = 100.0 * 500.0 + 109.0 * 100.0 + 109.0 * 100.0;
        let expected = expected_pv / 700.0;
        assert!((estimate - expected).abs() < 1e-9);
    }

    #[test]
    fn test_update_clears_estimate_buffer() {
        let mut vwap = Vwap::new();
        vwap.update(&candle(0, 102.0, 98.0, 100.0, 500)).unwrap();
        vwap.estimate(EstimateInput::PartialCandle(&candle(1, 110.0, 108.0, 109.0, 100)))
            .unwrap();

        // Committing a real candle resets the projection buffer
        vwap.update(&candle(1, 110.0, 108.0, 109.0, 100)).unwrap();
        let estimate = vwap
            .estimate(EstimateInput::PartialCandle(&candle(2, 110.0, 108.0, 109.0, 0)))
            .unwrap();

        // With a zero-volume partial the estimate equals the committed VWAP
        assert!((estimate - vwap.current().unwrap().value).abs() < 1e-10);
    }

    #[test]
    fn test_estimate_without_committed_value_is_none() {
        let mut vwap = Vwap::new();
        let partial = candle(0, 110.0, 108.0, 109.0, 100);
        assert!(vwap
            .estimate(EstimateInput::PartialCandle(&partial))
            .is_none());
    }

    #[test]
    fn test_estimate_ignores_ticks() {
        let mut vwap = Vwap::new();
        vwap.update(&candle(0, 102.0, 98.0, 100.0, 500)).unwrap();

        let ts = DateTime::from_timestamp(1_700_001_000, 0).unwrap();
        let tick = intraday_core::Tick::new(101.0, ts, 10, 99.0);
        assert!(vwap.estimate(EstimateInput::Tick(&tick)).is_none());
    }
}
