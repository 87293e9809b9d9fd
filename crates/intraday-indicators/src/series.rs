//! Committed sample storage shared by all indicators.

use chrono::{DateTime, Utc};
use intraday_core::IndicatorSample;

/// Append-only history of committed indicator values.
#[derive(Debug, Clone, Default)]
pub struct SampleSeries {
    samples: Vec<IndicatorSample>,
}

impl SampleSeries {
    /// Empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed value; it becomes the current sample.
    pub fn record(&mut self, value: f64, timestamp: DateTime<Utc>) {
        self.samples.push(IndicatorSample::new(value, timestamp));
    }

    /// Most recent sample.
    pub fn current(&self) -> Option<&IndicatorSample> {
        self.samples.last()
    }

    /// All samples, oldest first.
    pub fn history(&self) -> &[IndicatorSample] {
        &self.samples
    }
}
