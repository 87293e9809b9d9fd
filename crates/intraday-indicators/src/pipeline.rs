//! Named indicator set fed by completed aggregated candles.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use intraday_core::error::IndicatorError;
use intraday_core::{Candle, EstimateInput, Indicator, IndicatorSnapshot};

/// A named, insertion-ordered set of indicators.
///
/// Failures are isolated per indicator: one indicator erroring during
/// seeding or update never prevents the others from progressing. The
/// collected failures are returned so the caller can surface them.
pub struct IndicatorPipeline {
    indicators: Vec<(String, Box<dyn Indicator>)>,
}

impl IndicatorPipeline {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self {
            indicators: Vec::new(),
        }
    }

    /// Add an indicator under a name; insertion order is preserved for
    /// deterministic snapshots and logging.
    pub fn add(&mut self, name: impl Into<String>, indicator: Box<dyn Indicator>) {
        self.indicators.push((name.into(), indicator));
    }

    /// Number of indicators.
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    /// Whether the pipeline holds no indicators.
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Every indicator has a committed value.
    pub fn is_ready(&self) -> bool {
        !self.indicators.is_empty() && self.indicators.iter().all(|(_, i)| i.current().is_some())
    }

    /// Seed every indicator that supports history seeding; the rest
    /// no-op. Returns the per-indicator failures.
    pub fn initialize(&mut self, candles: &[Candle]) -> Vec<(String, IndicatorError)> {
        let mut failures = Vec::new();
        for (name, indicator) in &mut self.indicators {
            match indicator.seed_history(candles) {
                Ok(()) => {
                    if let Some(sample) = indicator.current() {
                        info!(indicator = %name, value = sample.value, "seeded from history");
                    }
                }
                Err(e) => {
                    warn!(indicator = %name, error = %e, "history seeding failed");
                    failures.push((name.clone(), e));
                }
            }
        }
        failures
    }

    /// Feed one completed aggregated candle to every indicator. Returns
    /// the per-indicator failures.
    pub fn update_all(&mut self, candle: &Candle) -> Vec<(String, IndicatorError)> {
        let mut failures = Vec::new();
        for (name, indicator) in &mut self.indicators {
            match indicator.update(candle) {
                Ok(()) => {
                    if let Some(sample) = indicator.current() {
                        info!(
                            indicator = %name,
                            value = sample.value,
                            timestamp = %candle.timestamp,
                            "updated"
                        );
                    }
                }
                Err(e) => {
                    warn!(indicator = %name, error = %e, "update failed");
                    failures.push((name.clone(), e));
                }
            }
        }
        failures
    }

    /// Real-time estimates for every indicator that understands the
    /// input kind.
    pub fn estimate_all(&mut self, input: EstimateInput<'_>) -> Vec<(String, f64)> {
        let mut estimates = Vec::new();
        for (name, indicator) in &mut self.indicators {
            if let Some(value) = indicator.estimate(input) {
                debug!(indicator = %name, value, "estimated");
                estimates.push((name.clone(), value));
            }
        }
        estimates
    }

    /// Point-in-time view of all committed values, in insertion order.
    /// Indicators without a committed value are omitted.
    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> IndicatorSnapshot {
        let values = self
            .indicators
            .iter()
            .filter_map(|(name, i)| i.current().map(|s| (name.clone(), s.value)))
            .collect();
        IndicatorSnapshot::new(timestamp, values)
    }
}

impl Default for IndicatorPipeline {
    fn default() -> Self {
        Self::new()
    }
}
