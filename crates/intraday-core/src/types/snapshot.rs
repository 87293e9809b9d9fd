//! Indicator samples and point-in-time snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One committed indicator value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSample {
    /// Computed value
    pub value: f64,
    /// Timestamp of the candle (or seed) the value was computed from
    pub timestamp: DateTime<Utc>,
}

impl IndicatorSample {
    /// Create a new sample.
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

/// A point-in-time view of every indicator in a pipeline.
///
/// Entries preserve pipeline insertion order so that logging and
/// downstream consumption are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// Timestamp of the candle that produced this snapshot
    pub timestamp: DateTime<Utc>,
    values: Vec<(String, f64)>,
}

impl IndicatorSnapshot {
    /// Create a snapshot from (name, value) pairs in pipeline order.
    pub fn new(timestamp: DateTime<Utc>, values: Vec<(String, f64)>) -> Self {
        Self { timestamp, values }
    }

    /// Look up an indicator by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Iterate entries in pipeline insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Number of indicator entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the snapshot carries no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
