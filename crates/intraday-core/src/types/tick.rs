//! Last-traded-price tick type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One trade print: last traded price/time/quantity plus previous close.
///
/// The feed is expected to deliver strictly increasing trade times per
/// instrument, but out-of-order and duplicate delivery is observed in
/// practice and is filtered at the feed boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Last traded price
    pub last_price: f64,
    /// Last traded time
    pub traded_at: DateTime<Utc>,
    /// Last traded quantity
    pub last_qty: u64,
    /// Previous session's close
    pub prev_close: f64,
}

impl Tick {
    /// Create a new tick.
    pub fn new(last_price: f64, traded_at: DateTime<Utc>, last_qty: u64, prev_close: f64) -> Self {
        Self {
            last_price,
            traded_at,
            last_qty,
            prev_close,
        }
    }

    /// Change versus the previous close, as a percentage.
    pub fn change_percent(&self) -> f64 {
        if self.prev_close == 0.0 {
            0.0
        } else {
            (self.last_price - self.prev_close) / self.prev_close * 100.0
        }
    }
}
