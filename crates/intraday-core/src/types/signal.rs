//! Trade signals and profit-target levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved level index for the stop-loss slot.
///
/// The ladder generates this slot but nothing currently places an order
/// against it; only positive levels drive tiered profit booking.
pub const STOP_LEVEL: i32 = -2;

/// Discrete trading decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    /// No entry trigger yet
    Wait,
    /// Enter a long position
    Buy,
    /// Position open, no exit trigger yet
    Hold,
    /// Exit the position
    Sell,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Wait => write!(f, "WAIT"),
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Hold => write!(f, "HOLD"),
            SignalKind::Sell => write!(f, "SELL"),
        }
    }
}

/// One price target attached to a signal.
///
/// Positive `level` values are profit targets ordered by ascending index;
/// [`STOP_LEVEL`] marks the reserved stop-loss slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetLevel {
    /// Signed level index
    pub level: i32,
    /// Target price for this level
    pub price: f64,
    /// When the level was derived
    pub timestamp: DateTime<Utc>,
}

/// A trading decision with the price and time it was computed at, plus the
/// profit-booking levels carried through from the level ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// The decision
    pub kind: SignalKind,
    /// Price the decision was computed at (last traded price)
    pub price: f64,
    /// Time the decision was computed at (last traded time)
    pub timestamp: DateTime<Utc>,
    /// Profit targets and the reserved stop slot
    pub levels: Vec<TargetLevel>,
}

impl TradeSignal {
    /// Profit targets only, in ascending level order.
    pub fn profit_levels(&self) -> Vec<&TargetLevel> {
        let mut positive: Vec<&TargetLevel> =
            self.levels.iter().filter(|l| l.level > 0).collect();
        positive.sort_by_key(|l| l.level);
        positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_levels_filters_and_orders() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let signal = TradeSignal {
            kind: SignalKind::Buy,
            price: 100.0,
            timestamp: ts,
            levels: vec![
                TargetLevel { level: 2, price: 102.0, timestamp: ts },
                TargetLevel { level: STOP_LEVEL, price: 98.0, timestamp: ts },
                TargetLevel { level: 1, price: 101.0, timestamp: ts },
            ],
        };

        let profit = signal.profit_levels();
        assert_eq!(profit.len(), 2);
        assert_eq!(profit[0].level, 1);
        assert_eq!(profit[1].level, 2);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(SignalKind::Buy.to_string(), "BUY");
        assert_eq!(SignalKind::Wait.to_string(), "WAIT");
    }
}
