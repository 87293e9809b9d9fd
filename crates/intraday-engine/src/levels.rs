//! Profit-booking level ladder.

use intraday_core::{TargetLevel, TradeSignal, STOP_LEVEL};

/// Generates evenly spaced percentage rungs above an entry price.
///
/// Rung `n` sits at `entry * (1 + step * n / 100)`. One reserved stop
/// slot ([`STOP_LEVEL`]) is emitted below the entry alongside the second
/// rung; it is carried through the data model but nothing places an
/// order against it.
#[derive(Debug, Clone)]
pub struct LevelLadder {
    step_pct: f64,
}

impl LevelLadder {
    /// Create a ladder with the given percentage step between rungs.
    pub fn new(step_pct: f64) -> Self {
        Self { step_pct }
    }

    /// Derive `count` profit rungs (plus the stop slot) from an entry
    /// signal.
    pub fn rungs(&self, count: usize, entry: &TradeSignal) -> Vec<TargetLevel> {
        let t0 = entry.price;
        let mut levels = Vec::with_capacity(count + 1);

        for n in 1..=count as i32 {
            levels.push(TargetLevel {
                level: n,
                price: t0 * (1.0 + self.step_pct * n as f64 / 100.0),
                timestamp: entry.timestamp,
            });

            if n == 2 {
                levels.push(TargetLevel {
                    level: STOP_LEVEL,
                    price: t0 * (1.0 - self.step_pct * 2.0 / 100.0),
                    timestamp: entry.timestamp,
                });
            }
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use intraday_core::SignalKind;

    fn entry() -> TradeSignal {
        TradeSignal {
            kind: SignalKind::Buy,
            price: 200.0,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            levels: Vec::new(),
        }
    }

    #[test]
    fn test_rung_prices() {
        let ladder = LevelLadder::new(1.0);
        let rungs = ladder.rungs(5, &entry());

        // 5 profit rungs plus the reserved stop slot
        assert_eq!(rungs.len(), 6);

        let first = rungs.iter().find(|l| l.level == 1).unwrap();
        assert!((first.price - 202.0).abs() < 1e-10);

        let fifth = rungs.iter().find(|l| l.level == 5).unwrap();
        assert!((fifth.price - 210.0).abs() < 1e-10);
    }

    #[test]
    fn test_stop_slot_sits_below_entry() {
        let ladder = LevelLadder::new(1.0);
        let rungs = ladder.rungs(5, &entry());

        let stop = rungs.iter().find(|l| l.level == STOP_LEVEL).unwrap();
        assert!((stop.price - 196.0).abs() < 1e-10);
    }

    #[test]
    fn test_profit_levels_come_back_ordered() {
        let ladder = LevelLadder::new(1.0);
        let mut signal = entry();
        signal.levels = ladder.rungs(4, &signal);

        let positive: Vec<i32> = signal.profit_levels().iter().map(|l| l.level).collect();
        assert_eq!(positive, vec![1, 2, 3, 4]);
    }
}
