//! Pluggable trading decision function.

use crate::types::{IndicatorSnapshot, SignalKind, Tick};

/// The externally supplied decision function.
///
/// Must be a pure function of the snapshot and tick: the signal engine
/// keeps no decision state across calls beyond the snapshot reference.
pub trait SignalPolicy: Send + Sync {
    /// Decide on a trading action for the current tick.
    fn decide(&self, snapshot: &IndicatorSnapshot, tick: &Tick) -> SignalKind;
}

impl<F> SignalPolicy for F
where
    F: Fn(&IndicatorSnapshot, &Tick) -> SignalKind + Send + Sync,
{
    fn decide(&self, snapshot: &IndicatorSnapshot, tick: &Tick) -> SignalKind {
        self(snapshot, tick)
    }
}

/// Placeholder policy that never trades.
///
/// Wired in by the binary until an operator supplies a real strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldPolicy;

impl SignalPolicy for HoldPolicy {
    fn decide(&self, _snapshot: &IndicatorSnapshot, _tick: &Tick) -> SignalKind {
        SignalKind::Wait
    }
}
