//! Per-instrument trade-signal computation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use intraday_core::{
    IndicatorSnapshot, Instrument, SignalKind, SignalPolicy, TargetLevel, Tick, TradeSignal,
};

use crate::levels::LevelLadder;

/// Applies the externally supplied decision function to each tick.
///
/// Snapshot updates only replace the latest reference and never compute a
/// signal; ticks compute a signal from (latest snapshot, tick) and
/// publish it. Ticks arriving before the first snapshot are dropped with
/// a log, not buffered. The profit-booking side-list is attached
/// identically to every emitted signal until replaced — either through
/// the levels channel or by the ladder regenerating on a BUY decision.
pub struct SignalEngine {
    instrument: Instrument,
    policy: Arc<dyn SignalPolicy>,
    snapshot_rx: mpsc::Receiver<IndicatorSnapshot>,
    tick_rx: mpsc::Receiver<Tick>,
    levels_rx: mpsc::Receiver<Vec<TargetLevel>>,
    signal_tx: mpsc::Sender<TradeSignal>,
    ladder: Option<(LevelLadder, usize)>,
    latest_snapshot: Option<IndicatorSnapshot>,
    profit_levels: Vec<TargetLevel>,
    history: Vec<TradeSignal>,
}

impl SignalEngine {
    /// Wire an engine between its input and output channels.
    pub fn new(
        instrument: Instrument,
        policy: Arc<dyn SignalPolicy>,
        snapshot_rx: mpsc::Receiver<IndicatorSnapshot>,
        tick_rx: mpsc::Receiver<Tick>,
        levels_rx: mpsc::Receiver<Vec<TargetLevel>>,
        signal_tx: mpsc::Sender<TradeSignal>,
    ) -> Self {
        Self {
            instrument,
            policy,
            snapshot_rx,
            tick_rx,
            levels_rx,
            signal_tx,
            ladder: None,
            latest_snapshot: None,
            profit_levels: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Regenerate the profit-booking side-list from this ladder whenever
    /// the policy decides BUY.
    pub fn with_ladder(mut self, ladder: LevelLadder, rungs: usize) -> Self {
        self.ladder = Some((ladder, rungs));
        self
    }

    /// Consume snapshots, ticks and level replacements until the
    /// producers go away.
    pub async fn run(mut self) {
        let mut levels_open = true;
        loop {
            tokio::select! {
                maybe_snapshot = self.snapshot_rx.recv() => {
                    match maybe_snapshot {
                        Some(snapshot) => {
                            debug!(
                                instrument = %self.instrument,
                                timestamp = %snapshot.timestamp,
                                "indicator snapshot replaced"
                            );
                            self.latest_snapshot = Some(snapshot);
                        }
                        None => break,
                    }
                }
                maybe_tick = self.tick_rx.recv() => {
                    match maybe_tick {
                        Some(tick) => {
                            if !self.on_tick(tick).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                maybe_levels = self.levels_rx.recv(), if levels_open => {
                    match maybe_levels {
                        Some(levels) => {
                            debug!(
                                instrument = %self.instrument,
                                count = levels.len(),
                                "profit-booking levels replaced"
                            );
                            self.profit_levels = levels;
                        }
                        None => levels_open = false,
                    }
                }
            }
        }
        info!(
            instrument = %self.instrument,
            signals = self.history.len(),
            "signal engine stopped"
        );
    }

    /// Returns false when the downstream consumer is gone.
    async fn on_tick(&mut self, tick: Tick) -> bool {
        let Some(snapshot) = &self.latest_snapshot else {
            debug!(
                instrument = %self.instrument,
                "no indicator snapshot yet; dropping tick"
            );
            return true;
        };

        let kind = self.policy.decide(snapshot, &tick);
        let mut signal = TradeSignal {
            kind,
            price: tick.last_price,
            timestamp: tick.traded_at,
            levels: self.profit_levels.clone(),
        };

        if kind == SignalKind::Buy {
            if let Some((ladder, rungs)) = &self.ladder {
                self.profit_levels = ladder.rungs(*rungs, &signal);
                signal.levels = self.profit_levels.clone();
            }
        }

        info!(
            instrument = %self.instrument,
            signal = %signal.kind,
            price = signal.price,
            timestamp = %signal.timestamp,
            "trade signal"
        );

        let publishable = signal.clone();
        self.history.push(signal);
        self.signal_tx.send(publishable).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use intraday_core::SignalKind;

    struct Harness {
        snapshot_tx: mpsc::Sender<IndicatorSnapshot>,
        tick_tx: mpsc::Sender<Tick>,
        levels_tx: mpsc::Sender<Vec<TargetLevel>>,
        signal_rx: mpsc::Receiver<TradeSignal>,
    }

    fn spawn_engine(policy: impl SignalPolicy + 'static) -> Harness {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let (tick_tx, tick_rx) = mpsc::channel(16);
        let (levels_tx, levels_rx) = mpsc::channel(16);
        let (signal_tx, signal_rx) = mpsc::channel(16);

        let engine = SignalEngine::new(
            Instrument::nse_eq("INE121J01017"),
            Arc::new(policy),
            snapshot_rx,
            tick_rx,
            levels_rx,
            signal_tx,
        );
        tokio::spawn(engine.run());

        Harness {
            snapshot_tx,
            tick_tx,
            levels_tx,
            signal_rx,
        }
    }

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot::new(ts(), vec![("VWAP".to_string(), 100.0)])
    }

    fn spawn_engine_with_ladder(policy: impl SignalPolicy + 'static) -> Harness {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let (tick_tx, tick_rx) = mpsc::channel(16);
        let (levels_tx, levels_rx) = mpsc::channel(16);
        let (signal_tx, signal_rx) = mpsc::channel(16);

        let engine = SignalEngine::new(
            Instrument::nse_eq("INE121J01017"),
            Arc::new(policy),
            snapshot_rx,
            tick_rx,
            levels_rx,
            signal_tx,
        )
        .with_ladder(LevelLadder::new(1.0), 4);
        tokio::spawn(engine.run());

        Harness {
            snapshot_tx,
            tick_tx,
            levels_tx,
            signal_rx,
        }
    }

    /// Let the engine task drain everything sent so far.
    async fn settle() {
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn test_signal_is_function_of_snapshot_and_tick() {
        let mut harness = spawn_engine(|snapshot: &IndicatorSnapshot, tick: &Tick| {
            if tick.last_price > snapshot.get("VWAP").unwrap_or(f64::MAX) {
                SignalKind::Buy
            } else {
                SignalKind::Wait
            }
        });

        harness.snapshot_tx.send(snapshot()).await.unwrap();
        settle().await;
        harness
            .tick_tx
            .send(Tick::new(101.0, ts(), 10, 99.0))
            .await
            .unwrap();

        let signal = harness.signal_rx.recv().await.unwrap();
        assert_eq!(signal.kind, SignalKind::Buy);
        assert_eq!(signal.price, 101.0);
        assert!(signal.levels.is_empty());
    }

    #[tokio::test]
    async fn test_tick_before_snapshot_is_dropped() {
        let mut harness = spawn_engine(|_: &IndicatorSnapshot, _: &Tick| SignalKind::Buy);

        harness
            .tick_tx
            .send(Tick::new(101.0, ts(), 10, 99.0))
            .await
            .unwrap();
        settle().await;
        // Now deliver a snapshot and a second tick; only one signal comes out
        harness.snapshot_tx.send(snapshot()).await.unwrap();
        settle().await;
        harness
            .tick_tx
            .send(Tick::new(102.0, ts(), 10, 99.0))
            .await
            .unwrap();

        let signal = harness.signal_rx.recv().await.unwrap();
        assert_eq!(signal.price, 102.0);
        assert!(harness.signal_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_levels_attach_to_every_signal_until_replaced() {
        let mut harness = spawn_engine(|_: &IndicatorSnapshot, _: &Tick| SignalKind::Hold);

        harness.snapshot_tx.send(snapshot()).await.unwrap();
        settle().await;
        let levels = vec![TargetLevel {
            level: 1,
            price: 101.0,
            timestamp: ts(),
        }];
        harness.levels_tx.send(levels.clone()).await.unwrap();
        settle().await;

        harness
            .tick_tx
            .send(Tick::new(101.0, ts(), 10, 99.0))
            .await
            .unwrap();
        harness
            .tick_tx
            .send(Tick::new(102.0, ts(), 10, 99.0))
            .await
            .unwrap();

        let first = harness.signal_rx.recv().await.unwrap();
        let second = harness.signal_rx.recv().await.unwrap();
        assert_eq!(first.levels, levels);
        assert_eq!(second.levels, levels);
    }

    #[tokio::test]
    async fn test_buy_decision_regenerates_ladder_levels() {
        let mut harness = spawn_engine_with_ladder(|_: &IndicatorSnapshot, tick: &Tick| {
            if tick.last_price >= 200.0 {
                SignalKind::Buy
            } else {
                SignalKind::Wait
            }
        });

        harness.snapshot_tx.send(snapshot()).await.unwrap();
        settle().await;

        // First tick waits and carries no levels
        harness
            .tick_tx
            .send(Tick::new(150.0, ts(), 10, 99.0))
            .await
            .unwrap();
        let wait = harness.signal_rx.recv().await.unwrap();
        assert_eq!(wait.kind, SignalKind::Wait);
        assert!(wait.levels.is_empty());

        // The BUY tick gets a freshly derived ladder off its own price
        harness
            .tick_tx
            .send(Tick::new(200.0, ts(), 10, 99.0))
            .await
            .unwrap();
        let buy = harness.signal_rx.recv().await.unwrap();
        assert_eq!(buy.kind, SignalKind::Buy);
        assert_eq!(buy.profit_levels().len(), 4);
        assert!((buy.profit_levels()[0].price - 202.0).abs() < 1e-10);

        // Later signals keep carrying the same side-list
        harness
            .tick_tx
            .send(Tick::new(150.0, ts(), 10, 99.0))
            .await
            .unwrap();
        let hold = harness.signal_rx.recv().await.unwrap();
        assert_eq!(hold.levels, buy.levels);
    }
}
