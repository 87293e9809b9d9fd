//! Per-instrument wiring: aggregator, pipeline, signal engine and
//! position controller.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use intraday_core::{
    Candle, EstimateInput, HistoricalSource, IndicatorSnapshot, Instrument, InstrumentChannels,
    OrderApi, SignalPolicy, TargetLevel, Tick, TradingResult,
};
use intraday_execution::{ControllerSettings, OrderGateway, PositionController};
use intraday_indicators::{Ema, IndicatorPipeline, Vwap};

use crate::aggregator::CandleAggregator;
use crate::levels::LevelLadder;
use crate::signal_engine::SignalEngine;

/// Tunables shared by every instrument worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Base candles per aggregated candle
    pub aggregation_span: usize,
    /// Base candles in one trading session, used to isolate the previous
    /// session during warm-start
    pub session_minutes: usize,
    /// Fast EMA period
    pub ema_fast: usize,
    /// Slow EMA period
    pub ema_slow: usize,
    /// Percentage step between profit ladder rungs
    pub ladder_step_pct: f64,
    /// Profit rungs derived per BUY decision
    pub ladder_levels: usize,
    /// Capacity of each per-stage channel
    pub channel_capacity: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            aggregation_span: 5,
            session_minutes: 375,
            ema_fast: 9,
            ema_slow: 20,
            ladder_step_pct: 1.0,
            ladder_levels: 4,
            channel_capacity: 256,
        }
    }
}

/// Running per-instrument tasks plus the handles the supervisor keeps.
pub struct WorkerHandle {
    /// The instrument this worker owns
    pub instrument: Instrument,
    /// Replaces the profit-booking side-list on the signal engine
    pub levels_tx: mpsc::Sender<Vec<TargetLevel>>,
    /// Feed delivery channels, held here until the feed subscription
    /// takes them (kept alive so an unsubscribed worker stays idle
    /// instead of dying)
    pub channels: Option<InstrumentChannels>,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Stop every task belonging to this worker.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Owns one instrument's aggregator and pipeline and wires the full
/// stage chain on start.
pub struct InstrumentWorker {
    instrument: Instrument,
    quantity: u32,
    settings: WorkerSettings,
    source: Arc<dyn HistoricalSource>,
    aggregator: CandleAggregator,
    pipeline: IndicatorPipeline,
}

impl InstrumentWorker {
    /// Build a worker with the standard indicator set (fast EMA, slow
    /// EMA, VWAP).
    pub fn new(
        instrument: Instrument,
        quantity: u32,
        settings: WorkerSettings,
        source: Arc<dyn HistoricalSource>,
    ) -> Self {
        let mut pipeline = IndicatorPipeline::new();
        pipeline.add(
            format!("EMA{}", settings.ema_fast),
            Box::new(Ema::new(settings.ema_fast)),
        );
        pipeline.add(
            format!("EMA{}", settings.ema_slow),
            Box::new(Ema::new(settings.ema_slow)),
        );
        pipeline.add("VWAP", Box::new(Vwap::new()));

        let aggregator = CandleAggregator::new(settings.aggregation_span);
        Self {
            instrument,
            quantity,
            settings,
            source,
            aggregator,
            pipeline,
        }
    }

    /// Warm-start from history: seed indicators from the previous
    /// session's aggregated candles, then replay today's intraday
    /// candles through the pipeline.
    pub async fn initialize(&mut self) -> TradingResult<()> {
        let today = Utc::now().date_naive();

        let mut history = self
            .source
            .historical_candles(&self.instrument, today)
            .await?;
        if history.len() > self.settings.session_minutes {
            let keep_from = history.len() - self.settings.session_minutes;
            history = history.split_off(keep_from);
        }
        self.aggregator.backfill(history);

        let failures = self.pipeline.initialize(self.aggregator.completed());
        if !failures.is_empty() {
            warn!(
                instrument = %self.instrument,
                failed = failures.len(),
                "indicator seeding failures during warm-start"
            );
        }
        info!(
            instrument = %self.instrument,
            session_candles = self.aggregator.completed().len(),
            "seeded indicators from previous session"
        );

        let seeded = self.aggregator.completed().len();
        let intraday = self.source.intraday_candles(&self.instrument).await?;
        self.aggregator.backfill(intraday);

        let replay: Vec<Candle> = self.aggregator.completed()[seeded..].to_vec();
        for candle in &replay {
            let failures = self.pipeline.update_all(candle);
            if !failures.is_empty() {
                warn!(
                    instrument = %self.instrument,
                    timestamp = %candle.timestamp,
                    failed = failures.len(),
                    "indicator update failures during intraday replay"
                );
            }
        }
        info!(
            instrument = %self.instrument,
            replayed = replay.len(),
            "intraday candles replayed"
        );
        Ok(())
    }

    /// Spawn the stage tasks and hand back the supervisor handle.
    ///
    /// The initial indicator snapshot (when warm-start made the pipeline
    /// ready) is published immediately so the signal engine can act
    /// before the first live candle closes.
    pub fn start(
        self,
        policy: Arc<dyn SignalPolicy>,
        gateway: Arc<OrderGateway>,
        orders: Arc<dyn OrderApi>,
        controller_settings: ControllerSettings,
    ) -> WorkerHandle {
        let capacity = self.settings.channel_capacity;
        let (candle_tx, candle_rx) = mpsc::channel(capacity);
        let (tick_tx, tick_rx) = mpsc::channel(capacity);
        let (snapshot_tx, snapshot_rx) = mpsc::channel(capacity);
        let (engine_tick_tx, engine_tick_rx) = mpsc::channel(capacity);
        let (levels_tx, levels_rx) = mpsc::channel(capacity);
        let (signal_tx, signal_rx) = mpsc::channel(capacity);

        if self.pipeline.is_ready() {
            if let Some(last) = self.aggregator.completed().last() {
                let _ = snapshot_tx.try_send(self.pipeline.snapshot(last.timestamp));
            }
        }

        let engine = SignalEngine::new(
            self.instrument.clone(),
            policy,
            snapshot_rx,
            engine_tick_rx,
            levels_rx,
            signal_tx,
        )
        .with_ladder(
            LevelLadder::new(self.settings.ladder_step_pct),
            self.settings.ladder_levels,
        );
        let controller = PositionController::new(
            self.instrument.clone(),
            self.quantity,
            gateway,
            orders,
            controller_settings,
        );

        let instrument = self.instrument.clone();
        let tasks = vec![
            tokio::spawn(pump(
                self.instrument.clone(),
                self.aggregator,
                self.pipeline,
                candle_rx,
                tick_rx,
                snapshot_tx,
                engine_tick_tx,
            )),
            tokio::spawn(engine.run()),
            tokio::spawn(controller.run(signal_rx)),
        ];

        WorkerHandle {
            instrument,
            levels_tx,
            channels: Some(InstrumentChannels {
                candles: candle_tx,
                ticks: tick_tx,
            }),
            tasks,
        }
    }
}

/// Single consumer of the feed channels: aggregates candles, updates the
/// pipeline on interval close, forwards ticks to the signal engine and
/// logs real-time estimates in between.
async fn pump(
    instrument: Instrument,
    mut aggregator: CandleAggregator,
    mut pipeline: IndicatorPipeline,
    mut candle_rx: mpsc::Receiver<Candle>,
    mut tick_rx: mpsc::Receiver<Tick>,
    snapshot_tx: mpsc::Sender<IndicatorSnapshot>,
    engine_tick_tx: mpsc::Sender<Tick>,
) {
    loop {
        tokio::select! {
            maybe_candle = candle_rx.recv() => {
                let Some(candle) = maybe_candle else { break };
                match aggregator.ingest(candle) {
                    Some(merged) => {
                        let failures = pipeline.update_all(&merged);
                        if !failures.is_empty() {
                            warn!(
                                instrument = %instrument,
                                failed = failures.len(),
                                "indicator update failures"
                            );
                        }
                        if pipeline.is_ready() {
                            let snapshot = pipeline.snapshot(merged.timestamp);
                            if snapshot_tx.send(snapshot).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => {
                        pipeline.estimate_all(EstimateInput::PartialCandle(&candle));
                    }
                }
            }
            maybe_tick = tick_rx.recv() => {
                let Some(tick) = maybe_tick else { break };
                pipeline.estimate_all(EstimateInput::Tick(&tick));
                if engine_tick_tx.send(tick).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!(instrument = %instrument, "pump stopped");
}
