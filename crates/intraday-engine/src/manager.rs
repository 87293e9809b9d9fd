//! Supervision of the shared feed connection and instrument workers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use intraday_core::{
    HistoricalSource, Instrument, MarketFeed, MarketStatus, OrderApi, SignalPolicy, TradingResult,
};
use intraday_execution::{ControllerSettings, OrderGateway};

use crate::worker::{InstrumentWorker, WorkerHandle, WorkerSettings};

/// Owns the shared live feed and order gateway and the set of
/// instrument workers subscribed to them.
///
/// `add_instrument` and `remove_instrument` are idempotent: adding an
/// instrument twice is a no-op on the second call, as is removing an
/// absent one.
pub struct FeedManager {
    feed: Arc<dyn MarketFeed>,
    source: Arc<dyn HistoricalSource>,
    gateway: Arc<OrderGateway>,
    orders: Arc<dyn OrderApi>,
    policy: Arc<dyn SignalPolicy>,
    worker_settings: WorkerSettings,
    controller_settings: ControllerSettings,
    workers: HashMap<String, WorkerHandle>,
}

impl FeedManager {
    /// Wire a manager over the shared collaborators.
    pub fn new(
        feed: Arc<dyn MarketFeed>,
        source: Arc<dyn HistoricalSource>,
        gateway: Arc<OrderGateway>,
        orders: Arc<dyn OrderApi>,
        policy: Arc<dyn SignalPolicy>,
        worker_settings: WorkerSettings,
        controller_settings: ControllerSettings,
    ) -> Self {
        Self {
            feed,
            source,
            gateway,
            orders,
            policy,
            worker_settings,
            controller_settings,
            workers: HashMap::new(),
        }
    }

    /// Start monitoring an instrument: warm-start its worker, spawn its
    /// tasks and subscribe it to the live feed when the market is open.
    pub async fn add_instrument(
        &mut self,
        instrument: Instrument,
        quantity: u32,
    ) -> TradingResult<()> {
        if self.workers.contains_key(&instrument.isin) {
            info!(instrument = %instrument, "already monitored; add is a no-op");
            return Ok(());
        }

        let mut worker = InstrumentWorker::new(
            instrument.clone(),
            quantity,
            self.worker_settings.clone(),
            self.source.clone(),
        );
        worker.initialize().await?;

        let mut handle = worker.start(
            self.policy.clone(),
            self.gateway.clone(),
            self.orders.clone(),
            self.controller_settings.clone(),
        );

        if self.feed.market_status().await == MarketStatus::Open {
            let channels = handle
                .channels
                .take()
                .expect("freshly started worker has channels");
            self.feed.subscribe(&instrument, channels).await?;
        } else {
            warn!(
                instrument = %instrument,
                "market closed; worker idle until next session"
            );
        }

        info!(instrument = %instrument, quantity, "instrument worker started");
        self.workers.insert(instrument.isin.clone(), handle);
        Ok(())
    }

    /// Stop monitoring an instrument and drop all its state.
    pub async fn remove_instrument(&mut self, isin: &str) -> TradingResult<()> {
        let Some(handle) = self.workers.remove(isin) else {
            debug!(isin, "not monitored; remove is a no-op");
            return Ok(());
        };

        self.feed.unsubscribe(&handle.instrument).await?;
        handle.abort();
        info!(instrument = %handle.instrument, "instrument worker stopped");
        Ok(())
    }

    /// ISINs currently monitored, sorted for deterministic output.
    pub fn list_instruments(&self) -> Vec<String> {
        let mut isins: Vec<String> = self.workers.keys().cloned().collect();
        isins.sort();
        isins
    }
}
