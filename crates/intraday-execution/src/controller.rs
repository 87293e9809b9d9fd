//! Signal-driven position controller.
//!
//! Translates BUY/SELL trade signals into an entry order plus tiered
//! profit-taking orders, tracks fills, and sweeps the position on exit.
//! Only long intraday trades: BUY first, SELL later.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use intraday_core::error::{OrderError, SignalError};
use intraday_core::{
    Instrument, OrderApi, OrderDetails, OrderRef, OrderRequest, OrderStatus, Position, Side,
    SignalKind, TradeSignal, TradingResult,
};

use crate::gateway::OrderGateway;

/// Tier ratios for profit booking: 50% / 10% / 15% / remainder.
const TIER_RATIOS: [f64; 3] = [0.50, 0.10, 0.15];
const TIER_LABELS: [&str; 4] = ["T1", "T2", "T3", "T4"];

/// Split a quantity across the four profit tiers.
///
/// The first three tiers round their ratio share; the last absorbs the
/// remainder so the four always sum exactly to the input.
pub fn tier_quantities(quantity: u32) -> [u32; 4] {
    let t1 = (quantity as f64 * TIER_RATIOS[0]).round() as u32;
    let t2 = (quantity as f64 * TIER_RATIOS[1]).round() as u32;
    let t3 = (quantity as f64 * TIER_RATIOS[2]).round() as u32;
    let t4 = quantity - (t1 + t2 + t3);
    [t1, t2, t3, t4]
}

/// Tunables for order polling and price rounding.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Delay between order status polls
    pub poll_interval: Duration,
    /// Maximum status polls before giving up on an order
    pub poll_limit: usize,
    /// Exchange price tick; limit prices are rounded to a multiple of it
    pub price_tick: Decimal,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            poll_limit: 1000,
            price_tick: dec!(0.05),
        }
    }
}

/// Per-instrument order state machine.
///
/// Signals are handled strictly one at a time in arrival order; a new
/// signal is not started while a BUY/SELL routine is in flight.
pub struct PositionController {
    instrument: Instrument,
    default_quantity: u32,
    gateway: Arc<OrderGateway>,
    orders: Arc<dyn OrderApi>,
    settings: ControllerSettings,
    position: Position,
}

impl PositionController {
    /// Create a controller with an empty position.
    pub fn new(
        instrument: Instrument,
        default_quantity: u32,
        gateway: Arc<OrderGateway>,
        orders: Arc<dyn OrderApi>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            instrument,
            default_quantity,
            gateway,
            orders,
            settings,
            position: Position::new(),
        }
    }

    /// Drain the signal queue until the producer goes away.
    pub async fn run(mut self, mut signal_rx: mpsc::Receiver<TradeSignal>) {
        info!(instrument = %self.instrument, "signal monitoring started");
        while let Some(signal) = signal_rx.recv().await {
            match signal.kind {
                SignalKind::Buy => {
                    if let Err(e) = self.handle_buy(&signal).await {
                        warn!(
                            instrument = %self.instrument,
                            error = %e,
                            "BUY signal handling aborted"
                        );
                    }
                }
                SignalKind::Sell => {
                    if let Err(e) = self.handle_sell().await {
                        warn!(
                            instrument = %self.instrument,
                            error = %e,
                            "SELL signal handling aborted"
                        );
                    }
                    if self.position.current_quantity != 0 {
                        warn!(
                            instrument = %self.instrument,
                            shares = self.position.current_quantity,
                            "shares left unresolved after exit; close the position manually"
                        );
                    }
                }
                SignalKind::Wait | SignalKind::Hold => {}
            }
        }
        info!(instrument = %self.instrument, "signal monitoring stopped");
    }

    /// Place the entry order, wait for it to resolve, then ladder the
    /// tiered profit-taking sells.
    async fn handle_buy(&mut self, signal: &TradeSignal) -> TradingResult<()> {
        let today = Utc::now().date_naive();
        let signal_date = signal.timestamp.date_naive();
        if signal_date != today {
            // Stale/backtest signals must never place live intraday orders.
            return Err(SignalError::StaleSignal { signal_date, today }.into());
        }

        let quantity = self.default_quantity;
        let buy_tag = format!("BUY-{}-{}", self.instrument.isin, quantity);
        let order_id = self
            .gateway
            .submit(OrderRequest::market(
                self.instrument.clone(),
                Side::Buy,
                quantity,
                buy_tag.clone(),
            ))
            .await?;
        info!(
            instrument = %self.instrument,
            order_id = %order_id,
            tag = %buy_tag,
            quantity,
            "BUY order placed"
        );

        let details = self.poll_terminal(&order_id).await?;
        match details.status {
            OrderStatus::Complete => {
                self.position.current_quantity += details.filled_quantity as i64;
                self.position.executed.push(OrderRef::new(&order_id, &buy_tag));
                info!(
                    instrument = %self.instrument,
                    order_id = %order_id,
                    filled = details.filled_quantity,
                    symbol = details.trading_symbol.as_deref().unwrap_or(""),
                    "BUY order filled"
                );
            }
            _ => {
                warn!(
                    instrument = %self.instrument,
                    order_id = %order_id,
                    status = %details.status,
                    message = details.status_message.as_deref().unwrap_or(""),
                    "BUY order did not fill; no profit orders placed"
                );
                return Ok(());
            }
        }

        self.place_profit_tiers(signal, quantity).await
    }

    /// Derive up to four tiered LIMIT SELL orders from the signal's
    /// positive levels.
    async fn place_profit_tiers(&mut self, signal: &TradeSignal, quantity: u32) -> TradingResult<()> {
        let positive = signal.profit_levels();
        if positive.is_empty() || positive.len() >= 5 {
            debug!(
                instrument = %self.instrument,
                levels = positive.len(),
                "no tiered profit orders derived"
            );
            return Ok(());
        }

        let quantities = tier_quantities(quantity);
        for ((tier_qty, label), level) in quantities.into_iter().zip(TIER_LABELS).zip(positive) {
            if tier_qty == 0 {
                warn!(instrument = %self.instrument, tier = label, "tier rounded to zero shares; skipped");
                continue;
            }

            let limit_price = round_to_tick(level.price, self.settings.price_tick);
            let tag = format!("{}-SELL-{}-{}", label, self.instrument.isin, tier_qty);
            let order_id = self
                .gateway
                .submit(OrderRequest::limit(
                    self.instrument.clone(),
                    Side::Sell,
                    tier_qty,
                    limit_price,
                    tag.clone(),
                ))
                .await?;

            info!(
                instrument = %self.instrument,
                order_id = %order_id,
                tag = %tag,
                quantity = tier_qty,
                price = %limit_price,
                level = level.level,
                "tiered LIMIT SELL placed"
            );
            self.position.pending.push(OrderRef::new(order_id, tag));
        }
        Ok(())
    }

    /// Sweep every pending order, then market-sell whatever is still
    /// unfilled.
    async fn handle_sell(&mut self) -> TradingResult<()> {
        if self.position.current_quantity <= 0 {
            warn!(instrument = %self.instrument, "no position to exit");
            return Ok(());
        }

        let pending = std::mem::take(&mut self.position.pending);
        let mut total_filled: u32 = 0;
        let mut total_pending: u32 = 0;

        for order_ref in &pending {
            match self.orders.status(&order_ref.order_id).await {
                Ok(details) => {
                    if details.is_filled() {
                        total_filled += details.filled_quantity;
                        self.position.executed.push(order_ref.clone());
                        info!(
                            instrument = %self.instrument,
                            tag = %order_ref.tag,
                            quantity = details.filled_quantity,
                            price = %details.price.unwrap_or_default(),
                            "profit booked"
                        );
                    }

                    if details.status == OrderStatus::Open || details.pending_quantity != 0 {
                        total_pending += details.pending_quantity;
                        match self.orders.cancel(&order_ref.order_id).await {
                            Ok(()) => info!(
                                instrument = %self.instrument,
                                tag = %order_ref.tag,
                                pending = details.pending_quantity,
                                "open profit order cancelled"
                            ),
                            Err(e) => warn!(
                                instrument = %self.instrument,
                                tag = %order_ref.tag,
                                error = %e,
                                "failed to cancel open profit order"
                            ),
                        }
                    }

                    if details.status == OrderStatus::Rejected {
                        info!(
                            instrument = %self.instrument,
                            tag = %order_ref.tag,
                            message = details.status_message.as_deref().unwrap_or(""),
                            "profit order had been rejected"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        instrument = %self.instrument,
                        order_id = %order_ref.order_id,
                        tag = %order_ref.tag,
                        error = %e,
                        "failed to fetch order during exit sweep"
                    );
                }
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        self.position.current_quantity -= total_filled as i64;

        if total_pending == 0 {
            info!(
                instrument = %self.instrument,
                "all profit orders executed; nothing left to sell"
            );
            return Ok(());
        }

        let sweep_tag = format!("SELL-SWEEP-{}", self.instrument.isin);
        let order_id = self
            .gateway
            .submit(OrderRequest::market(
                self.instrument.clone(),
                Side::Sell,
                total_pending,
                sweep_tag.clone(),
            ))
            .await?;
        info!(
            instrument = %self.instrument,
            order_id = %order_id,
            tag = %sweep_tag,
            quantity = total_pending,
            "consolidated MARKET SELL placed for remaining shares"
        );

        let details = self.poll_terminal(&order_id).await?;
        match details.status {
            OrderStatus::Complete => {
                self.position.current_quantity = 0;
                self.position.executed.push(OrderRef::new(&order_id, &sweep_tag));
                info!(
                    instrument = %self.instrument,
                    order_id = %order_id,
                    sold = details.filled_quantity,
                    "exit sweep filled"
                );
            }
            _ => {
                warn!(
                    instrument = %self.instrument,
                    order_id = %order_id,
                    status = %details.status,
                    message = details.status_message.as_deref().unwrap_or(""),
                    "exit sweep did not fill"
                );
            }
        }

        info!(
            instrument = %self.instrument,
            executed = self.position.executed.len(),
            "exit sweep finished"
        );
        Ok(())
    }

    /// Re-fetch order status until it resolves; never trusts a status
    /// cached across a sleep.
    async fn poll_terminal(&self, order_id: &str) -> Result<OrderDetails, OrderError> {
        for _ in 0..self.settings.poll_limit {
            match self.orders.status(order_id).await {
                Ok(details) => {
                    if details.is_filled()
                        || matches!(details.status, OrderStatus::Rejected | OrderStatus::Cancelled)
                    {
                        return Ok(details);
                    }
                    debug!(
                        order_id = %order_id,
                        status = %details.status,
                        pending = details.pending_quantity,
                        "order not terminal yet"
                    );
                }
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "status fetch failed; retrying");
                }
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        Err(OrderError::PollTimeout {
            order_id: order_id.to_string(),
            attempts: self.settings.poll_limit,
        })
    }
}

fn round_to_tick(price: f64, tick: Decimal) -> Decimal {
    let price = Decimal::from_f64_retain(price).unwrap_or_default();
    if tick.is_zero() {
        return price;
    }
    (price / tick).round() * tick
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use intraday_core::error::TradingError;
    use intraday_core::{OrderPayload, OrderType, TargetLevel};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted brokerage: orders resolve according to a per-tag script.
    struct ScriptedApi {
        state: Mutex<ScriptState>,
    }

    #[derive(Default)]
    struct ScriptState {
        placed: Vec<OrderPayload>,
        cancelled: Vec<String>,
        // tag -> (status, filled, pending)
        outcomes: HashMap<String, (OrderStatus, u32, u32)>,
        // order id -> tag
        tags: HashMap<String, String>,
        next_id: usize,
    }

    impl ScriptedApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(ScriptState::default()),
            })
        }

        fn script(&self, tag: &str, status: OrderStatus, filled: u32, pending: u32) {
            self.state
                .lock()
                .unwrap()
                .outcomes
                .insert(tag.to_string(), (status, filled, pending));
        }

        fn placed(&self) -> Vec<OrderPayload> {
            self.state.lock().unwrap().placed.clone()
        }

        fn cancelled(&self) -> Vec<String> {
            self.state.lock().unwrap().cancelled.clone()
        }
    }

    #[async_trait]
    impl OrderApi for ScriptedApi {
        async fn place(&self, payload: &OrderPayload) -> Result<String, OrderError> {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let order_id = format!("ORD-{}", state.next_id);
            state.tags.insert(order_id.clone(), payload.tag.clone());
            state.placed.push(payload.clone());
            Ok(order_id)
        }

        async fn status(&self, order_id: &str) -> Result<OrderDetails, OrderError> {
            let state = self.state.lock().unwrap();
            let tag = state
                .tags
                .get(order_id)
                .ok_or_else(|| OrderError::Api(format!("unknown order {order_id}")))?;
            let (status, filled, pending) = *state
                .outcomes
                .get(tag)
                .unwrap_or(&(OrderStatus::Complete, 0, 0));

            Ok(OrderDetails {
                order_id: order_id.to_string(),
                status,
                filled_quantity: filled,
                pending_quantity: pending,
                price: None,
                trading_symbol: Some("TEST".to_string()),
                tag: Some(tag.clone()),
                status_message: None,
            })
        }

        async fn cancel(&self, order_id: &str) -> Result<(), OrderError> {
            self.state
                .lock()
                .unwrap()
                .cancelled
                .push(order_id.to_string());
            Ok(())
        }
    }

    fn instrument() -> Instrument {
        Instrument::nse_eq("INE121J01017")
    }

    fn controller(api: Arc<ScriptedApi>, quantity: u32) -> PositionController {
        let gateway = Arc::new(OrderGateway::new(api.clone(), Duration::from_millis(1)));
        PositionController::new(
            instrument(),
            quantity,
            gateway,
            api,
            ControllerSettings {
                poll_interval: Duration::from_millis(1),
                poll_limit: 10,
                price_tick: dec!(0.05),
            },
        )
    }

    fn buy_signal(now: DateTime<Utc>, levels: usize) -> TradeSignal {
        TradeSignal {
            kind: SignalKind::Buy,
            price: 100.0,
            timestamp: now,
            levels: (1..=levels as i32)
                .map(|n| TargetLevel {
                    level: n,
                    price: 100.0 * (1.0 + n as f64 / 100.0),
                    timestamp: now,
                })
                .collect(),
        }
    }

    #[test]
    fn test_tier_quantities_sum_exactly() {
        assert_eq!(tier_quantities(20), [10, 2, 3, 5]);
        for quantity in [1u32, 7, 13, 20, 100, 333] {
            let tiers = tier_quantities(quantity);
            assert_eq!(tiers.iter().sum::<u32>(), quantity, "for {quantity}");
        }
    }

    #[test]
    fn test_round_to_tick() {
        assert_eq!(round_to_tick(101.02, dec!(0.05)), dec!(101.00));
        assert_eq!(round_to_tick(101.03, dec!(0.05)), dec!(101.05));
        assert_eq!(round_to_tick(101.05, dec!(0.05)), dec!(101.05));
    }

    #[tokio::test(start_paused = true)]
    async fn test_buy_fill_places_four_tier_sells() {
        let api = ScriptedApi::new();
        api.script("BUY-INE121J01017-20", OrderStatus::Complete, 20, 0);
        let mut controller = controller(api.clone(), 20);

        controller.handle_buy(&buy_signal(Utc::now(), 4)).await.unwrap();

        let placed = api.placed();
        assert_eq!(placed.len(), 5);
        assert_eq!(placed[0].transaction_type, Side::Buy);
        assert_eq!(placed[0].order_type, OrderType::Market);

        let tier_quantities: Vec<u32> = placed[1..].iter().map(|p| p.quantity).collect();
        assert_eq!(tier_quantities, vec![10, 2, 3, 5]);
        for payload in &placed[1..] {
            assert_eq!(payload.transaction_type, Side::Sell);
            assert_eq!(payload.order_type, OrderType::Limit);
        }
        // Limit prices land on the exchange tick
        assert_eq!(placed[1].price, dec!(101.00));
        assert_eq!(placed[2].price, dec!(102.00));

        assert_eq!(controller.position.current_quantity, 20);
        assert_eq!(controller.position.pending.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_buy_places_no_tiers() {
        let api = ScriptedApi::new();
        api.script("BUY-INE121J01017-20", OrderStatus::Rejected, 0, 0);
        let mut controller = controller(api.clone(), 20);

        controller.handle_buy(&buy_signal(Utc::now(), 4)).await.unwrap();

        assert_eq!(api.placed().len(), 1);
        assert_eq!(controller.position.current_quantity, 0);
        assert!(controller.position.pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_buy_signal_has_no_side_effects() {
        let api = ScriptedApi::new();
        let mut controller = controller(api.clone(), 20);

        let yesterday = Utc::now() - chrono::Duration::days(1);
        let result = controller.handle_buy(&buy_signal(yesterday, 4)).await;

        assert!(matches!(
            result,
            Err(TradingError::Signal(SignalError::StaleSignal { .. }))
        ));
        assert!(api.placed().is_empty());
        assert_eq!(controller.position.current_quantity, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sell_with_all_tiers_filled_skips_sweep() {
        let api = ScriptedApi::new();
        api.script("BUY-INE121J01017-20", OrderStatus::Complete, 20, 0);
        api.script("T1-SELL-INE121J01017-10", OrderStatus::Complete, 10, 0);
        api.script("T2-SELL-INE121J01017-2", OrderStatus::Complete, 2, 0);
        api.script("T3-SELL-INE121J01017-3", OrderStatus::Complete, 3, 0);
        api.script("T4-SELL-INE121J01017-5", OrderStatus::Complete, 5, 0);
        let mut controller = controller(api.clone(), 20);

        controller.handle_buy(&buy_signal(Utc::now(), 4)).await.unwrap();
        controller.handle_sell().await.unwrap();

        assert_eq!(controller.position.current_quantity, 0);
        assert!(api.cancelled().is_empty());
        // BUY + 4 tiers, no consolidated sweep
        assert_eq!(api.placed().len(), 5);
        assert!(controller.position.pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sell_with_open_tiers_cancels_and_sweeps() {
        let api = ScriptedApi::new();
        api.script("BUY-INE121J01017-20", OrderStatus::Complete, 20, 0);
        api.script("T1-SELL-INE121J01017-10", OrderStatus::Complete, 10, 0);
        api.script("T2-SELL-INE121J01017-2", OrderStatus::Complete, 2, 0);
        api.script("T3-SELL-INE121J01017-3", OrderStatus::Open, 0, 3);
        api.script("T4-SELL-INE121J01017-5", OrderStatus::Open, 0, 5);
        api.script("SELL-SWEEP-INE121J01017", OrderStatus::Complete, 8, 0);
        let mut controller = controller(api.clone(), 20);

        controller.handle_buy(&buy_signal(Utc::now(), 4)).await.unwrap();
        controller.handle_sell().await.unwrap();

        // Both open tiers cancelled
        assert_eq!(api.cancelled().len(), 2);

        // One consolidated MARKET SELL for the combined pending quantity
        let placed = api.placed();
        let sweep = placed.last().unwrap();
        assert_eq!(sweep.tag, "SELL-SWEEP-INE121J01017");
        assert_eq!(sweep.quantity, 8);
        assert_eq!(sweep.order_type, OrderType::Market);
        assert_eq!(sweep.transaction_type, Side::Sell);

        assert_eq!(controller.position.current_quantity, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sell_without_position_is_a_noop() {
        let api = ScriptedApi::new();
        let mut controller = controller(api.clone(), 20);

        controller.handle_sell().await.unwrap();
        assert!(api.placed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeout_surfaces() {
        let api = ScriptedApi::new();
        // Order never leaves pending
        api.script("BUY-INE121J01017-20", OrderStatus::Pending, 0, 20);
        let mut controller = controller(api.clone(), 20);

        let result = controller.handle_buy(&buy_signal(Utc::now(), 4)).await;
        assert!(matches!(
            result,
            Err(TradingError::Order(OrderError::PollTimeout { .. }))
        ));
    }
}
