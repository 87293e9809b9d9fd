//! Live trading command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use intraday_config::AppConfig;
use intraday_core::{HoldPolicy, Instrument, MarketFeed, OrderApi};
use intraday_data::{FeedSettings, UpstoxFeed, UpstoxMarketData};
use intraday_engine::{FeedManager, WorkerSettings};
use intraday_execution::{ControllerSettings, OrderEndpoints, OrderGateway, UpstoxOrderClient};

use crate::cli::LiveArgs;

pub async fn run(args: LiveArgs, config: AppConfig) -> Result<()> {
    if args.instruments.is_empty() {
        bail!("no instruments given; pass --instruments ISIN:QUANTITY");
    }

    let access_token = std::env::var(&config.broker.access_token_env)
        .map_err(|_| {
            anyhow!(
                "{} not set; export the brokerage access token first",
                config.broker.access_token_env
            )
        })?
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string();

    let source = Arc::new(UpstoxMarketData::new(&config.broker.api_base));
    let orders: Arc<dyn OrderApi> = Arc::new(UpstoxOrderClient::new(
        &access_token,
        OrderEndpoints::new(&config.broker.api_base, &config.broker.hft_base),
    )?);
    let gateway = Arc::new(OrderGateway::new(
        orders.clone(),
        Duration::from_millis(config.gateway.min_submit_delay_ms),
    ));
    let feed = Arc::new(UpstoxFeed::new(
        &access_token,
        FeedSettings::new(
            &config.broker.api_base,
            Duration::from_secs(config.feed.reconnect_delay_secs),
        ),
    )?);

    let worker_settings = WorkerSettings {
        aggregation_span: config.trading.aggregation_span,
        session_minutes: config.trading.session_minutes,
        ema_fast: config.trading.ema_fast,
        ema_slow: config.trading.ema_slow,
        ladder_step_pct: config.trading.ladder_step_pct,
        ladder_levels: config.trading.ladder_levels,
        ..WorkerSettings::default()
    };
    let controller_settings = ControllerSettings {
        poll_interval: Duration::from_millis(config.trading.poll_interval_ms),
        poll_limit: config.trading.poll_limit,
        price_tick: config.trading.price_tick,
    };

    // The decision function is an external collaborator; until a real
    // strategy is wired in, every tick evaluates to WAIT.
    let mut manager = FeedManager::new(
        feed.clone() as Arc<dyn MarketFeed>,
        source,
        gateway,
        orders,
        Arc::new(HoldPolicy),
        worker_settings,
        controller_settings,
    );

    let feed_task = tokio::spawn({
        let feed = feed.clone();
        async move { feed.run().await }
    });

    for spec in &args.instruments {
        let (instrument, quantity) = parse_spec(spec, config.trading.default_quantity)?;
        manager.add_instrument(instrument, quantity).await?;
    }
    info!(
        instruments = ?manager.list_instruments(),
        "engine running; ctrl-c to stop"
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
            for isin in manager.list_instruments() {
                manager.remove_instrument(&isin).await?;
            }
        }
        result = feed_task => {
            match result.context("feed task panicked")? {
                Ok(()) => info!("live feed finished; market closed"),
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

fn parse_spec(spec: &str, default_quantity: u32) -> Result<(Instrument, u32)> {
    let (isin, quantity) = match spec.split_once(':') {
        Some((isin, quantity)) => (
            isin,
            quantity
                .parse::<u32>()
                .with_context(|| format!("bad quantity in {spec:?}"))?,
        ),
        None => (spec, default_quantity),
    };

    let instrument = isin
        .parse::<Instrument>()
        .map_err(|e| anyhow!("bad instrument {spec:?}: {e}"))?;
    Ok((instrument, quantity))
}
