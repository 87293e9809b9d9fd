//! Live market-data feed over WebSocket.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use reqwest::header;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use intraday_core::error::FeedError;
use intraday_core::{Candle, Instrument, InstrumentChannels, MarketFeed, MarketStatus, Tick};

/// Segment whose status decides whether the market is open.
const STATUS_SEGMENT: &str = "NSE_EQ";
/// Base-candle interval tag in feed frames.
const BASE_INTERVAL: &str = "I1";

/// Live feed connection settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// REST endpoint that hands out the authorized WebSocket URI
    pub authorize_url: String,
    /// Delay before reconnecting after a transport error
    pub reconnect_delay: Duration,
}

impl FeedSettings {
    /// Settings against the given API host.
    pub fn new(api_base: &str, reconnect_delay: Duration) -> Self {
        Self {
            authorize_url: format!("{api_base}/v3/feed/market-data-feed/authorize"),
            reconnect_delay,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizeData {
    authorized_redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct AuthorizeEnvelope {
    status: String,
    data: Option<AuthorizeData>,
}

#[derive(Debug, Deserialize)]
struct FeedFrame {
    #[serde(rename = "marketInfo")]
    market_info: Option<MarketInfo>,
    #[serde(default)]
    feeds: HashMap<String, InstrumentFeed>,
}

#[derive(Debug, Deserialize)]
struct MarketInfo {
    #[serde(rename = "segmentStatus")]
    segment_status: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct InstrumentFeed {
    #[serde(rename = "fullFeed")]
    full_feed: Option<FullFeed>,
}

#[derive(Debug, Deserialize)]
struct FullFeed {
    #[serde(rename = "marketFF")]
    market_ff: Option<MarketFull>,
}

#[derive(Debug, Deserialize)]
struct MarketFull {
    ltpc: Option<WireLtpc>,
    #[serde(rename = "marketOHLC")]
    market_ohlc: Option<WireOhlcList>,
}

#[derive(Debug, Deserialize)]
struct WireLtpc {
    ltp: f64,
    /// Epoch milliseconds
    ltt: i64,
    ltq: u64,
    cp: f64,
}

#[derive(Debug, Deserialize)]
struct WireOhlcList {
    ohlc: Vec<WireOhlc>,
}

#[derive(Debug, Deserialize)]
struct WireOhlc {
    interval: String,
    /// Epoch milliseconds, bucket open
    ts: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(rename = "vol")]
    volume: u64,
}

/// Delivery state for one subscribed instrument.
struct Delivery {
    channels: InstrumentChannels,
    last_tick_at: Option<DateTime<Utc>>,
    last_candle_at: Option<DateTime<Utc>>,
}

/// The shared live-data connection.
///
/// One `run` task owns the socket: it authorizes, connects, derives the
/// market status from the first frame, and then fans decoded updates out
/// to per-instrument channels. Transport errors reconnect with a fixed
/// delay and re-subscribe everything; any other error stops the feed and
/// surfaces the failure. Updates whose timestamp is not strictly greater
/// than the last seen for that instrument are dropped.
pub struct UpstoxFeed {
    http: reqwest::Client,
    settings: FeedSettings,
    state: Mutex<HashMap<String, Delivery>>,
    status: RwLock<MarketStatus>,
    cmd_tx: mpsc::UnboundedSender<String>,
    cmd_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl UpstoxFeed {
    /// Create a feed client authorized by the given bearer token.
    pub fn new(access_token: &str, settings: FeedSettings) -> Result<Self, FeedError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {access_token}"))
                .map_err(|e| FeedError::Protocol(e.to_string()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        Ok(Self {
            http,
            settings,
            state: Mutex::new(HashMap::new()),
            status: RwLock::new(MarketStatus::Closed),
            cmd_tx,
            cmd_rx: std::sync::Mutex::new(Some(cmd_rx)),
        })
    }

    /// Drive the connection until the market closes, the feed is dropped
    /// by all users, or a fatal error occurs.
    pub async fn run(&self) -> Result<(), FeedError> {
        let mut cmd_rx = self
            .cmd_rx
            .lock()
            .expect("cmd receiver lock")
            .take()
            .ok_or_else(|| FeedError::Protocol("feed is already running".to_string()))?;

        let uri = self.authorize().await?;
        let mut attempt: u32 = 0;

        loop {
            let ws = match tokio_tungstenite::connect_async(uri.as_str()).await {
                Ok((ws, _)) => ws,
                Err(e) if is_transport_error(&e) => {
                    warn!(error = %e, "feed connect failed; reconnecting");
                    tokio::time::sleep(self.settings.reconnect_delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(FeedError::Protocol(e.to_string())),
            };
            info!("live feed connection established");
            let (mut sink, mut stream) = ws.split();

            // Market status comes from the first frame after connect.
            let first = match next_frame(&mut stream).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!("feed closed before the first message; reconnecting");
                    tokio::time::sleep(self.settings.reconnect_delay).await;
                    attempt += 1;
                    continue;
                }
                Err(FeedError::Transport(e)) => {
                    warn!(error = %e, "feed transport error on first message; reconnecting");
                    tokio::time::sleep(self.settings.reconnect_delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(info) = &first.market_info {
                let open = info
                    .segment_status
                    .get(STATUS_SEGMENT)
                    .is_some_and(|s| s == "NORMAL_OPEN");
                *self.status.write().await = if open {
                    MarketStatus::Open
                } else {
                    MarketStatus::Closed
                };
            }

            if *self.status.read().await == MarketStatus::Closed {
                info!("market is closed; live feed not available");
                return Ok(());
            }
            self.dispatch(first).await;

            // Re-subscribe everything after a reconnect.
            if attempt > 0 {
                let tokens: Vec<String> = self.state.lock().await.keys().cloned().collect();
                if !tokens.is_empty() {
                    let frame = subscription_frame("re-subscription", &tokens);
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        warn!(error = %e, "re-subscription failed; reconnecting");
                        tokio::time::sleep(self.settings.reconnect_delay).await;
                        attempt += 1;
                        continue;
                    }
                    info!(instruments = tokens.len(), "re-subscribed after reconnect");
                }
            }

            info!("market is open; processing live data");
            let reconnect = loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(frame) => {
                                if let Err(e) = sink.send(Message::Text(frame)).await {
                                    warn!(error = %e, "subscription frame send failed");
                                    break true;
                                }
                            }
                            // All feed handles dropped; shut down cleanly.
                            None => return Ok(()),
                        }
                    }
                    frame = next_frame(&mut stream) => {
                        match frame {
                            Ok(Some(frame)) => self.dispatch(frame).await,
                            Ok(None) => break true,
                            Err(FeedError::Transport(e)) => {
                                warn!(error = %e, "feed transport error");
                                break true;
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
            };

            if reconnect {
                warn!(
                    delay_secs = self.settings.reconnect_delay.as_secs(),
                    "feed connection lost; reconnecting"
                );
                tokio::time::sleep(self.settings.reconnect_delay).await;
                attempt += 1;
            }
        }
    }

    async fn authorize(&self) -> Result<String, FeedError> {
        let resp = self
            .http
            .get(&self.settings.authorize_url)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(FeedError::Protocol(format!(
                "feed authorization failed: {status}: {text}"
            )));
        }

        let envelope: AuthorizeEnvelope = resp
            .json()
            .await
            .map_err(|e| FeedError::Protocol(e.to_string()))?;

        if envelope.status != "success" {
            return Err(FeedError::Protocol("feed authorization rejected".to_string()));
        }
        envelope
            .data
            .map(|d| d.authorized_redirect_uri)
            .ok_or_else(|| FeedError::Protocol("authorization carried no uri".to_string()))
    }

    /// Fan one decoded frame out to the subscribed instruments.
    async fn dispatch(&self, frame: FeedFrame) {
        if frame.feeds.is_empty() {
            return;
        }
        let mut state = self.state.lock().await;

        for (token, instrument_feed) in frame.feeds {
            let Some(delivery) = state.get_mut(&token) else {
                continue;
            };
            let Some(market) = instrument_feed.full_feed.and_then(|f| f.market_ff) else {
                continue;
            };

            if let Some(ltpc) = market.ltpc {
                if let Some(traded_at) = DateTime::from_timestamp_millis(ltpc.ltt) {
                    if delivery.last_tick_at.map_or(true, |last| traded_at > last) {
                        let tick = Tick::new(ltpc.ltp, traded_at, ltpc.ltq, ltpc.cp);
                        delivery.last_tick_at = Some(traded_at);
                        if delivery.channels.ticks.send(tick).await.is_err() {
                            debug!(token = %token, "tick consumer gone");
                        }
                    } else {
                        debug!(token = %token, timestamp = %traded_at, "stale tick dropped");
                    }
                }
            }

            if let Some(ohlc_list) = market.market_ohlc {
                for ohlc in ohlc_list.ohlc {
                    if ohlc.interval != BASE_INTERVAL {
                        continue;
                    }
                    let Some(timestamp) = DateTime::from_timestamp_millis(ohlc.ts) else {
                        continue;
                    };
                    if delivery.last_candle_at.map_or(true, |last| timestamp > last) {
                        let candle = Candle::new(
                            timestamp, ohlc.open, ohlc.high, ohlc.low, ohlc.close, ohlc.volume,
                        );
                        delivery.last_candle_at = Some(timestamp);
                        if delivery.channels.candles.send(candle).await.is_err() {
                            debug!(token = %token, "candle consumer gone");
                        }
                    } else {
                        debug!(token = %token, timestamp = %timestamp, "stale candle dropped");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl MarketFeed for UpstoxFeed {
    async fn subscribe(
        &self,
        instrument: &Instrument,
        channels: InstrumentChannels,
    ) -> Result<(), FeedError> {
        let token = instrument.token();
        let mut state = self.state.lock().await;
        if state.contains_key(&token) {
            return Ok(());
        }

        state.insert(
            token.clone(),
            Delivery {
                channels,
                last_tick_at: None,
                last_candle_at: None,
            },
        );
        let tokens: Vec<String> = state.keys().cloned().collect();
        drop(state);

        self.cmd_tx
            .send(subscription_frame("subscription", &tokens))
            .map_err(|_| FeedError::Subscription("feed connection is gone".to_string()))?;
        info!(instrument = %instrument, "subscribed to live data");
        Ok(())
    }

    async fn unsubscribe(&self, instrument: &Instrument) -> Result<(), FeedError> {
        let token = instrument.token();
        let mut state = self.state.lock().await;
        if state.remove(&token).is_none() {
            return Ok(());
        }
        let tokens: Vec<String> = state.keys().cloned().collect();
        drop(state);

        self.cmd_tx
            .send(subscription_frame("re-subscription", &tokens))
            .map_err(|_| FeedError::Subscription("feed connection is gone".to_string()))?;
        info!(instrument = %instrument, "unsubscribed from live data");
        Ok(())
    }

    async fn market_status(&self) -> MarketStatus {
        *self.status.read().await
    }
}

/// Subscription frame covering the full current instrument set.
fn subscription_frame(guid: &str, tokens: &[String]) -> String {
    json!({
        "guid": guid,
        "method": "sub",
        "data": {
            "mode": "full",
            "instrumentKeys": tokens,
        }
    })
    .to_string()
}

fn is_transport_error(e: &WsError) -> bool {
    matches!(
        e,
        WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Io(_) | WsError::Tls(_)
    )
}

/// Pull the next decoded frame off the socket.
///
/// `Ok(None)` means the peer closed; transport errors are retryable,
/// anything else (including malformed frames) is fatal.
async fn next_frame<S>(stream: &mut S) -> Result<Option<FeedFrame>, FeedError>
where
    S: futures::Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let frame = serde_json::from_str(&text)
                    .map_err(|e| FeedError::Protocol(format!("malformed feed frame: {e}")))?;
                return Ok(Some(frame));
            }
            Some(Ok(Message::Binary(bytes))) => {
                let frame = serde_json::from_slice(&bytes)
                    .map_err(|e| FeedError::Protocol(format!("malformed feed frame: {e}")))?;
                return Ok(Some(frame));
            }
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => continue, // ping/pong/raw frames
            Some(Err(e)) if is_transport_error(&e) => {
                return Err(FeedError::Transport(e.to_string()))
            }
            Some(Err(e)) => return Err(FeedError::Protocol(e.to_string())),
        }
    }
}
