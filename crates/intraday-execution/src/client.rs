//! Brokerage order endpoints over REST.

use async_trait::async_trait;
use reqwest::{header, Client};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use intraday_core::error::OrderError;
use intraday_core::{OrderApi, OrderDetails, OrderPayload, OrderStatus};

/// Order endpoint URLs.
///
/// Placement goes through the low-latency host; fetch and cancel use the
/// standard API host.
#[derive(Debug, Clone)]
pub struct OrderEndpoints {
    pub place_url: String,
    pub fetch_url: String,
    pub cancel_url: String,
}

impl OrderEndpoints {
    /// Build the endpoint set from the two API hosts.
    pub fn new(api_base: &str, hft_base: &str) -> Self {
        Self {
            place_url: format!("{hft_base}/v3/order/place"),
            fetch_url: format!("{api_base}/v2/order/details"),
            cancel_url: format!("{api_base}/v3/order/cancel"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: String,
    data: Option<T>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceData {
    order_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireOrderDetails {
    order_id: String,
    status: String,
    filled_quantity: u32,
    pending_quantity: u32,
    price: Option<Decimal>,
    trading_symbol: Option<String>,
    tag: Option<String>,
    status_message: Option<String>,
}

/// Upstox-style order client implementing [`OrderApi`].
pub struct UpstoxOrderClient {
    http: Client,
    endpoints: OrderEndpoints,
}

impl UpstoxOrderClient {
    /// Create a client with the bearer token baked into default headers.
    pub fn new(access_token: &str, endpoints: OrderEndpoints) -> Result<Self, OrderError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {access_token}"))
                .map_err(|e| OrderError::Api(e.to_string()))?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| OrderError::Connection(e.to_string()))?;

        Ok(Self { http, endpoints })
    }
}

#[async_trait]
impl OrderApi for UpstoxOrderClient {
    async fn place(&self, payload: &OrderPayload) -> Result<String, OrderError> {
        debug!(tag = %payload.tag, "placing order");

        let resp = self
            .http
            .post(&self.endpoints.place_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| OrderError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(OrderError::Rejected(format!("{status}: {text}")));
        }

        let envelope: ApiEnvelope<PlaceData> = resp
            .json()
            .await
            .map_err(|e| OrderError::Api(e.to_string()))?;

        if envelope.status != "success" {
            return Err(OrderError::Rejected(
                envelope.message.unwrap_or_else(|| "order not accepted".to_string()),
            ));
        }

        let order_id = envelope
            .data
            .and_then(|d| d.order_ids.into_iter().next())
            .ok_or_else(|| OrderError::Api("place response carried no order id".to_string()))?;

        info!(order_id = %order_id, tag = %payload.tag, "order placed");
        Ok(order_id)
    }

    async fn status(&self, order_id: &str) -> Result<OrderDetails, OrderError> {
        let resp = self
            .http
            .get(&self.endpoints.fetch_url)
            .query(&[("order_id", order_id)])
            .send()
            .await
            .map_err(|e| OrderError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(OrderError::Api(format!("{status}: {text}")));
        }

        let envelope: ApiEnvelope<WireOrderDetails> = resp
            .json()
            .await
            .map_err(|e| OrderError::Api(e.to_string()))?;

        if envelope.status != "success" {
            return Err(OrderError::Api(
                envelope.message.unwrap_or_else(|| format!("order {order_id} not found")),
            ));
        }

        let wire = envelope
            .data
            .ok_or_else(|| OrderError::Api("status response carried no data".to_string()))?;

        Ok(OrderDetails {
            order_id: wire.order_id,
            status: OrderStatus::parse(&wire.status),
            filled_quantity: wire.filled_quantity,
            pending_quantity: wire.pending_quantity,
            price: wire.price,
            trading_symbol: wire.trading_symbol,
            tag: wire.tag,
            status_message: wire.status_message,
        })
    }

    async fn cancel(&self, order_id: &str) -> Result<(), OrderError> {
        let resp = self
            .http
            .delete(&self.endpoints.cancel_url)
            .query(&[("order_id", order_id)])
            .send()
            .await
            .map_err(|e| OrderError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(OrderError::Api(format!("{status}: {text}")));
        }

        let envelope: ApiEnvelope<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| OrderError::Api(e.to_string()))?;

        if envelope.status != "success" {
            return Err(OrderError::Api(
                envelope.message.unwrap_or_else(|| format!("failed to cancel {order_id}")),
            ));
        }

        info!(order_id = %order_id, "order cancelled");
        Ok(())
    }
}
