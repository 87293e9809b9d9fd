//! Order types and the brokerage wire payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Instrument;
use crate::error::OrderError;

/// Price written into MARKET order payloads; the brokerage ignores it.
pub const MARKET_PRICE_SENTINEL: Decimal = Decimal::ZERO;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Execute immediately at the best available price
    Market,
    /// Execute at the given price or better
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

/// Brokerage-reported order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted but not yet working at the exchange
    Pending,
    /// Working at the exchange, not fully filled
    Open,
    /// Fully executed
    Complete,
    /// Rejected by the brokerage or exchange
    Rejected,
    /// Cancelled before completion
    Cancelled,
}

impl OrderStatus {
    /// Whether the order can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Complete | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Map a brokerage status string; anything unrecognized is treated as
    /// still pending so pollers keep re-fetching.
    pub fn parse(s: &str) -> Self {
        match s {
            "open" => OrderStatus::Open,
            "complete" => OrderStatus::Complete,
            "rejected" => OrderStatus::Rejected,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Complete => write!(f, "complete"),
            OrderStatus::Rejected => write!(f, "rejected"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A new-order request as built by the position controller.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Instrument to trade
    pub instrument: Instrument,
    /// Buy or sell
    pub side: Side,
    /// Market or limit
    pub order_type: OrderType,
    /// Number of shares, must be >= 1
    pub quantity: u32,
    /// Limit price; required for LIMIT, ignored for MARKET
    pub price: Option<Decimal>,
    /// Caller tag carried through to the brokerage and all logs
    pub tag: String,
}

impl OrderRequest {
    /// Create a market order request.
    pub fn market(instrument: Instrument, side: Side, quantity: u32, tag: impl Into<String>) -> Self {
        Self {
            instrument,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            tag: tag.into(),
        }
    }

    /// Create a limit order request.
    pub fn limit(
        instrument: Instrument,
        side: Side,
        quantity: u32,
        price: Decimal,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            instrument,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            tag: tag.into(),
        }
    }

    /// Validate and convert into the brokerage wire payload.
    ///
    /// Fails fast with [`OrderError::InvalidOrder`] before anything is
    /// queued: quantity must be at least 1 and LIMIT orders must carry a
    /// price. MARKET orders get the sentinel price regardless of input.
    pub fn into_payload(self) -> Result<OrderPayload, OrderError> {
        if self.quantity < 1 {
            return Err(OrderError::InvalidOrder(
                "quantity must be at least 1".to_string(),
            ));
        }

        let price = match self.order_type {
            OrderType::Market => MARKET_PRICE_SENTINEL,
            OrderType::Limit => self.price.ok_or_else(|| {
                OrderError::InvalidOrder("price must be provided for LIMIT orders".to_string())
            })?,
        };

        Ok(OrderPayload {
            quantity: self.quantity,
            product: "I".to_string(),
            validity: "DAY".to_string(),
            price,
            tag: self.tag,
            instrument_token: self.instrument.token(),
            order_type: self.order_type,
            transaction_type: self.side,
            disclosed_quantity: 0,
            trigger_price: Decimal::ZERO,
            is_amo: false,
            slice: true,
        })
    }
}

/// The intraday order payload accepted by the brokerage place endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub quantity: u32,
    pub product: String,
    pub validity: String,
    pub price: Decimal,
    pub tag: String,
    pub instrument_token: String,
    pub order_type: OrderType,
    pub transaction_type: Side,
    pub disclosed_quantity: u32,
    pub trigger_price: Decimal,
    pub is_amo: bool,
    pub slice: bool,
}

/// Order state as reported by the brokerage status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    /// Brokerage-assigned order id
    pub order_id: String,
    /// Current status
    pub status: OrderStatus,
    /// Shares filled so far
    pub filled_quantity: u32,
    /// Shares still unfilled
    pub pending_quantity: u32,
    /// Order price (limit price, or average for market fills)
    pub price: Option<Decimal>,
    /// Human-readable symbol, when the brokerage provides it
    pub trading_symbol: Option<String>,
    /// Tag echoed back by the brokerage
    pub tag: Option<String>,
    /// Rejection or informational message
    pub status_message: Option<String>,
}

impl OrderDetails {
    /// Fully executed with nothing left pending.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Complete && self.pending_quantity == 0
    }
}
