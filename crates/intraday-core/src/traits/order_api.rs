//! Order execution endpoint interface.

use async_trait::async_trait;

use crate::error::OrderError;
use crate::types::{OrderDetails, OrderPayload};

/// The brokerage order endpoints: place, status, cancel.
///
/// Placement must only ever be reached through the order gateway so the
/// brokerage rate limit cannot be bypassed; status and cancel are not
/// rate-limited and may be called directly.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Submit a new order, returning the brokerage-assigned order id.
    async fn place(&self, payload: &OrderPayload) -> Result<String, OrderError>;

    /// Fetch the current state of an order.
    async fn status(&self, order_id: &str) -> Result<OrderDetails, OrderError>;

    /// Cancel a working order.
    async fn cancel(&self, order_id: &str) -> Result<(), OrderError>;
}
