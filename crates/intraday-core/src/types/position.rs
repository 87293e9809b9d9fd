//! Per-instrument position state.

use serde::{Deserialize, Serialize};

/// Reference to an order placed by the position controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    /// Brokerage-assigned order id
    pub order_id: String,
    /// Tag the order was placed with
    pub tag: String,
}

impl OrderRef {
    /// Create a new order reference.
    pub fn new(order_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            tag: tag.into(),
        }
    }
}

/// Shares owned plus the orders working against them.
///
/// Mutated only by the owning position controller in response to fill
/// confirmations; never shared across instruments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    /// Shares currently held
    pub current_quantity: i64,
    /// Orders placed but not yet resolved
    pub pending: Vec<OrderRef>,
    /// Append-only log of resolved orders
    pub executed: Vec<OrderRef>,
}

impl Position {
    /// Empty position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there is nothing held and nothing working.
    pub fn is_flat(&self) -> bool {
        self.current_quantity == 0 && self.pending.is_empty()
    }
}
