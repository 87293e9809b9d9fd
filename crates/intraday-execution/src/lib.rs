//! Order execution: rate-limited gateway, brokerage client and the
//! signal-driven position controller.

mod client;
mod controller;
mod gateway;

pub use client::{OrderEndpoints, UpstoxOrderClient};
pub use controller::{tier_quantities, ControllerSettings, PositionController};
pub use gateway::OrderGateway;
