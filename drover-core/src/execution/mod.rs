//! Gateway boundary.
//!
//! The supervision core never talks to an exchange directly; it drives a
//! [`Gateway`] implementation that accepts single primitive orders and
//! cancel requests. Everything above the trait (expiry, resends, linking,
//! volume accounting) is the core's job; everything below it (sessions,
//! wire protocols, throttling) is the gateway's.
//!
//! A scripted in-process gateway for tests and paper runs lives in
//! [`sim`].

pub mod sim;

use crate::core::types::{OrderCommand, OrderId, PriceType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use sim::SimGateway;

/// Whether the core is running against a live session or a backtest feed.
///
/// Injected at construction. Backtest mode changes two things: the clock is
/// driven by market data timestamps instead of the wall clock, and
/// step/depth intents degrade to a single whole-volume submission because
/// their pacing cannot be simulated faithfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Live,
    Backtest,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Live => write!(f, "LIVE"),
            ExecutionMode::Backtest => write!(f, "BACKTEST"),
        }
    }
}

/// A primitive order request as handed to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub command: OrderCommand,
    pub symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    pub price_type: PriceType,
    /// Stop (conditional) order flag, passed through untouched.
    pub stop: bool,
}

/// Static contract metadata the core needs for price rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub symbol: String,
    pub price_tick: Decimal,
}

/// Low-level exchange gateway.
///
/// `send_order` returns the gateway order ids produced by the request:
/// usually one, possibly several when a logical order fans out, possibly
/// none when the gateway queues silently. Cancellation is a request, not a
/// state change: the order counts as cancelled only once a `Cancelled`
/// snapshot comes back through `on_order`.
pub trait Gateway {
    fn send_order(&mut self, request: &OrderRequest) -> anyhow::Result<Vec<OrderId>>;

    fn cancel_order(&mut self, id: &OrderId) -> anyhow::Result<()>;

    /// Round a price to the contract's tick. `price_tick` is `None` when the
    /// venue publishes no tick for the symbol; implementations then return
    /// the price unchanged or apply a venue-wide default.
    fn round_to_price_tick(&self, price_tick: Option<Decimal>, price: Decimal) -> Decimal;

    fn contract(&self, symbol: &str) -> Option<ContractInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_request_roundtrips_through_serde() {
        let req = OrderRequest {
            command: OrderCommand::Buy,
            symbol: "X".to_string(),
            price: dec!(100.5),
            volume: dec!(2),
            price_type: PriceType::Limit,
            stop: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: OrderRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }
}
