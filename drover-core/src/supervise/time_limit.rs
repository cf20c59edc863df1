//! Time-limited order intent: one limit order that is cancelled if it has
//! not finished within its expiration window.

use super::OrderGroup;
use crate::core::types::OrderCommand;
use chrono::Duration;
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone)]
pub struct TimeLimitOrderInfo {
    pub symbol: String,
    pub command: OrderCommand,
    pub price: Decimal,
    pub volume: Decimal,
    pub expire: Duration,
    pub orders: OrderGroup,
}

impl TimeLimitOrderInfo {
    pub fn new(
        symbol: impl Into<String>,
        command: OrderCommand,
        price: Decimal,
        volume: Decimal,
        expire: Duration,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            command,
            price,
            volume,
            expire,
            orders: OrderGroup::new(),
        }
    }
}

impl fmt::Display for TimeLimitOrderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimeLimitOrder(symbol={}, command={}, price={}, volume={}, expire={}s)",
            self.symbol,
            self.command,
            self.price,
            self.volume,
            self.expire.num_seconds()
        )
    }
}
