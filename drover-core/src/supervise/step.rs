//! Paced entry intents: drip-feed a target volume until a deadline.
//!
//! `Step` sends fixed-size chunks on a wait timer; `Depth` sizes each chunk
//! from the executable portion of the opposite book side. Both spawn
//! time-limited children that inherit the remaining overall window.

use super::OrderGroup;
use crate::core::types::OrderCommand;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone)]
pub struct StepOrderInfo {
    pub command: OrderCommand,
    pub symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    /// Chunk size per send.
    pub step: Decimal,
    pub expire_at: DateTime<Utc>,
    /// Minimum delay between sends.
    pub wait: Duration,
    pub next_send_at: DateTime<Utc>,
    pub orders: OrderGroup,
}

impl StepOrderInfo {
    pub fn new(
        command: OrderCommand,
        symbol: impl Into<String>,
        price: Decimal,
        volume: Decimal,
        step: Decimal,
        expire_at: DateTime<Utc>,
        wait: Duration,
    ) -> Self {
        Self {
            command,
            symbol: symbol.into(),
            price,
            volume,
            step,
            expire_at,
            wait,
            // Epoch start: the first send is never throttled.
            next_send_at: DateTime::<Utc>::UNIX_EPOCH,
            orders: OrderGroup::new(),
        }
    }

    pub fn ready(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_send_at
    }
}

impl fmt::Display for StepOrderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StepOrder(symbol={}, command={}, price={}, volume={}, step={}, expire_at={})",
            self.symbol, self.command, self.price, self.volume, self.step, self.expire_at
        )
    }
}

#[derive(Debug, Clone)]
pub struct DepthOrderInfo {
    pub command: OrderCommand,
    pub symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    /// Book levels (1..=depth) considered per send.
    pub depth: usize,
    pub expire_at: DateTime<Utc>,
    pub wait: Duration,
    pub next_send_at: DateTime<Utc>,
    pub orders: OrderGroup,
}

impl DepthOrderInfo {
    pub fn new(
        command: OrderCommand,
        symbol: impl Into<String>,
        price: Decimal,
        volume: Decimal,
        depth: usize,
        expire_at: DateTime<Utc>,
        wait: Duration,
    ) -> Self {
        Self {
            command,
            symbol: symbol.into(),
            price,
            volume,
            depth,
            expire_at,
            wait,
            next_send_at: DateTime::<Utc>::UNIX_EPOCH,
            orders: OrderGroup::new(),
        }
    }

    pub fn ready(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_send_at
    }

    /// Whether a book level at `price` would execute against the record's
    /// limit: at or below the limit for long, at or above for short.
    pub fn is_price_executable(&self, price: Decimal) -> bool {
        price > Decimal::ZERO
            && (self.price - price) * self.command.direction().sign() >= Decimal::ZERO
    }
}

impl fmt::Display for DepthOrderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DepthOrder(symbol={}, command={}, price={}, volume={}, depth={}, expire_at={})",
            self.symbol, self.command, self.price, self.volume, self.depth, self.expire_at
        )
    }
}
