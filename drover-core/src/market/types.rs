//! Market data snapshots consumed by the supervision core.
//!
//! The core never mutates these; it only caches the latest instance per
//! symbol and reads prices off it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One level of the order book ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub volume: Decimal,
}

impl DepthLevel {
    pub fn new(price: Decimal, volume: Decimal) -> Self {
        Self { price, volume }
    }
}

/// Tick snapshot: last trade, daily price limits, and the visible book.
///
/// Ladders are ordered best-first (index 0 = level 1). A gateway that only
/// publishes top-of-book sends one-element ladders; one that publishes no
/// book at all sends empty ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub last_price: Decimal,
    pub upper_limit: Decimal,
    pub lower_limit: Decimal,
    pub asks: Vec<DepthLevel>,
    pub bids: Vec<DepthLevel>,
}

impl Tick {
    pub fn ask1(&self) -> Option<&DepthLevel> {
        self.asks.first()
    }

    pub fn bid1(&self) -> Option<&DepthLevel> {
        self.bids.first()
    }

    /// Best ask/bid prices, falling back to the last trade when the book is
    /// not published.
    pub fn ask_bid(&self) -> (Decimal, Decimal) {
        let ask = self.ask1().map(|l| l.price).unwrap_or(self.last_price);
        let bid = self.bid1().map(|l| l.price).unwrap_or(self.last_price);
        (ask, bid)
    }
}

/// Aggregated bar (candle) for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}
