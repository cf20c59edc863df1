//! Test helper utilities for creating market data and order events.
//!
//! Used by the crate's own tests and by downstream strategy crates; kept in
//! the library so integration tests and dependents share one set of
//! builders.

use crate::core::types::{
    Direction, Offset, OrderId, OrderSnapshot, OrderStatus, TradeFill, TradeId,
};
use crate::market::{Bar, DepthLevel, Tick};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

/// Deterministic timestamp for backtest-style tests: `t0() + secs`.
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

/// Session start used throughout the tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 2, 9, 30, 0).unwrap()
}

/// Tick with price limits and no book.
pub fn tick(symbol: &str, last: Decimal, upper: Decimal, lower: Decimal) -> Tick {
    Tick {
        symbol: symbol.to_string(),
        datetime: t0(),
        last_price: last,
        upper_limit: upper,
        lower_limit: lower,
        asks: Vec::new(),
        bids: Vec::new(),
    }
}

/// Tick with explicit (price, volume) ask/bid ladders.
pub fn tick_with_depth(
    symbol: &str,
    last: Decimal,
    upper: Decimal,
    lower: Decimal,
    asks: &[(Decimal, Decimal)],
    bids: &[(Decimal, Decimal)],
) -> Tick {
    let mut t = tick(symbol, last, upper, lower);
    t.asks = asks
        .iter()
        .map(|&(price, volume)| DepthLevel::new(price, volume))
        .collect();
    t.bids = bids
        .iter()
        .map(|&(price, volume)| DepthLevel::new(price, volume))
        .collect();
    t
}

/// Bar with the given high/low/close (open = close).
pub fn bar(symbol: &str, high: Decimal, low: Decimal, close: Decimal) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        datetime: t0(),
        open: close,
        high,
        low,
        close,
        volume: Decimal::ZERO,
    }
}

/// Gateway-style order snapshot update for an existing order.
pub fn order_update(
    id: &OrderId,
    symbol: &str,
    direction: Direction,
    offset: Offset,
    price: Decimal,
    total: Decimal,
    traded: Decimal,
    status: OrderStatus,
) -> OrderSnapshot {
    OrderSnapshot {
        id: id.clone(),
        symbol: symbol.to_string(),
        direction,
        offset,
        price,
        price_type: crate::core::types::PriceType::Limit,
        total_volume: total,
        traded_volume: traded,
        price_avg: None,
        status,
        datetime: t0(),
    }
}

/// Fill report for an existing order.
pub fn trade_fill(
    trade_id: &str,
    order_id: &OrderId,
    symbol: &str,
    direction: Direction,
    offset: Offset,
    price: Decimal,
    volume: Decimal,
) -> TradeFill {
    TradeFill {
        id: TradeId::new(trade_id),
        order_id: order_id.clone(),
        symbol: symbol.to_string(),
        direction,
        offset,
        price,
        volume,
        datetime: t0(),
    }
}
