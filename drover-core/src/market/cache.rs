//! Last-value market data cache.
//!
//! One tick and one bar per symbol, replaced wholesale on every update. All
//! execution-price decisions in the core read from here, so every read has a
//! bar fallback for tick-less (backtest) sessions and returns `None` when a
//! symbol has produced no data at all, which callers treat as "defer until
//! next period".

use crate::core::types::Direction;
use crate::market::types::{Bar, Tick};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MarketCache {
    ticks: HashMap<String, Tick>,
    bars: HashMap<String, Bar>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_tick(&mut self, tick: Tick) {
        self.ticks.insert(tick.symbol.clone(), tick);
    }

    pub fn update_bar(&mut self, bar: Bar) {
        self.bars.insert(bar.symbol.clone(), bar);
    }

    pub fn tick(&self, symbol: &str) -> Option<&Tick> {
        self.ticks.get(symbol)
    }

    pub fn bar(&self, symbol: &str) -> Option<&Bar> {
        self.bars.get(symbol)
    }

    /// Aggressive execution price for a marketable limit order.
    ///
    /// Long side prices just under the daily upper limit, short side just
    /// over the lower limit, so the order behaves market-like without being
    /// rejected for crossing the band. Bar high/low stand in when no tick
    /// has arrived.
    pub fn exec_price(&self, symbol: &str, direction: Direction) -> Option<Decimal> {
        match direction {
            Direction::Long => {
                if let Some(tick) = self.ticks.get(symbol) {
                    Some(tick.upper_limit * dec!(0.99))
                } else {
                    self.bars.get(symbol).map(|bar| bar.high)
                }
            }
            Direction::Short => {
                if let Some(tick) = self.ticks.get(symbol) {
                    Some(tick.lower_limit * dec!(1.01))
                } else {
                    self.bars.get(symbol).map(|bar| bar.low)
                }
            }
        }
    }

    /// Latest traded price: tick last price, else bar close.
    pub fn current_price(&self, symbol: &str) -> Option<Decimal> {
        if let Some(tick) = self.ticks.get(symbol) {
            Some(tick.last_price)
        } else {
            self.bars.get(symbol).map(|bar| bar.close)
        }
    }

    /// (ask, bid) pair used by stop-loss checks. Without a tick, the bar's
    /// high/low give the most pessimistic pair the period can justify.
    pub fn ask_bid(&self, symbol: &str) -> Option<(Decimal, Decimal)> {
        if let Some(tick) = self.ticks.get(symbol) {
            Some(tick.ask_bid())
        } else {
            self.bars.get(symbol).map(|bar| (bar.high, bar.low))
        }
    }
}
