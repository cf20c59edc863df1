//! Composory (aggressive) order intent.
//!
//! Priced at the daily limit shaved by 1% on every send, so each primitive
//! behaves market-like while staying inside the exchange band. A composory
//! keeps resending until its target volume is covered; the record never
//! carries a price of its own.

use super::{OrderGroup, RecordId};
use crate::core::types::{OrderCommand, OrderId};
use chrono::Duration;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ComposoryOrderInfo {
    pub symbol: String,
    pub command: OrderCommand,
    pub volume: Decimal,
    pub expire: Duration,
    pub orders: OrderGroup,
}

impl ComposoryOrderInfo {
    pub fn new(
        symbol: impl Into<String>,
        command: OrderCommand,
        volume: Decimal,
        expire: Duration,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            command,
            volume,
            expire,
            orders: OrderGroup::new(),
        }
    }
}

impl fmt::Display for ComposoryOrderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComposoryOrder(symbol={}, command={}, volume={}, expire={}s)",
            self.symbol,
            self.command,
            self.volume,
            self.expire.num_seconds()
        )
    }
}

/// Per (symbol, direction) pool of open packs being force-closed.
///
/// The end-of-period sweep aggregates opened/closed/locked volume across all
/// members and tops up with a fresh composory whenever unlocked volume
/// remains. The pool is discarded once everything opened is closed and every
/// open pack is terminal.
#[derive(Debug, Clone, Default)]
pub struct ComposoryClosePool {
    /// Open packs whose fills this pool is responsible for flattening.
    pub open_ids: BTreeSet<OrderId>,
    /// Composory records spawned by this pool.
    pub records: BTreeSet<RecordId>,
}

impl ComposoryClosePool {
    pub fn new() -> Self {
        Self::default()
    }
}
