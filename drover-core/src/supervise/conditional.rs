//! Scheduled close of an open pack.
//!
//! At the deadline: a still-live origin is cancelled; a filled origin is
//! either composory-closed outright or armed with a stop-loss derived from
//! its average fill price and the target profit.

use crate::core::types::OrderId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ConditionalOrderClose {
    pub origin: OrderId,
    pub expire_at: DateTime<Utc>,
    /// Signed fraction relative to the average open price. `None` closes
    /// unconditionally at the deadline.
    pub target_profit: Option<Decimal>,
}

impl ConditionalOrderClose {
    pub fn new(origin: OrderId, expire_at: DateTime<Utc>, target_profit: Option<Decimal>) -> Self {
        Self {
            origin,
            expire_at,
            target_profit,
        }
    }
}

impl fmt::Display for ConditionalOrderClose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConditionalClose(origin={}, expire_at={}, target_profit={:?})",
            self.origin, self.expire_at, self.target_profit
        )
    }
}
