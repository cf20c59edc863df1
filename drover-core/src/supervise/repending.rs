//! Replacement of a cancelled/rejected order with adjusted volume or price.

use crate::core::types::OrderId;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Installed on the order being replaced; owned by its pack.
///
/// `volume`/`price` are overrides: `None` volume replaces whatever the
/// original left unfilled, `None` price falls back to a composory resend.
#[derive(Debug, Clone)]
pub struct RependingOrderInfo {
    pub origin: OrderId,
    pub volume: Option<Decimal>,
    pub price: Option<Decimal>,
    /// Ids of the replacement primitives, once dispatched.
    pub repended: BTreeSet<OrderId>,
}

impl RependingOrderInfo {
    pub fn new(origin: OrderId, volume: Option<Decimal>, price: Option<Decimal>) -> Self {
        Self {
            origin,
            volume,
            price,
            repended: BTreeSet::new(),
        }
    }
}
