//! Declarative stop-loss / take-profit attached to an open pack.
//!
//! Stop-loss triggers a composory close of the origin; take-profit is a
//! passive limit close managed for price validity. `check_tp` pauses
//! take-profit re-issuing after the exchange rejects a pending order, so the
//! core surfaces the problem instead of spinning against the venue.

use crate::core::types::OrderId;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone)]
pub struct AutoExitInfo {
    pub origin: OrderId,
    pub stoploss: Option<Decimal>,
    pub takeprofit: Option<Decimal>,
    /// Live take-profit children currently resting on the book.
    pub tp_order_ids: BTreeSet<OrderId>,
    pub check_tp: bool,
}

impl AutoExitInfo {
    pub fn new(origin: OrderId, stoploss: Option<Decimal>, takeprofit: Option<Decimal>) -> Self {
        Self {
            origin,
            stoploss,
            takeprofit,
            tp_order_ids: BTreeSet::new(),
            check_tp: true,
        }
    }

    /// At least one side still set; an unarmed record leaves the live scan.
    pub fn is_armed(&self) -> bool {
        self.stoploss.is_some() || self.takeprofit.is_some()
    }
}

impl fmt::Display for AutoExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AutoExit(origin={}, stoploss={:?}, takeprofit={:?})",
            self.origin, self.stoploss, self.takeprofit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_armed_states() {
        let mut ae = AutoExitInfo::new(OrderId::new("o"), Some(dec!(99)), None);
        assert!(ae.is_armed());
        ae.stoploss = None;
        assert!(!ae.is_armed());
        ae.takeprofit = Some(dec!(105));
        assert!(ae.is_armed());
    }
}
