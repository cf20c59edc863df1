//! Order registry: the single owner of every [`OrderPack`], plus the
//! open/close linking and the volume accounting derived from it.
//!
//! Volume accounting is always computed from current snapshots at call time
//! and every sum or difference is rounded to the configured digits, so
//! repeated partial fills cannot drift the derived volumes.

use crate::core::errors::SuperviseError;
use crate::core::types::{Offset, OrderId, TradeFill, TradeId};
use crate::orders::pack::OrderPack;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug)]
pub struct OrderRegistry {
    packs: HashMap<OrderId, OrderPack>,
    trades: HashMap<TradeId, TradeFill>,
    volume_ndigits: u32,
}

impl OrderRegistry {
    pub fn new(volume_ndigits: u32) -> Self {
        Self {
            packs: HashMap::new(),
            trades: HashMap::new(),
            volume_ndigits,
        }
    }

    fn round(&self, volume: Decimal) -> Decimal {
        volume.round_dp(self.volume_ndigits)
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn insert(&mut self, pack: OrderPack) {
        if self.packs.contains_key(&pack.id) {
            warn!("order id {} registered twice, replacing pack", pack.id);
        }
        self.packs.insert(pack.id.clone(), pack);
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.packs.contains_key(id)
    }

    pub fn get(&self, id: &OrderId) -> Option<&OrderPack> {
        self.packs.get(id)
    }

    pub fn get_mut(&mut self, id: &OrderId) -> Option<&mut OrderPack> {
        self.packs.get_mut(id)
    }

    /// Drop a pack. Callers own the consequences; by default packs are kept
    /// for the whole session.
    pub fn remove(&mut self, id: &OrderId) -> Option<OrderPack> {
        self.packs.remove(id)
    }

    /// Attach a fill to its pack and the global trade index. Fills for
    /// unknown orders belong to other strategies on a shared gateway and
    /// are ignored.
    pub fn record_trade(&mut self, fill: TradeFill) {
        let Some(pack) = self.packs.get_mut(&fill.order_id) else {
            return;
        };
        pack.trades.insert(fill.id.clone(), fill.clone());
        self.trades.insert(fill.id.clone(), fill);
    }

    pub fn trade(&self, id: &TradeId) -> Option<&TradeFill> {
        self.trades.get(id)
    }

    /// Packs for the given ids, skipping ids the registry does not know.
    pub fn iter_packs<'a, I>(&'a self, ids: I) -> impl Iterator<Item = &'a OrderPack>
    where
        I: IntoIterator<Item = &'a OrderId>,
        I::IntoIter: 'a,
    {
        ids.into_iter().filter_map(|id| self.packs.get(id))
    }

    /// Sum of requested volumes over known packs, rounded.
    pub fn sum_total_volume<'a, I>(&'a self, ids: I) -> Decimal
    where
        I: IntoIterator<Item = &'a OrderId>,
        I::IntoIter: 'a,
    {
        self.round(self.iter_packs(ids).map(|p| p.order.total_volume).sum())
    }

    /// Sum of traded volumes over known packs, rounded.
    pub fn sum_traded_volume<'a, I>(&'a self, ids: I) -> Decimal
    where
        I: IntoIterator<Item = &'a OrderId>,
        I::IntoIter: 'a,
    {
        self.round(self.iter_packs(ids).map(|p| p.order.traded_volume).sum())
    }

    /// Record an open/close pair after checking the pairing invariants:
    /// open offset on one side, close offset on the other, directions
    /// cancelling out.
    pub fn link(&mut self, open_id: &OrderId, close_id: &OrderId) -> Result<(), SuperviseError> {
        let open = self
            .packs
            .get(open_id)
            .ok_or_else(|| SuperviseError::UnknownOrder(open_id.clone()))?;
        let close = self
            .packs
            .get(close_id)
            .ok_or_else(|| SuperviseError::UnknownOrder(close_id.clone()))?;

        if open.order.offset != Offset::Open {
            return Err(SuperviseError::NotOpenOrder {
                id: open_id.clone(),
                offset: open.order.offset,
            });
        }
        if close.order.offset != Offset::Close {
            return Err(SuperviseError::NotCloseOrder {
                id: close_id.clone(),
                offset: close.order.offset,
            });
        }
        if open.order.direction.sign() + close.order.direction.sign() != Decimal::ZERO {
            return Err(SuperviseError::LinkDirectionMismatch {
                open_id: open_id.clone(),
                open_direction: open.order.direction,
                close_id: close_id.clone(),
                close_direction: close.order.direction,
            });
        }

        self.packs
            .get_mut(open_id)
            .expect("checked above")
            .info
            .close_ids
            .insert(close_id.clone());
        self.packs
            .get_mut(close_id)
            .expect("checked above")
            .info
            .open_id = Some(open_id.clone());
        Ok(())
    }

    /// Volume of an open pack already flattened by its linked close orders.
    pub fn closed_volume(&self, id: &OrderId) -> Result<Decimal, SuperviseError> {
        let pack = self
            .packs
            .get(id)
            .ok_or_else(|| SuperviseError::UnknownOrder(id.clone()))?;
        if pack.info.composory_closed {
            return Ok(pack.order.traded_volume);
        }
        if pack.info.close_ids.is_empty() {
            return Ok(Decimal::ZERO);
        }
        Ok(self.sum_traded_volume(pack.info.close_ids.iter()))
    }

    /// Volume of an open pack earmarked by close orders: live closes reserve
    /// their full requested volume, finished ones only what they traded.
    pub fn locked_volume(&self, id: &OrderId) -> Result<Decimal, SuperviseError> {
        let pack = self
            .packs
            .get(id)
            .ok_or_else(|| SuperviseError::UnknownOrder(id.clone()))?;
        if pack.info.composory_closed {
            return Ok(pack.order.traded_volume);
        }
        let mut locked = Decimal::ZERO;
        for close in self.iter_packs(pack.info.close_ids.iter()) {
            if close.order.status.is_finished() {
                locked += close.order.traded_volume;
            } else {
                locked += close.order.total_volume;
            }
        }
        Ok(self.round(locked))
    }

    /// Filled volume not yet earmarked by any close order.
    pub fn unlocked_volume(&self, id: &OrderId) -> Result<Decimal, SuperviseError> {
        let pack = self
            .packs
            .get(id)
            .ok_or_else(|| SuperviseError::UnknownOrder(id.clone()))?;
        let locked = self.locked_volume(id)?;
        Ok(self.round(pack.order.traded_volume - locked))
    }

    /// Whether an open pack's position is fully flattened.
    pub fn order_closed(&self, id: &OrderId) -> Result<bool, SuperviseError> {
        let pack = self
            .packs
            .get(id)
            .ok_or_else(|| SuperviseError::UnknownOrder(id.clone()))?;
        if pack.info.composory_closed {
            return Ok(true);
        }
        if !pack.order.status.is_finished() {
            return Ok(false);
        }
        if pack.order.traded_volume == Decimal::ZERO {
            return Ok(true);
        }
        if pack.info.close_ids.is_empty() {
            return Ok(false);
        }
        Ok(pack.order.traded_volume == self.closed_volume(id)?)
    }

    /// Average fill price: the gateway's figure when present, otherwise the
    /// volume-weighted mean of recorded trades.
    pub fn traded_price_avg(&self, id: &OrderId) -> Option<Decimal> {
        let pack = self.packs.get(id)?;
        if let Some(avg) = pack.order.price_avg {
            return Some(avg);
        }
        let mut notional = Decimal::ZERO;
        let mut volume = Decimal::ZERO;
        for trade in pack.trades.values() {
            notional += trade.price * trade.volume;
            volume += trade.volume;
        }
        if volume > Decimal::ZERO {
            Some(notional / volume)
        } else {
            None
        }
    }

    /// Open pack a close order reduces, if it is a linked close order.
    pub fn find_open_order(&self, close_id: &OrderId) -> Option<OrderId> {
        let pack = self.packs.get(close_id)?;
        if pack.order.offset != Offset::Close {
            return None;
        }
        pack.info.open_id.clone()
    }

    /// Linked close packs of an open order that the registry still knows.
    pub fn list_close_orders(&self, open_id: &OrderId) -> Vec<OrderId> {
        let Some(pack) = self.packs.get(open_id) else {
            return Vec::new();
        };
        pack.info
            .close_ids
            .iter()
            .filter(|id| self.packs.contains_key(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderCommand, OrderSnapshot, OrderStatus, PriceType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pack(id: &str, command: OrderCommand, volume: Decimal) -> OrderPack {
        OrderPack::new(OrderSnapshot::init(
            OrderId::new(id),
            "X",
            command,
            dec!(100),
            PriceType::Limit,
            volume,
            Utc::now(),
        ))
    }

    fn registry_with(packs: Vec<OrderPack>) -> OrderRegistry {
        let mut registry = OrderRegistry::new(4);
        for p in packs {
            registry.insert(p);
        }
        registry
    }

    #[test]
    fn test_link_checks_offsets_and_directions() {
        let mut registry = registry_with(vec![
            pack("open", OrderCommand::Buy, dec!(10)),
            pack("close", OrderCommand::Sell, dec!(4)),
            pack("open2", OrderCommand::Buy, dec!(10)),
            pack("cover", OrderCommand::Cover, dec!(4)),
        ]);

        registry
            .link(&OrderId::new("open"), &OrderId::new("close"))
            .unwrap();
        let open = registry.get(&OrderId::new("open")).unwrap();
        assert!(open.info.close_ids.contains(&OrderId::new("close")));
        let close = registry.get(&OrderId::new("close")).unwrap();
        assert_eq!(close.info.open_id, Some(OrderId::new("open")));

        // Close pack on the open side: rejected.
        assert!(matches!(
            registry.link(&OrderId::new("close"), &OrderId::new("open")),
            Err(SuperviseError::NotOpenOrder { .. })
        ));
        // Same trade direction on both sides: rejected. Cover trades long,
        // like Buy.
        assert!(matches!(
            registry.link(&OrderId::new("open2"), &OrderId::new("cover")),
            Err(SuperviseError::LinkDirectionMismatch { .. })
        ));
    }

    #[test]
    fn test_volume_accounting_mixed_closes() {
        // Open traded 10; c1 live with total 4; c2 terminal with total 6,
        // traded 5.
        let mut registry = registry_with(vec![
            pack("open", OrderCommand::Buy, dec!(10)),
            pack("c1", OrderCommand::Sell, dec!(4)),
            pack("c2", OrderCommand::Sell, dec!(6)),
        ]);
        registry
            .get_mut(&OrderId::new("open"))
            .unwrap()
            .order
            .traded_volume = dec!(10);
        registry.get_mut(&OrderId::new("c1")).unwrap().order.status = OrderStatus::PartTraded;
        {
            let c2 = registry.get_mut(&OrderId::new("c2")).unwrap();
            c2.order.status = OrderStatus::Cancelled;
            c2.order.traded_volume = dec!(5);
        }
        registry
            .link(&OrderId::new("open"), &OrderId::new("c1"))
            .unwrap();
        registry
            .link(&OrderId::new("open"), &OrderId::new("c2"))
            .unwrap();

        let open = OrderId::new("open");
        assert_eq!(registry.closed_volume(&open).unwrap(), dec!(5));
        assert_eq!(registry.locked_volume(&open).unwrap(), dec!(9));
        assert_eq!(registry.unlocked_volume(&open).unwrap(), dec!(1));
        assert!(!registry.order_closed(&open).unwrap());
    }

    #[test]
    fn test_composory_closed_shortcut() {
        let mut registry = registry_with(vec![pack("open", OrderCommand::Short, dec!(8))]);
        {
            let open = registry.get_mut(&OrderId::new("open")).unwrap();
            open.order.traded_volume = dec!(8);
            open.order.status = OrderStatus::AllTraded;
            open.info.composory_closed = true;
        }
        let open = OrderId::new("open");
        assert_eq!(registry.closed_volume(&open).unwrap(), dec!(8));
        assert_eq!(registry.locked_volume(&open).unwrap(), dec!(8));
        assert_eq!(registry.unlocked_volume(&open).unwrap(), dec!(0));
        assert!(registry.order_closed(&open).unwrap());
    }

    #[test]
    fn test_order_closed_zero_fill_terminal() {
        let mut registry = registry_with(vec![pack("open", OrderCommand::Buy, dec!(3))]);
        registry.get_mut(&OrderId::new("open")).unwrap().order.status = OrderStatus::Cancelled;
        assert!(registry.order_closed(&OrderId::new("open")).unwrap());
    }

    #[test]
    fn test_traded_price_avg_falls_back_to_trades() {
        let mut registry = registry_with(vec![pack("open", OrderCommand::Buy, dec!(3))]);
        let id = OrderId::new("open");
        assert_eq!(registry.traded_price_avg(&id), None);

        for (n, (price, volume)) in [(dec!(100), dec!(1)), (dec!(103), dec!(2))]
            .into_iter()
            .enumerate()
        {
            registry.record_trade(TradeFill {
                id: TradeId::new(format!("t{}", n)),
                order_id: id.clone(),
                symbol: "X".to_string(),
                direction: crate::core::types::Direction::Long,
                offset: Offset::Open,
                price,
                volume,
                datetime: Utc::now(),
            });
        }
        // (100*1 + 103*2) / 3 = 102
        assert_eq!(registry.traded_price_avg(&id), Some(dec!(102)));

        registry.get_mut(&id).unwrap().order.price_avg = Some(dec!(101.5));
        assert_eq!(registry.traded_price_avg(&id), Some(dec!(101.5)));
    }

    #[test]
    fn test_record_trade_ignores_unknown_order() {
        let mut registry = registry_with(vec![]);
        registry.record_trade(TradeFill {
            id: TradeId::new("t1"),
            order_id: OrderId::new("ghost"),
            symbol: "X".to_string(),
            direction: crate::core::types::Direction::Long,
            offset: Offset::Open,
            price: dec!(100),
            volume: dec!(1),
            datetime: Utc::now(),
        });
        assert!(registry.trade(&TradeId::new("t1")).is_none());
    }
}
