//! Scripted in-process gateway.
//!
//! `SimGateway` accepts every request, mints sequential ids and records what
//! it was asked to do. It produces no snapshots of its own; the test (or
//! paper harness) feeds `on_order`/`on_trade` events back, which is exactly
//! the asynchronous shape a real gateway has.

use super::{ContractInfo, Gateway, OrderRequest};
use crate::core::types::OrderId;
use anyhow::anyhow;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};

/// One recorded submission.
#[derive(Debug, Clone)]
pub struct SentOrder {
    pub id: OrderId,
    pub request: OrderRequest,
}

#[derive(Debug, Default)]
pub struct SimGateway {
    next_id: u64,
    sent: Vec<SentOrder>,
    cancels: Vec<OrderId>,
    contracts: HashMap<String, ContractInfo>,
    fail_next_send: bool,
}

impl SimGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register contract metadata so `round_to_price_tick` has a tick.
    pub fn with_contract(mut self, symbol: &str, price_tick: Decimal) -> Self {
        self.contracts.insert(
            symbol.to_string(),
            ContractInfo {
                symbol: symbol.to_string(),
                price_tick,
            },
        );
        self
    }

    /// Make the next `send_order` fail, to exercise gateway error paths.
    pub fn fail_next_send(&mut self) {
        self.fail_next_send = true;
    }

    pub fn sent(&self) -> &[SentOrder] {
        &self.sent
    }

    pub fn cancels(&self) -> &[OrderId] {
        &self.cancels
    }

    pub fn request_of(&self, id: &OrderId) -> Option<&OrderRequest> {
        self.sent
            .iter()
            .find(|s| &s.id == id)
            .map(|s| &s.request)
    }

    /// Number of cancel requests recorded for `id`.
    pub fn cancel_count(&self, id: &OrderId) -> usize {
        self.cancels.iter().filter(|c| *c == id).count()
    }
}

impl Gateway for SimGateway {
    fn send_order(&mut self, request: &OrderRequest) -> anyhow::Result<Vec<OrderId>> {
        if self.fail_next_send {
            self.fail_next_send = false;
            return Err(anyhow!("simulated gateway send failure"));
        }

        self.next_id += 1;
        let id = OrderId::new(format!("sim.{}", self.next_id));
        info!(
            "SIM: send {} {} @ {} (volume: {})",
            request.command, request.symbol, request.price, request.volume
        );
        self.sent.push(SentOrder {
            id: id.clone(),
            request: request.clone(),
        });
        Ok(vec![id])
    }

    fn cancel_order(&mut self, id: &OrderId) -> anyhow::Result<()> {
        debug!("SIM: cancel {}", id);
        self.cancels.push(id.clone());
        Ok(())
    }

    fn round_to_price_tick(&self, price_tick: Option<Decimal>, price: Decimal) -> Decimal {
        match price_tick {
            Some(tick) if tick > Decimal::ZERO => (price / tick).round() * tick,
            _ => price,
        }
    }

    fn contract(&self, symbol: &str) -> Option<ContractInfo> {
        self.contracts.get(symbol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderCommand, PriceType};
    use rust_decimal_macros::dec;

    fn request() -> OrderRequest {
        OrderRequest {
            command: OrderCommand::Buy,
            symbol: "X".to_string(),
            price: dec!(100),
            volume: dec!(1),
            price_type: PriceType::Limit,
            stop: false,
        }
    }

    #[test]
    fn test_mints_sequential_ids() {
        let mut gw = SimGateway::new();
        let a = gw.send_order(&request()).unwrap();
        let b = gw.send_order(&request()).unwrap();
        assert_eq!(a, vec![OrderId::new("sim.1")]);
        assert_eq!(b, vec![OrderId::new("sim.2")]);
        assert_eq!(gw.sent().len(), 2);
    }

    #[test]
    fn test_records_cancels() {
        let mut gw = SimGateway::new();
        let ids = gw.send_order(&request()).unwrap();
        gw.cancel_order(&ids[0]).unwrap();
        gw.cancel_order(&ids[0]).unwrap();
        assert_eq!(gw.cancel_count(&ids[0]), 2);
    }

    #[test]
    fn test_round_to_price_tick() {
        let gw = SimGateway::new().with_contract("X", dec!(0.5));
        let tick = gw.contract("X").map(|c| c.price_tick);
        assert_eq!(gw.round_to_price_tick(tick, dec!(100.3)), dec!(100.5));
        assert_eq!(gw.round_to_price_tick(None, dec!(100.3)), dec!(100.3));
    }

    #[test]
    fn test_fail_next_send() {
        let mut gw = SimGateway::new();
        gw.fail_next_send();
        assert!(gw.send_order(&request()).is_err());
        assert!(gw.send_order(&request()).is_ok());
    }
}
