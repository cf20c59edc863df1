//! Periodic pool sweeps.
//!
//! The strategy harness calls `check_on_period_start` / `check_on_period_end`
//! once per bar; everything time-based (expiry, resends, paced sends, pool
//! draining) happens here rather than on individual events.

use super::{OrderSupervisor, Strategy};
use crate::core::errors::SuperviseError;
use crate::core::types::{Direction, OrderCommand, OrderId};
use crate::execution::Gateway;
use crate::market::Bar;
use crate::supervise::RecordId;
use rust_decimal::Decimal;
use tracing::info;

impl<G: Gateway, S: Strategy> OrderSupervisor<G, S> {
    /// Start-of-period sweep: composory resends, time-limit expiry,
    /// stop-loss scan for the bar's symbol, due conditional closes.
    pub fn check_on_period_start(&mut self, bar: &Bar) -> Result<(), SuperviseError> {
        self.check_composory_orders()?;
        self.check_time_limit_orders()?;
        self.check_auto_exit(&bar.symbol, false)?;
        self.check_conditional_close()
    }

    /// End-of-period sweep: composory-close pools, then the paced depth and
    /// step intents for the bar's symbol.
    pub fn check_on_period_end(&mut self, bar: &Bar) -> Result<(), SuperviseError> {
        self.check_composory_close_orders(&bar.symbol)?;
        self.check_depth_orders(&bar.symbol)?;
        self.check_step_orders(&bar.symbol)
    }

    /// Drive every live time-limit primitive (cancelling expired ones) and
    /// drop records whose primitives have all finished.
    pub fn check_time_limit_orders(&mut self) -> Result<(), SuperviseError> {
        let record_ids: Vec<RecordId> = self.time_limits.keys().copied().collect();
        for record_id in record_ids {
            let live: Vec<OrderId> = match self.time_limits.get(&record_id) {
                Some(record) => record.orders.live.iter().cloned().collect(),
                None => continue,
            };
            for id in &live {
                self.on_time_limit_order(id)?;
            }
            if self
                .time_limits
                .get(&record_id)
                .is_some_and(|record| record.orders.is_idle())
            {
                self.time_limits.remove(&record_id);
            }
        }
        Ok(())
    }

    /// Drive every active composory record: finalize/resend its primitives
    /// (the repend path), retry sends deferred for lack of market data, and
    /// retire records whose volume is covered.
    pub fn check_composory_orders(&mut self) -> Result<(), SuperviseError> {
        let record_ids: Vec<RecordId> = self.composory_active.iter().copied().collect();
        for record_id in record_ids {
            let live: Vec<OrderId> = match self.composories.get(&record_id) {
                Some(record) => record.orders.live.iter().cloned().collect(),
                None => {
                    self.composory_active.remove(&record_id);
                    continue;
                }
            };
            for id in &live {
                self.on_composory_order(id, true)?;
            }

            let (idle, remaining) = {
                let Some(record) = self.composories.get(&record_id) else {
                    self.composory_active.remove(&record_id);
                    continue;
                };
                let locked = self.registry.sum_total_volume(record.orders.live.iter());
                let filled = self
                    .registry
                    .sum_traded_volume(record.orders.filled.iter());
                (
                    record.orders.is_idle(),
                    self.config.round_volume(record.volume - locked - filled),
                )
            };
            if !idle {
                continue;
            }
            if remaining > Decimal::ZERO {
                // Send was deferred (no market data); retry now and keep the
                // record active until a primitive actually goes out.
                self.send_composory(record_id)?;
            } else {
                self.composory_active.remove(&record_id);
            }
        }
        Ok(())
    }

    /// Sweep the composory-close pools of one symbol, discarding a
    /// direction's pool once its open packs are terminal and fully closed.
    pub fn check_composory_close_orders(&mut self, symbol: &str) -> Result<(), SuperviseError> {
        let Some(pools) = self.close_pools.get(symbol) else {
            return Ok(());
        };
        let directions: Vec<Direction> = pools.keys().copied().collect();
        for direction in directions {
            if self.check_composory_close(symbol, direction)? {
                if let Some(pools) = self.close_pools.get_mut(symbol) {
                    pools.remove(&direction);
                }
            }
        }
        Ok(())
    }

    /// Aggregate one close pool and top up with a fresh composory when
    /// unlocked volume remains. Live close orders that are not themselves
    /// composory are cancelled so the pool regains authority over the
    /// remaining volume. Returns `true` when the pool is done.
    fn check_composory_close(
        &mut self,
        symbol: &str,
        direction: Direction,
    ) -> Result<bool, SuperviseError> {
        let command = OrderCommand::close_of(direction);
        let (open_ids, record_ids) = {
            let Some(pool) = self
                .close_pools
                .get(symbol)
                .and_then(|pools| pools.get(&direction))
            else {
                return Ok(true);
            };
            (pool.open_ids.clone(), pool.records.clone())
        };

        let mut total_opened = Decimal::ZERO;
        let mut closed = Decimal::ZERO;
        let mut locked = Decimal::ZERO;
        let mut open_all_finished = true;
        let mut cancels: Vec<OrderId> = Vec::new();

        for open in self.registry.iter_packs(open_ids.iter()) {
            if !open.order.status.is_finished() {
                open_all_finished = false;
            }
            total_opened += open.order.traded_volume;
            for close in self.registry.iter_packs(open.info.close_ids.iter()) {
                closed += close.order.traded_volume;
                if !close.order.status.is_finished() {
                    locked += close.order.total_volume - close.order.traded_volume;
                    if close.info.composory.is_none() {
                        cancels.push(close.id.clone());
                    }
                }
            }
        }
        for record_id in &record_ids {
            let Some(record) = self.composories.get(record_id) else {
                continue;
            };
            for close in self.registry.iter_packs(record.orders.live.iter()) {
                closed += close.order.traded_volume;
                if !close.order.status.is_finished() {
                    locked += close.order.total_volume - close.order.traded_volume;
                }
            }
            for close in self.registry.iter_packs(record.orders.filled.iter()) {
                closed += close.order.traded_volume;
            }
        }

        for id in cancels {
            self.cancel_order(&id)?;
        }

        let unlocked = self.config.round_volume(total_opened - closed - locked);
        if unlocked > Decimal::ZERO {
            info!(
                "{} | composory close pool {}/{} has {} unlocked, sending",
                self.current_time(),
                symbol,
                direction,
                unlocked
            );
            let record_id =
                self.composory_order(command, symbol, unlocked, self.composory_expire())?;
            if let Some(pool) = self
                .close_pools
                .get_mut(symbol)
                .and_then(|pools| pools.get_mut(&direction))
            {
                pool.records.insert(record_id);
            }
        }

        Ok(self.config.round_volume(total_opened - closed) <= Decimal::ZERO && open_all_finished)
    }

    /// Sweep the step pool of one symbol: drop expired records, pace the
    /// rest.
    pub fn check_step_orders(&mut self, symbol: &str) -> Result<(), SuperviseError> {
        let Some(pool) = self.step_orders.get(symbol) else {
            return Ok(());
        };
        let record_ids: Vec<RecordId> = pool.keys().copied().collect();
        let now = self.current_time();
        for record_id in record_ids {
            let expired = self
                .step_orders
                .get(symbol)
                .and_then(|pool| pool.get(&record_id))
                .map_or(true, |record| record.expire_at < now);
            if expired {
                if let Some(pool) = self.step_orders.get_mut(symbol) {
                    pool.remove(&record_id);
                }
                continue;
            }
            self.exec_step_order(symbol, record_id)?;
        }
        Ok(())
    }

    /// Sweep the depth pool of one symbol. Requires a tick (the chunk size
    /// comes from the book); without one this is a no-op for the period.
    pub fn check_depth_orders(&mut self, symbol: &str) -> Result<(), SuperviseError> {
        if self.market.tick(symbol).is_none() {
            return Ok(());
        }
        let Some(pool) = self.depth_orders.get(symbol) else {
            return Ok(());
        };
        let record_ids: Vec<RecordId> = pool.keys().copied().collect();
        let now = self.current_time();
        for record_id in record_ids {
            let expired = self
                .depth_orders
                .get(symbol)
                .and_then(|pool| pool.get(&record_id))
                .map_or(true, |record| record.expire_at < now);
            if expired {
                if let Some(pool) = self.depth_orders.get_mut(symbol) {
                    pool.remove(&record_id);
                }
                continue;
            }
            self.exec_depth_order(symbol, record_id)?;
        }
        Ok(())
    }
}
