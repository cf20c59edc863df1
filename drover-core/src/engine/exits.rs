//! Exit management: declarative stop-loss / take-profit and scheduled
//! (conditional) closes.

use super::{OrderSupervisor, Strategy};
use crate::core::errors::SuperviseError;
use crate::core::types::{Direction, OrderCommand, OrderId, OrderStatus};
use crate::execution::Gateway;
use crate::orders::TrackTag;
use crate::supervise::{AutoExitInfo, ConditionalOrderClose};
use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{info, warn};

impl<G: Gateway, S: Strategy> OrderSupervisor<G, S> {
    // ------------------------------------------------------------------
    // Auto exit (stop-loss / take-profit)
    // ------------------------------------------------------------------

    /// Attach or update the stop-loss / take-profit record of an open pack.
    ///
    /// Passing `None` for a side leaves it untouched unless `cover` is set,
    /// in which case the side is cleared. The record stays in the live scan
    /// while at least one side is armed.
    pub fn set_auto_exit(
        &mut self,
        open_id: &OrderId,
        stoploss: Option<Decimal>,
        takeprofit: Option<Decimal>,
        cover: bool,
    ) -> Result<(), SuperviseError> {
        let symbol = self
            .registry
            .get(open_id)
            .ok_or_else(|| SuperviseError::UnknownOrder(open_id.clone()))?
            .order
            .symbol
            .clone();

        let stoploss = match stoploss {
            Some(price) => {
                let price = self.adjust_price(&symbol, price, "stoploss");
                if price <= Decimal::ZERO {
                    return Err(SuperviseError::InvalidPrice(price));
                }
                Some(price)
            }
            None => None,
        };
        let takeprofit = match takeprofit {
            Some(price) => {
                let price = self.adjust_price(&symbol, price, "takeprofit");
                if price <= Decimal::ZERO {
                    return Err(SuperviseError::InvalidPrice(price));
                }
                Some(price)
            }
            None => None,
        };

        let now = self.current_time();
        let record = self
            .auto_exits
            .entry(open_id.clone())
            .or_insert_with(|| AutoExitInfo::new(open_id.clone(), stoploss, takeprofit));
        if stoploss.is_some() || cover {
            record.stoploss = stoploss;
        }
        if takeprofit.is_some() || cover {
            record.takeprofit = takeprofit;
        }

        if record.is_armed() {
            info!("{} | {} | set auto exit", now, record);
            self.auto_exit_live.insert(open_id.clone());
        } else if self.auto_exit_live.remove(open_id) {
            info!("{} | auto exit disarmed for {}", now, open_id);
        }
        Ok(())
    }

    /// Evaluate one auto-exit record against the given ask/bid.
    ///
    /// Returns `true` when the stop-loss fired. Stop-loss wins over
    /// take-profit on the same event; take-profit management only runs on
    /// take-profit evaluation calls (`check_tp`) and while the record's own
    /// pause flag allows it.
    pub fn exec_auto_exit(
        &mut self,
        origin: &OrderId,
        ask: Decimal,
        bid: Decimal,
        check_tp: bool,
    ) -> Result<bool, SuperviseError> {
        let Some(record) = self.auto_exits.get(origin) else {
            return Ok(false);
        };
        let stoploss = record.stoploss;
        let takeprofit = record.takeprofit;
        let tp_allowed = record.check_tp;
        let tp_ids: Vec<OrderId> = record.tp_order_ids.iter().cloned().collect();

        let (direction, status, has_close, symbol) = {
            let Some(pack) = self.registry.get(origin) else {
                return Ok(false);
            };
            (
                pack.order.direction,
                pack.order.status,
                !pack.info.close_ids.is_empty(),
                pack.order.symbol.clone(),
            )
        };

        // Done: origin finished and everything it traded is closed.
        if status.is_finished() && has_close && self.registry.order_closed(origin)? {
            self.auto_exit_live.remove(origin);
            info!(
                "{} | {} closed, auto exit removed",
                self.current_time(),
                origin
            );
            return Ok(false);
        }

        if let Some(stoploss) = stoploss {
            let hit = match direction {
                Direction::Long => stoploss >= bid,
                Direction::Short => stoploss <= ask,
            };
            if hit {
                self.composory_close(origin)?;
                self.auto_exit_live.remove(origin);
                info!(
                    "{} | stoploss {} of {} triggered on ask {} / bid {}",
                    self.current_time(),
                    stoploss,
                    origin,
                    ask,
                    bid
                );
                return Ok(true);
            }
        }

        if check_tp {
            if let (Some(takeprofit), true) = (takeprofit, tp_allowed) {
                self.manage_take_profit(origin, &symbol, direction, takeprofit, &tp_ids)?;
            } else {
                // Side cleared or paused: pull whatever is still resting.
                for tp_id in &tp_ids {
                    let live = self
                        .registry
                        .get(tp_id)
                        .is_some_and(|p| !p.order.status.is_finished());
                    if live {
                        self.cancel_order(tp_id)?;
                    }
                }
            }
        }
        Ok(false)
    }

    fn manage_take_profit(
        &mut self,
        origin: &OrderId,
        symbol: &str,
        direction: Direction,
        takeprofit: Decimal,
        tp_ids: &[OrderId],
    ) -> Result<(), SuperviseError> {
        // Cancel resting take-profit children whose price no longer matches
        // the target; forget the ones that already finished.
        for tp_id in tp_ids {
            let Some(pack) = self.registry.get(tp_id) else {
                continue;
            };
            if pack.order.price == takeprofit {
                continue;
            }
            if pack.order.status.is_finished() {
                if let Some(record) = self.auto_exits.get_mut(origin) {
                    record.tp_order_ids.remove(tp_id);
                }
                continue;
            }
            info!(
                "{} | cancel stale takeprofit {} (price {} != target {}) for {}",
                self.current_time(),
                tp_id,
                pack.order.price,
                takeprofit,
                origin
            );
            self.cancel_order(tp_id)?;
        }

        let unlocked = self.registry.unlocked_volume(origin)?;
        let close_command = OrderCommand::close_of(direction);
        if unlocked > Decimal::ZERO
            && self.is_pending_price_valid(close_command, symbol, takeprofit)
        {
            info!(
                "{} | send takeprofit close (volume {}) for {}",
                self.current_time(),
                unlocked,
                origin
            );
            let ids = self.close_order(origin, takeprofit, Some(unlocked), false)?;
            for id in &ids {
                if let Some(record) = self.auto_exits.get_mut(origin) {
                    record.tp_order_ids.insert(id.clone());
                }
                if let Some(pack) = self.registry.get_mut(id) {
                    pack.info.take_profit_origin = Some(origin.clone());
                    pack.add_track(TrackTag::TakeProfit);
                }
            }
        }
        Ok(())
    }

    /// Callback of take-profit children: forget finished ones, and pause
    /// take-profit re-issuing when the exchange cancelled the pending order
    /// on its own; resending would just spin against the venue.
    pub(crate) fn on_take_profit_pending(&mut self, id: &OrderId) {
        let (finished, cancelled, operator_cancel, origin) = {
            let Some(pack) = self.registry.get(id) else {
                return;
            };
            let Some(origin) = pack.info.take_profit_origin.clone() else {
                return;
            };
            (
                pack.order.status.is_finished(),
                pack.order.status == OrderStatus::Cancelled,
                pack.info.cancel_requested,
                origin,
            )
        };
        if !finished {
            return;
        }
        let now = self.current_time();
        let Some(record) = self.auto_exits.get_mut(&origin) else {
            return;
        };
        info!("{} | takeprofit pending order {} finished", now, id);
        record.tp_order_ids.remove(id);
        if cancelled && !operator_cancel {
            record.check_tp = false;
            warn!(
                "{} | takeprofit order {} cancelled by the exchange, pausing takeprofit for {}",
                now, id, origin
            );
        }
    }

    /// Run every armed auto-exit record of `symbol` against the current
    /// ask/bid. Without a tick, the bar's high/low stand in. `check_tp`
    /// additionally manages take-profit pendings (see `check_take_profit`).
    pub fn check_auto_exit(&mut self, symbol: &str, check_tp: bool) -> Result<(), SuperviseError> {
        let Some((ask, bid)) = self.market.ask_bid(symbol) else {
            return Ok(());
        };
        let origins: Vec<OrderId> = self.auto_exit_live.iter().cloned().collect();
        for origin in origins {
            let matches = self
                .registry
                .get(&origin)
                .is_some_and(|p| p.order.symbol == symbol);
            if matches {
                self.exec_auto_exit(&origin, ask, bid, check_tp)?;
            }
        }
        Ok(())
    }

    /// Take-profit evaluation pass. Callers decide how often to run it,
    /// typically less frequently than the stop-loss scan.
    pub fn check_take_profit(&mut self, symbol: &str) -> Result<(), SuperviseError> {
        self.check_auto_exit(symbol, true)
    }

    // ------------------------------------------------------------------
    // Conditional close
    // ------------------------------------------------------------------

    /// Schedule a close of the open pack `expire` from now.
    ///
    /// With a `target_profit`, the deadline arms a stop-loss at
    /// `price_avg * (1 + direction * target_profit)` instead of closing
    /// outright; a negative target bounds the acceptable loss.
    pub fn set_conditional_close(
        &mut self,
        open_id: &OrderId,
        expire: Duration,
        target_profit: Option<Decimal>,
    ) -> Result<(), SuperviseError> {
        if !self.registry.contains(open_id) {
            return Err(SuperviseError::UnknownOrder(open_id.clone()));
        }
        let record = ConditionalOrderClose::new(
            open_id.clone(),
            self.current_time() + expire,
            target_profit,
        );
        info!("{} | {} | set conditional close", self.current_time(), record);
        self.conditional_closes.insert(open_id.clone(), record);
        Ok(())
    }

    /// Sweep due conditional closes.
    ///
    /// A still-live origin is cancelled and the record kept, so the next
    /// sweep handles the then-terminal pack. Terminal-with-zero-fill
    /// records are dropped silently.
    pub fn check_conditional_close(&mut self) -> Result<(), SuperviseError> {
        let now = self.current_time();
        let due: Vec<(OrderId, Option<Decimal>)> = self
            .conditional_closes
            .iter()
            .filter(|(_, record)| now >= record.expire_at)
            .map(|(id, record)| (id.clone(), record.target_profit))
            .collect();

        for (origin, target_profit) in due {
            let Some((status, traded, direction, symbol)) = self.registry.get(&origin).map(|p| {
                (
                    p.order.status,
                    p.order.traded_volume,
                    p.order.direction,
                    p.order.symbol.clone(),
                )
            }) else {
                self.conditional_closes.remove(&origin);
                continue;
            };

            if !status.is_finished() {
                info!(
                    "{} | conditional close: open order {} still live, cancelling",
                    now, origin
                );
                self.cancel_order(&origin)?;
                continue;
            }

            if traded == Decimal::ZERO {
                info!(
                    "{} | conditional close: {} never traded, nothing to do",
                    now, origin
                );
                self.conditional_closes.remove(&origin);
                continue;
            }

            match target_profit {
                None => {
                    info!(
                        "{} | conditional close: time limit reached, closing {}",
                        now, origin
                    );
                    self.composory_close(&origin)?;
                }
                Some(target) => {
                    let Some(price_avg) = self.registry.traded_price_avg(&origin) else {
                        warn!(
                            "{} | conditional close: no average price for {}, closing outright",
                            now, origin
                        );
                        self.composory_close(&origin)?;
                        self.conditional_closes.remove(&origin);
                        continue;
                    };
                    let stoploss = price_avg * (Decimal::ONE + direction.sign() * target);
                    self.set_auto_exit(&origin, Some(stoploss), None, false)?;
                    info!(
                        "{} | conditional close: stoploss for {} armed at {} (avg {})",
                        now, origin, stoploss, price_avg
                    );
                    // The level may already be through; check immediately
                    // with the current price on both sides.
                    if let Some(current) = self.market.current_price(&symbol) {
                        self.exec_auto_exit(&origin, current, current, false)?;
                    }
                }
            }
            self.conditional_closes.remove(&origin);
        }
        Ok(())
    }
}
