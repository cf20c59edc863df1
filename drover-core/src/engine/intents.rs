//! Intent operations: everything that turns a strategy-level wish into
//! primitive orders, plus the per-event callbacks those primitives carry.

use super::{OrderSupervisor, Strategy};
use crate::core::errors::SuperviseError;
use crate::core::types::{
    Direction, Offset, OrderCommand, OrderId, OrderSnapshot, OrderStatus, PriceType,
};
use crate::execution::{ExecutionMode, Gateway, OrderRequest};
use crate::orders::{AssembleSlot, OrderPack, PackInfo, TrackTag};
use crate::supervise::{
    AssembleOrderInfo, AssembleRole, ComposoryOrderInfo, DepthOrderInfo, RecordId,
    RependingOrderInfo, StepOrderInfo, TimeLimitOrderInfo,
};
use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

impl<G: Gateway, S: Strategy> OrderSupervisor<G, S> {
    // ------------------------------------------------------------------
    // Primitive submission
    // ------------------------------------------------------------------

    /// Submit one primitive order and register a pack per gateway id.
    ///
    /// The synthetic Init snapshot carries the requested fields so volume
    /// accounting works before the first gateway report.
    pub fn make_order(
        &mut self,
        command: OrderCommand,
        symbol: &str,
        price: Decimal,
        volume: Decimal,
        price_type: PriceType,
        stop: bool,
    ) -> Result<Vec<OrderId>, SuperviseError> {
        self.make_order_with_info(
            command,
            symbol,
            price,
            volume,
            price_type,
            stop,
            PackInfo::default(),
        )
    }

    /// `make_order` with caller-provided supervision slots merged into each
    /// new pack.
    pub fn make_order_with_info(
        &mut self,
        command: OrderCommand,
        symbol: &str,
        price: Decimal,
        volume: Decimal,
        price_type: PriceType,
        stop: bool,
        info: PackInfo,
    ) -> Result<Vec<OrderId>, SuperviseError> {
        let volume = self.config.round_volume(volume);
        if volume <= Decimal::ZERO {
            return Err(SuperviseError::InvalidVolume(volume));
        }
        let price = self.adjust_price(symbol, price, "send order");
        if price <= Decimal::ZERO {
            return Err(SuperviseError::InvalidPrice(price));
        }

        let request = OrderRequest {
            command,
            symbol: symbol.to_string(),
            price,
            volume,
            price_type,
            stop,
        };
        let ids = self.gateway.send_order(&request)?;
        debug!(
            "{} | make order: {} {} @ {} volume {}",
            self.current_time(),
            command,
            symbol,
            price,
            volume
        );

        let now = self.current_time();
        for id in &ids {
            let snapshot =
                OrderSnapshot::init(id.clone(), symbol, command, price, price_type, volume, now);
            let mut pack = OrderPack::new(snapshot);
            pack.info = info.clone();
            self.registry.insert(pack);
        }
        Ok(ids)
    }

    /// Close an open pack with a limit order, capped at its unlocked volume.
    ///
    /// Every resulting pack is linked to the open pack. With `cover` set,
    /// live close orders already linked to the pack are repended at the new
    /// price so the whole close interest converges on it.
    pub fn close_order(
        &mut self,
        open_id: &OrderId,
        price: Decimal,
        volume: Option<Decimal>,
        cover: bool,
    ) -> Result<Vec<OrderId>, SuperviseError> {
        let (command, symbol, close_ids) = {
            let pack = self
                .registry
                .get(open_id)
                .ok_or_else(|| SuperviseError::UnknownOrder(open_id.clone()))?;
            if pack.order.offset != Offset::Open {
                return Err(SuperviseError::NotOpenOrder {
                    id: open_id.clone(),
                    offset: pack.order.offset,
                });
            }
            (
                OrderCommand::close_of(pack.order.direction),
                pack.order.symbol.clone(),
                pack.info.close_ids.clone(),
            )
        };

        let unlocked = self.registry.unlocked_volume(open_id)?;
        let volume = match volume {
            None => unlocked,
            Some(v) if v > unlocked => unlocked,
            Some(v) => v,
        };

        let ids = if volume > Decimal::ZERO {
            info!(
                "{} | close order {} | send {} volume {}",
                self.current_time(),
                open_id,
                command,
                volume
            );
            let ids = self.make_order(command, &symbol, price, volume, PriceType::Limit, false)?;
            for id in &ids {
                self.registry.link(open_id, id)?;
            }
            ids
        } else {
            warn!(
                "{} | close order {} | unlocked volume {} <= 0, nothing to do",
                self.current_time(),
                open_id,
                volume
            );
            Vec::new()
        };

        if cover {
            for close_id in close_ids {
                let live = self
                    .registry
                    .get(&close_id)
                    .is_some_and(|p| !p.order.status.is_finished());
                if live {
                    self.repend_order(&close_id, None, Some(price), None)?;
                }
            }
        }
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Time limit
    // ------------------------------------------------------------------

    /// One limit order, cancelled when `expire` elapses without a finish.
    pub fn time_limit_order(
        &mut self,
        command: OrderCommand,
        symbol: &str,
        price: Decimal,
        volume: Decimal,
        expire: Duration,
    ) -> Result<RecordId, SuperviseError> {
        let record = TimeLimitOrderInfo::new(symbol, command, price, volume, expire);
        self.send_time_limit(record)
    }

    pub(crate) fn send_time_limit(
        &mut self,
        mut record: TimeLimitOrderInfo,
    ) -> Result<RecordId, SuperviseError> {
        info!("{} | send {}", self.current_time(), record);
        let ids = self.make_order(
            record.command,
            &record.symbol,
            record.price,
            record.volume,
            PriceType::Limit,
            false,
        )?;
        let record_id = self.alloc_record_id();
        let expire_at = self.current_time() + record.expire;
        for id in &ids {
            record.orders.add(id.clone());
            if let Some(pack) = self.registry.get_mut(id) {
                pack.info.expire_at = Some(expire_at);
                pack.info.time_limit = Some(record_id);
                pack.add_track(TrackTag::TimeLimit);
            }
        }
        self.time_limits.insert(record_id, record);
        Ok(record_id)
    }

    pub(crate) fn on_time_limit_order(&mut self, id: &OrderId) -> Result<(), SuperviseError> {
        let now = self.current_time();
        let (finished, had_fill, expired, record_id) = {
            let Some(pack) = self.registry.get(id) else {
                return Ok(());
            };
            (
                pack.order.status.is_finished(),
                pack.order.has_fill(),
                pack.info.expire_at.is_some_and(|at| at <= now),
                pack.info.time_limit,
            )
        };
        let Some(record_id) = record_id else {
            return Ok(());
        };

        if finished {
            if let Some(record) = self.time_limits.get_mut(&record_id) {
                record.orders.finish(id, had_fill);
                info!("{} | time limit order finished | {} | order {}", now, record, id);
            }
        } else if expired {
            info!("{} | time limit exceeded, cancelling order {}", now, id);
            self.cancel_order(id)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Composory
    // ------------------------------------------------------------------

    /// Aggressive intent: cover `volume` by repeatedly sending limit orders
    /// priced at the daily band, resending on cancel/expiry until done.
    pub fn composory_order(
        &mut self,
        command: OrderCommand,
        symbol: &str,
        volume: Decimal,
        expire: Duration,
    ) -> Result<RecordId, SuperviseError> {
        let record = ComposoryOrderInfo::new(symbol, command, volume, expire);
        let record_id = self.alloc_record_id();
        self.composories.insert(record_id, record);
        self.composory_active.insert(record_id);
        self.send_composory(record_id)?;
        Ok(record_id)
    }

    /// Send one primitive covering the record's still-missing volume.
    ///
    /// Missing market data defers the send; the record stays active and the
    /// periodic sweep retries.
    pub(crate) fn send_composory(&mut self, record_id: RecordId) -> Result<(), SuperviseError> {
        let (symbol, command, target, expire, live, filled) = {
            let Some(record) = self.composories.get(&record_id) else {
                return Ok(());
            };
            (
                record.symbol.clone(),
                record.command,
                record.volume,
                record.expire,
                record.orders.live.clone(),
                record.orders.filled.clone(),
            )
        };

        let Some(price) = self.market.exec_price(&symbol, command.direction()) else {
            debug!(
                "{} | no market data for {}, composory send deferred",
                self.current_time(),
                symbol
            );
            return Ok(());
        };

        let locked = self.registry.sum_total_volume(live.iter());
        let filled = self.registry.sum_traded_volume(filled.iter());
        let volume = self.config.round_volume(target - locked - filled);
        if volume <= Decimal::ZERO {
            warn!(
                "{} | composory remaining volume {} <= 0, nothing to send",
                self.current_time(),
                volume
            );
            return Ok(());
        }

        info!(
            "{} | send composory {} {} volume {} @ {}",
            self.current_time(),
            command,
            symbol,
            volume,
            price
        );
        let ids = self.make_order(command, &symbol, price, volume, PriceType::Limit, false)?;
        let expire_at = self.current_time() + expire;
        for id in &ids {
            if let Some(record) = self.composories.get_mut(&record_id) {
                record.orders.add(id.clone());
            }
            if let Some(pack) = self.registry.get_mut(id) {
                pack.info.expire_at = Some(expire_at);
                pack.info.composory = Some(record_id);
                pack.add_track(TrackTag::Composory);
            }
        }
        self.composory_active.insert(record_id);
        Ok(())
    }

    /// Event/sweep callback for composory primitives. The event path
    /// (`repend = false`) only finalizes fills and cancels expired orders;
    /// the periodic path additionally resends after a cancel/rejection to
    /// cover the still-missing volume.
    pub(crate) fn on_composory_order(
        &mut self,
        id: &OrderId,
        repend: bool,
    ) -> Result<(), SuperviseError> {
        let now = self.current_time();
        let (status, had_fill, expired, record_id) = {
            let Some(pack) = self.registry.get(id) else {
                return Ok(());
            };
            (
                pack.order.status,
                pack.order.has_fill(),
                pack.info.expire_at.is_some_and(|at| at <= now),
                pack.info.composory,
            )
        };
        let Some(record_id) = record_id else {
            return Ok(());
        };

        if status == OrderStatus::AllTraded {
            if let Some(record) = self.composories.get_mut(&record_id) {
                record.orders.finish(id, had_fill);
                info!("{} | composory primitive {} fully traded | {}", now, id, record);
            }
        } else if !status.is_removed() {
            if expired {
                info!(
                    "{} | composory primitive {} expired, cancel and resend on next sweep",
                    now, id
                );
                self.cancel_order(id)?;
            }
        } else if repend {
            // A close-side composory stops once the open pack has no
            // unlocked volume left to flatten.
            if self.is_close_order(id) {
                if let Some(open_id) = self.registry.find_open_order(id) {
                    if self.registry.unlocked_volume(&open_id)? <= Decimal::ZERO {
                        return Ok(());
                    }
                }
            }
            if let Some(record) = self.composories.get_mut(&record_id) {
                record.orders.finish(id, had_fill);
            }
            self.send_composory(record_id)?;
            if self.is_close_order(id) {
                if let Some(open_id) = self.registry.find_open_order(id) {
                    let live: Vec<OrderId> = self
                        .composories
                        .get(&record_id)
                        .map(|r| r.orders.live.iter().cloned().collect())
                        .unwrap_or_default();
                    for new_id in &live {
                        self.registry.link(&open_id, new_id)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Convert an existing open pack to be closed aggressively.
    ///
    /// Cancels the open order if still live, marks the pack force-closed,
    /// and registers it in the per-(symbol, direction) close pool which the
    /// end-of-period sweep drains.
    pub fn composory_close(&mut self, open_id: &OrderId) -> Result<(), SuperviseError> {
        let (offset, status) = {
            let pack = self
                .registry
                .get(open_id)
                .ok_or_else(|| SuperviseError::UnknownOrder(open_id.clone()))?;
            (pack.order.offset, pack.order.status)
        };
        if offset != Offset::Open {
            return Err(SuperviseError::NotOpenOrder {
                id: open_id.clone(),
                offset,
            });
        }

        if !status.is_finished() {
            self.cancel_order(open_id)?;
        }
        self.add_composory_close_pool(open_id);
        if let Some(pack) = self.registry.get_mut(open_id) {
            pack.info.composory_closed = true;
        }
        info!(
            "{} | composory close set on {}",
            self.current_time(),
            open_id
        );
        Ok(())
    }

    /// Pool registration is keyed on the force-closed flag, so calling
    /// `composory_close` twice does not double-register.
    fn add_composory_close_pool(&mut self, open_id: &OrderId) {
        let Some(pack) = self.registry.get(open_id) else {
            return;
        };
        if pack.info.composory_closed {
            return;
        }
        let symbol = pack.order.symbol.clone();
        let direction = pack.order.direction;
        self.close_pools
            .entry(symbol)
            .or_default()
            .entry(direction)
            .or_default()
            .open_ids
            .insert(open_id.clone());
    }

    // ------------------------------------------------------------------
    // Repending
    // ------------------------------------------------------------------

    /// Replace an order: cancel it (if needed) and resend with adjusted
    /// volume/price once the cancellation lands. Returns `false` when the
    /// order was already fully traded and nothing was installed.
    ///
    /// `callback` overrides which supervision callback handles the
    /// replacement; the default is the standard repending handler.
    pub fn repend_order(
        &mut self,
        id: &OrderId,
        volume: Option<Decimal>,
        price: Option<Decimal>,
        callback: Option<TrackTag>,
    ) -> Result<bool, SuperviseError> {
        let status = self
            .registry
            .get(id)
            .ok_or_else(|| SuperviseError::UnknownOrder(id.clone()))?
            .order
            .status;
        if status == OrderStatus::AllTraded {
            return Ok(false);
        }

        let tag = callback.unwrap_or(TrackTag::Repending);
        if let Some(pack) = self.registry.get_mut(id) {
            pack.info.repending = Some(RependingOrderInfo::new(id.clone(), volume, price));
            pack.add_track(tag);
        }

        if status.is_removed() {
            // Already off the book; run the replacement immediately.
            self.dispatch(tag, id)?;
        } else {
            self.cancel_order(id)?;
        }
        Ok(true)
    }

    pub(crate) fn on_repending_order(&mut self, id: &OrderId) -> Result<(), SuperviseError> {
        let (status, remaining, command, symbol, requested_volume, requested_price) = {
            let Some(pack) = self.registry.get(id) else {
                return Ok(());
            };
            let Some(record) = &pack.info.repending else {
                return Ok(());
            };
            (
                pack.order.status,
                pack.order.remaining_volume(),
                pack.order.command(),
                pack.order.symbol.clone(),
                record.volume,
                record.price,
            )
        };
        if !status.is_removed() {
            return Ok(());
        }

        let mut volume = match requested_volume {
            Some(v) if v <= remaining => v,
            _ => remaining,
        };
        if volume <= Decimal::ZERO {
            return Ok(());
        }

        let mut new_ids: Vec<OrderId> = Vec::new();
        if self.is_close_order(id) {
            let Some(open_id) = self.registry.find_open_order(id) else {
                return Ok(());
            };
            let unlocked = self.registry.unlocked_volume(&open_id)?;
            if volume > unlocked {
                volume = unlocked;
            }
            if volume <= Decimal::ZERO {
                debug!(
                    "{} | repend of {} capped to zero by unlocked volume",
                    self.current_time(),
                    id
                );
                return Ok(());
            }
            if let Some(price) = requested_price {
                new_ids = self.close_order(&open_id, price, Some(volume), false)?;
            } else {
                let record_id =
                    self.composory_order(command, &symbol, volume, self.composory_expire())?;
                new_ids = self
                    .composories
                    .get(&record_id)
                    .map(|r| r.orders.live.iter().cloned().collect())
                    .unwrap_or_default();
                for new_id in &new_ids {
                    self.registry.link(&open_id, new_id)?;
                }
            }
        } else if let Some(price) = requested_price {
            new_ids = self.make_order(command, &symbol, price, volume, PriceType::Limit, false)?;
        } else {
            let record_id =
                self.composory_order(command, &symbol, volume, self.composory_expire())?;
            new_ids = self
                .composories
                .get(&record_id)
                .map(|r| r.orders.live.iter().cloned().collect())
                .unwrap_or_default();
        }

        if let Some(pack) = self.registry.get_mut(id) {
            if let Some(record) = pack.info.repending.as_mut() {
                record.repended.extend(new_ids.iter().cloned());
            }
        }
        if !new_ids.is_empty() {
            info!(
                "{} | repended {} into {:?}",
                self.current_time(),
                id,
                new_ids
            );
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Step / depth
    // ------------------------------------------------------------------

    /// Drip-feed `volume` in `step`-sized chunks until `expire` elapses,
    /// waiting at least `wait` between sends.
    ///
    /// In backtest mode the pacing cannot be simulated faithfully, so the
    /// whole volume degrades to a single time-limited submission.
    pub fn make_step_order(
        &mut self,
        command: OrderCommand,
        symbol: &str,
        price: Decimal,
        volume: Decimal,
        step: Decimal,
        expire: Duration,
        wait: Duration,
    ) -> Result<RecordId, SuperviseError> {
        let volume = self.config.round_volume(volume);
        let record_id = self.alloc_record_id();

        match self.mode() {
            ExecutionMode::Live => {
                let expire_at = self.current_time() + expire;
                let record =
                    StepOrderInfo::new(command, symbol, price, volume, step, expire_at, wait);
                self.step_orders
                    .entry(symbol.to_string())
                    .or_default()
                    .insert(record_id, record);
            }
            ExecutionMode::Backtest => {
                let tl = self.time_limit_order(command, symbol, price, volume, expire)?;
                let ids: Vec<OrderId> = self
                    .time_limits
                    .get(&tl)
                    .map(|r| r.orders.live.iter().cloned().collect())
                    .unwrap_or_default();
                for id in &ids {
                    if let Some(pack) = self.registry.get_mut(id) {
                        pack.info.step = Some(record_id);
                        pack.add_track(TrackTag::Step);
                    }
                }
            }
        }
        Ok(record_id)
    }

    pub(crate) fn exec_step_order(
        &mut self,
        symbol: &str,
        record_id: RecordId,
    ) -> Result<(), SuperviseError> {
        let now = self.current_time();
        let (command, price, target, step, expire_at, wait, locked) = {
            let Some(record) = self
                .step_orders
                .get(symbol)
                .and_then(|pool| pool.get(&record_id))
            else {
                return Ok(());
            };
            if !record.ready(now) {
                return Ok(());
            }
            let locked = self.config.round_volume(
                self.registry.sum_total_volume(record.orders.live.iter())
                    + self.registry.sum_traded_volume(record.orders.filled.iter()),
            );
            (
                record.command,
                record.price,
                record.volume,
                record.step,
                record.expire_at,
                record.wait,
                locked,
            )
        };

        if locked >= target {
            return Ok(());
        }
        let volume = if locked + step <= target {
            step
        } else {
            target - locked
        };
        let tl = self.time_limit_order(command, symbol, price, volume, expire_at - now)?;
        let ids: Vec<OrderId> = self
            .time_limits
            .get(&tl)
            .map(|r| r.orders.live.iter().cloned().collect())
            .unwrap_or_default();
        for id in &ids {
            if let Some(pack) = self.registry.get_mut(id) {
                pack.info.step = Some(record_id);
                pack.add_track(TrackTag::Step);
            }
        }
        if let Some(record) = self
            .step_orders
            .get_mut(symbol)
            .and_then(|pool| pool.get_mut(&record_id))
        {
            for id in ids {
                record.orders.add(id);
            }
            record.next_send_at = now + wait;
        }
        Ok(())
    }

    pub(crate) fn on_step_order(&mut self, id: &OrderId) {
        let (finished, had_fill, record_id, symbol) = {
            let Some(pack) = self.registry.get(id) else {
                return;
            };
            (
                pack.order.status.is_finished(),
                pack.order.has_fill(),
                pack.info.step,
                pack.order.symbol.clone(),
            )
        };
        let Some(record_id) = record_id else {
            return;
        };
        if !finished {
            return;
        }

        let idle = {
            let Some(record) = self
                .step_orders
                .get_mut(&symbol)
                .and_then(|pool| pool.get_mut(&record_id))
            else {
                return;
            };
            record.orders.finish(id, had_fill);
            record.orders.is_idle()
        };
        if idle {
            let done = {
                let Some(record) = self
                    .step_orders
                    .get(&symbol)
                    .and_then(|pool| pool.get(&record_id))
                else {
                    return;
                };
                let traded = self
                    .registry
                    .sum_traded_volume(record.orders.filled.iter());
                self.config.round_volume(traded) == record.volume
            };
            if done {
                if let Some(pool) = self.step_orders.get_mut(&symbol) {
                    pool.remove(&record_id);
                }
            }
        }
    }

    /// Like `make_step_order`, but each chunk is sized from the executable
    /// portion of the first `depth` opposite book levels.
    pub fn make_depth_order(
        &mut self,
        command: OrderCommand,
        symbol: &str,
        price: Decimal,
        volume: Decimal,
        depth: usize,
        expire: Duration,
        wait: Duration,
    ) -> Result<RecordId, SuperviseError> {
        let volume = self.config.round_volume(volume);
        let record_id = self.alloc_record_id();

        match self.mode() {
            ExecutionMode::Live => {
                let expire_at = self.current_time() + expire;
                let record =
                    DepthOrderInfo::new(command, symbol, price, volume, depth, expire_at, wait);
                self.depth_orders
                    .entry(symbol.to_string())
                    .or_default()
                    .insert(record_id, record);
            }
            ExecutionMode::Backtest => {
                let tl = self.time_limit_order(command, symbol, price, volume, expire)?;
                let ids: Vec<OrderId> = self
                    .time_limits
                    .get(&tl)
                    .map(|r| r.orders.live.iter().cloned().collect())
                    .unwrap_or_default();
                for id in &ids {
                    if let Some(pack) = self.registry.get_mut(id) {
                        pack.info.depth = Some(record_id);
                        pack.add_track(TrackTag::Depth);
                    }
                }
            }
        }
        Ok(record_id)
    }

    pub(crate) fn exec_depth_order(
        &mut self,
        symbol: &str,
        record_id: RecordId,
    ) -> Result<(), SuperviseError> {
        let now = self.current_time();
        let (command, price, expire_at, wait, executable) = {
            let Some(record) = self
                .depth_orders
                .get(symbol)
                .and_then(|pool| pool.get(&record_id))
            else {
                return Ok(());
            };
            if !record.ready(now) {
                return Ok(());
            }
            let locked = self.config.round_volume(
                self.registry.sum_total_volume(record.orders.live.iter())
                    + self.registry.sum_traded_volume(record.orders.filled.iter()),
            );
            let unlocked = self.config.round_volume(record.volume - locked);
            if unlocked <= Decimal::ZERO {
                return Ok(());
            }
            let Some(tick) = self.market.tick(symbol) else {
                return Ok(());
            };
            let ladder = match record.command.direction() {
                Direction::Long => &tick.asks,
                Direction::Short => &tick.bids,
            };
            // Walk best-first, stop at the first level that would not
            // execute against the record's limit, cap at unlocked.
            let mut executable = Decimal::ZERO;
            for level in ladder.iter().take(record.depth) {
                if record.is_price_executable(level.price) {
                    executable += level.volume;
                    if executable > unlocked {
                        executable = unlocked;
                        break;
                    }
                } else {
                    break;
                }
            }
            (
                record.command,
                record.price,
                record.expire_at,
                record.wait,
                executable,
            )
        };

        if executable <= Decimal::ZERO {
            return Ok(());
        }
        let tl = self.time_limit_order(command, symbol, price, executable, expire_at - now)?;
        let ids: Vec<OrderId> = self
            .time_limits
            .get(&tl)
            .map(|r| r.orders.live.iter().cloned().collect())
            .unwrap_or_default();
        for id in &ids {
            if let Some(pack) = self.registry.get_mut(id) {
                pack.info.depth = Some(record_id);
                pack.add_track(TrackTag::Depth);
            }
        }
        if let Some(record) = self
            .depth_orders
            .get_mut(symbol)
            .and_then(|pool| pool.get_mut(&record_id))
        {
            for id in ids {
                record.orders.add(id);
            }
            record.next_send_at = now + wait;
        }
        Ok(())
    }

    pub(crate) fn on_depth_order(&mut self, id: &OrderId) {
        let (finished, had_fill, record_id, symbol) = {
            let Some(pack) = self.registry.get(id) else {
                return;
            };
            (
                pack.order.status.is_finished(),
                pack.order.has_fill(),
                pack.info.depth,
                pack.order.symbol.clone(),
            )
        };
        let Some(record_id) = record_id else {
            return;
        };
        if !finished {
            return;
        }
        if let Some(record) = self
            .depth_orders
            .get_mut(&symbol)
            .and_then(|pool| pool.get_mut(&record_id))
        {
            record.orders.finish(id, had_fill);
        }
    }

    // ------------------------------------------------------------------
    // Split / assemble
    // ------------------------------------------------------------------

    /// Partition a terminal pack's filled volume into synthetic child packs.
    ///
    /// Children are registered with AllTraded snapshots and never touch the
    /// gateway; any filled volume beyond the requested splits becomes a
    /// final overflow child. Returns the child ids (empty when the pack is
    /// not terminal).
    pub fn split_order(
        &mut self,
        id: &OrderId,
        volumes: &[Decimal],
    ) -> Result<Vec<OrderId>, SuperviseError> {
        let origin = {
            let pack = self
                .registry
                .get(id)
                .ok_or_else(|| SuperviseError::UnknownOrder(id.clone()))?;
            if !pack.order.status.is_finished() {
                return Ok(Vec::new());
            }
            pack.order.clone()
        };

        let record_id = self.alloc_record_id();
        let mut record = AssembleOrderInfo::new(id.clone());
        let mut remaining = origin.traded_volume;
        let mut children = Vec::new();

        for &requested in volumes {
            if remaining <= Decimal::ZERO {
                break;
            }
            let volume = if remaining < requested {
                remaining
            } else {
                requested
            };
            children.push(self.register_split_child(&origin, children.len(), volume, record_id));
            remaining = self.config.round_volume(remaining - volume);
        }
        if remaining > Decimal::ZERO {
            children.push(self.register_split_child(
                &origin,
                children.len(),
                remaining,
                record_id,
            ));
        }

        for child in &children {
            record.children.insert(child.clone());
        }
        self.assembles.insert(record_id, record);
        if let Some(pack) = self.registry.get_mut(id) {
            pack.info.assemble = Some(AssembleSlot {
                record: record_id,
                role: AssembleRole::Origin,
            });
        }
        info!(
            "{} | split {} into {} children",
            self.current_time(),
            id,
            children.len()
        );
        Ok(children)
    }

    fn register_split_child(
        &mut self,
        origin: &OrderSnapshot,
        index: usize,
        volume: Decimal,
        record_id: RecordId,
    ) -> OrderId {
        let child_id = origin.id.child(index);
        let snapshot = OrderSnapshot {
            id: child_id.clone(),
            symbol: origin.symbol.clone(),
            direction: origin.direction,
            offset: origin.offset,
            price: origin.price,
            price_type: origin.price_type,
            total_volume: volume,
            traded_volume: volume,
            price_avg: origin.price_avg,
            status: OrderStatus::AllTraded,
            datetime: self.current_time(),
        };
        let mut pack = OrderPack::new(snapshot);
        pack.info.assemble = Some(AssembleSlot {
            record: record_id,
            role: AssembleRole::Child,
        });
        self.registry.insert(pack);
        child_id
    }
}
