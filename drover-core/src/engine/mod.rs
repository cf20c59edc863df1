//! The order supervision engine.
//!
//! [`OrderSupervisor`] multiplexes the supervision state machines over one
//! registry of primitive orders. The surrounding strategy harness feeds it
//! events (`on_tick` / `on_bar` / `on_order` / `on_trade`) and clocks it
//! through the period hooks; the engine drives the gateway in response.
//!
//! The engine is single-threaded cooperative: every entry point runs to
//! completion before the next begins, so there are no locks and callbacks
//! observe events exactly in gateway delivery order.
//!
//! Module split: intent operations live in `intents`, stop-loss /
//! take-profit / scheduled-close handling in `exits`, the periodic pool
//! sweeps in `periodic`.

mod exits;
mod intents;
mod periodic;

use crate::config::SupervisorConfig;
use crate::core::errors::SuperviseError;
use crate::core::types::{
    Direction, Offset, OrderCommand, OrderId, OrderSnapshot, OrderStatus, TradeFill,
};
use crate::execution::{ExecutionMode, Gateway};
use crate::market::{Bar, MarketCache, Tick};
use crate::orders::{OrderPack, OrderRegistry, TrackTag};
use crate::supervise::{
    AssembleOrderInfo, AssembleRole, AutoExitInfo, ComposoryClosePool, ComposoryOrderInfo,
    ConditionalOrderClose, DepthOrderInfo, RecordId, StepOrderInfo, TimeLimitOrderInfo,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

/// Strategy-side hooks.
///
/// `on_order_pack` is the user hook invoked after the supervision callbacks
/// of every order event; `maximum_order_volume` is the sizing extension
/// point (`None` = unbounded, the default).
pub trait Strategy {
    fn on_order_pack(&mut self, pack: &OrderPack) {
        let _ = pack;
    }

    fn maximum_order_volume(
        &self,
        symbol: &str,
        command: OrderCommand,
        price: Option<Decimal>,
    ) -> Option<Decimal> {
        let _ = (symbol, command, price);
        None
    }
}

/// No-op strategy for harnesses that only want the supervision machinery.
impl Strategy for () {}

pub struct OrderSupervisor<G: Gateway, S: Strategy> {
    gateway: G,
    strategy: S,
    mode: ExecutionMode,
    config: SupervisorConfig,
    registry: OrderRegistry,
    market: MarketCache,
    /// Last market data timestamp; the clock in backtest mode.
    sim_time: DateTime<Utc>,
    next_record_id: u64,

    time_limits: BTreeMap<RecordId, TimeLimitOrderInfo>,
    /// Composory records are kept for the session (close pools keep reading
    /// them); `composory_active` is the subset the sweep still drives.
    composories: BTreeMap<RecordId, ComposoryOrderInfo>,
    composory_active: BTreeSet<RecordId>,
    step_orders: HashMap<String, BTreeMap<RecordId, StepOrderInfo>>,
    depth_orders: HashMap<String, BTreeMap<RecordId, DepthOrderInfo>>,
    conditional_closes: BTreeMap<OrderId, ConditionalOrderClose>,
    /// All auto-exit records by origin; `auto_exit_live` is the armed subset
    /// scanned on ticks/bars.
    auto_exits: BTreeMap<OrderId, AutoExitInfo>,
    auto_exit_live: BTreeSet<OrderId>,
    close_pools: HashMap<String, BTreeMap<Direction, ComposoryClosePool>>,
    assembles: BTreeMap<RecordId, AssembleOrderInfo>,
}

impl<G: Gateway, S: Strategy> OrderSupervisor<G, S> {
    pub fn new(gateway: G, strategy: S, mode: ExecutionMode) -> Self {
        Self::with_config(gateway, strategy, mode, SupervisorConfig::default())
            .expect("default config is valid")
    }

    pub fn with_config(
        gateway: G,
        strategy: S,
        mode: ExecutionMode,
        config: SupervisorConfig,
    ) -> Result<Self, SuperviseError> {
        config.validate().map_err(SuperviseError::Config)?;
        let registry = OrderRegistry::new(config.volume_ndigits);
        Ok(Self {
            gateway,
            strategy,
            mode,
            config,
            registry,
            market: MarketCache::new(),
            sim_time: DateTime::<Utc>::UNIX_EPOCH,
            next_record_id: 0,
            time_limits: BTreeMap::new(),
            composories: BTreeMap::new(),
            composory_active: BTreeSet::new(),
            step_orders: HashMap::new(),
            depth_orders: HashMap::new(),
            conditional_closes: BTreeMap::new(),
            auto_exits: BTreeMap::new(),
            auto_exit_live: BTreeSet::new(),
            close_pools: HashMap::new(),
            assembles: BTreeMap::new(),
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    pub fn market(&self) -> &MarketCache {
        &self.market
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn pack(&self, id: &OrderId) -> Option<&OrderPack> {
        self.registry.get(id)
    }

    pub fn time_limit_record(&self, id: RecordId) -> Option<&TimeLimitOrderInfo> {
        self.time_limits.get(&id)
    }

    pub fn composory_record(&self, id: RecordId) -> Option<&ComposoryOrderInfo> {
        self.composories.get(&id)
    }

    pub fn step_record(&self, symbol: &str, id: RecordId) -> Option<&StepOrderInfo> {
        self.step_orders.get(symbol).and_then(|pool| pool.get(&id))
    }

    pub fn depth_record(&self, symbol: &str, id: RecordId) -> Option<&DepthOrderInfo> {
        self.depth_orders.get(symbol).and_then(|pool| pool.get(&id))
    }

    pub fn auto_exit_record(&self, origin: &OrderId) -> Option<&AutoExitInfo> {
        self.auto_exits.get(origin)
    }

    pub fn conditional_close_record(&self, origin: &OrderId) -> Option<&ConditionalOrderClose> {
        self.conditional_closes.get(origin)
    }

    pub fn assemble_record(&self, id: RecordId) -> Option<&AssembleOrderInfo> {
        self.assembles.get(&id)
    }

    pub fn close_pool(&self, symbol: &str, direction: Direction) -> Option<&ComposoryClosePool> {
        self.close_pools
            .get(symbol)
            .and_then(|pools| pools.get(&direction))
    }

    /// Current time: wall clock in live mode, last market data timestamp in
    /// backtest. All expiration arithmetic goes through here.
    pub fn current_time(&self) -> DateTime<Utc> {
        match self.mode {
            ExecutionMode::Live => Utc::now(),
            ExecutionMode::Backtest => self.sim_time,
        }
    }

    pub(crate) fn composory_expire(&self) -> Duration {
        Duration::seconds(self.config.composory_expire_secs)
    }

    pub(crate) fn alloc_record_id(&mut self) -> RecordId {
        self.next_record_id += 1;
        RecordId(self.next_record_id)
    }

    // ------------------------------------------------------------------
    // Event entry points
    // ------------------------------------------------------------------

    pub fn on_tick(&mut self, tick: Tick) {
        self.sim_time = tick.datetime;
        self.market.update_tick(tick);
    }

    pub fn on_bar(&mut self, bar: Bar) {
        self.sim_time = bar.datetime;
        self.market.update_bar(bar);
    }

    pub fn on_trade(&mut self, fill: TradeFill) {
        self.registry.record_trade(fill);
    }

    /// Deliver an order snapshot from the gateway.
    ///
    /// Unknown ids belong to other strategies on a shared gateway and are
    /// dropped silently; snapshots for a pack already past its terminal
    /// event are dropped too. Otherwise the snapshot replaces the pack's
    /// state, the tracked supervision callbacks run in insertion order, the
    /// strategy hook runs last, and a terminal status finally seals the
    /// pack, so each callback sees its terminal event exactly once.
    pub fn on_order(&mut self, order: OrderSnapshot) -> Result<(), SuperviseError> {
        if order.status == OrderStatus::Unknown {
            warn!("order {} reported UNKNOWN status: {:?}", order.id, order);
        }

        let id = order.id.clone();
        {
            let Some(pack) = self.registry.get_mut(&id) else {
                return Ok(());
            };
            if pack.info.finished {
                return Ok(());
            }
            if order.status.rank() < pack.order.status.rank()
                || order.traded_volume < pack.order.traded_volume
            {
                warn!(
                    "stale snapshot for {} dropped ({} {} after {} {})",
                    id,
                    order.status,
                    order.traded_volume,
                    pack.order.status,
                    pack.order.traded_volume
                );
                return Ok(());
            }
            pack.order = order;
        }

        let tracks = self
            .registry
            .get(&id)
            .map(|pack| pack.tracks.clone())
            .unwrap_or_default();
        for tag in tracks {
            self.dispatch(tag, &id)?;
        }

        if let Some(pack) = self.registry.get(&id) {
            self.strategy.on_order_pack(pack);
        }

        if let Some(pack) = self.registry.get_mut(&id) {
            if pack.order.status.is_finished() {
                pack.info.finished = true;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, tag: TrackTag, id: &OrderId) -> Result<(), SuperviseError> {
        match tag {
            TrackTag::TimeLimit => self.on_time_limit_order(id),
            TrackTag::Composory => self.on_composory_order(id, false),
            TrackTag::Repending => self.on_repending_order(id),
            TrackTag::TakeProfit => {
                self.on_take_profit_pending(id);
                Ok(())
            }
            TrackTag::Step => {
                self.on_step_order(id);
                Ok(())
            }
            TrackTag::Depth => {
                self.on_depth_order(id);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Gateway plumbing
    // ------------------------------------------------------------------

    /// Request cancellation. The pack is tagged so later callbacks can tell
    /// operator cancels from exchange-initiated ones; it does not count as
    /// cancelled until the gateway confirms through `on_order`.
    pub fn cancel_order(&mut self, id: &OrderId) -> Result<(), SuperviseError> {
        if let Some(pack) = self.registry.get_mut(id) {
            pack.info.cancel_requested = true;
        }
        self.gateway.cancel_order(id)?;
        Ok(())
    }

    /// Round a price to the contract tick, warning when the rounded price
    /// differs from the requested one.
    pub fn adjust_price(&self, symbol: &str, price: Decimal, tag: &str) -> Decimal {
        let tick = self.gateway.contract(symbol).map(|c| c.price_tick);
        let result = self.gateway.round_to_price_tick(tick, price);
        if result != price {
            warn!("adjust price | {} | {} => {} | {}", symbol, price, result, tag);
        }
        result
    }

    /// Drop a pack from the registry. Callers own the consequences; the
    /// default is to keep packs for the whole session.
    pub fn remove_order_pack(&mut self, id: &OrderId) -> bool {
        self.registry.remove(id).is_some()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn order_closed_volume(&self, id: &OrderId) -> Result<Decimal, SuperviseError> {
        self.registry.closed_volume(id)
    }

    pub fn order_locked_volume(&self, id: &OrderId) -> Result<Decimal, SuperviseError> {
        self.registry.locked_volume(id)
    }

    pub fn order_unlocked_volume(&self, id: &OrderId) -> Result<Decimal, SuperviseError> {
        self.registry.unlocked_volume(id)
    }

    pub fn order_closed(&self, id: &OrderId) -> Result<bool, SuperviseError> {
        self.registry.order_closed(id)
    }

    pub fn find_open_order(&self, close_id: &OrderId) -> Option<OrderId> {
        self.registry.find_open_order(close_id)
    }

    pub fn list_close_orders(&self, open_id: &OrderId) -> Vec<OrderId> {
        self.registry.list_close_orders(open_id)
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    pub fn is_composory(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|p| p.info.composory.is_some())
    }

    pub fn is_time_limit(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|p| p.info.time_limit.is_some())
    }

    pub fn is_auto_exit(&self, id: &OrderId) -> bool {
        self.auto_exits.contains_key(id)
    }

    pub fn is_closing_pending(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|p| !p.info.close_ids.is_empty())
    }

    pub fn is_assembled(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|p| p.info.assemble.is_some())
    }

    pub fn is_assemble_origin(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .and_then(|p| p.info.assemble)
            .is_some_and(|slot| slot.role == AssembleRole::Origin)
    }

    pub fn is_assemble_child(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .and_then(|p| p.info.assemble)
            .is_some_and(|slot| slot.role == AssembleRole::Child)
    }

    pub fn is_close_order(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|p| p.order.offset == Offset::Close && p.info.open_id.is_some())
    }

    pub fn has_close_order(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|p| p.order.offset == Offset::Open && !p.info.close_ids.is_empty())
    }

    pub fn is_cancel(&self, id: &OrderId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|p| p.info.cancel_requested)
    }

    /// Whether a resting close at `price` stays inside the exchange's
    /// allowed pending band around the current price.
    pub fn is_pending_price_valid(
        &self,
        command: OrderCommand,
        symbol: &str,
        price: Decimal,
    ) -> bool {
        let Some(current) = self.market.current_price(symbol) else {
            return false;
        };
        match command.direction() {
            Direction::Long => current * self.config.pending_band_up >= price,
            Direction::Short => current * self.config.pending_band_down <= price,
        }
    }

    /// Volume sanity check against the strategy's sizing limit.
    pub fn is_order_volume_valid(
        &self,
        symbol: &str,
        command: OrderCommand,
        volume: Decimal,
        price: Option<Decimal>,
    ) -> bool {
        if volume <= Decimal::ZERO {
            return false;
        }
        match self.strategy.maximum_order_volume(symbol, command, price) {
            None => true,
            Some(max) => max >= volume,
        }
    }
}
