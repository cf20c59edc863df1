//! Drover Core - Order Execution Supervision for Algorithmic Trading
//!
//! Drover sits between a strategy's trading intent ("buy 10 within 5
//! seconds, then trail a 2% stop-loss") and a low-level exchange gateway
//! that only accepts single primitive orders. It translates intents into
//! sequences of primitive limit orders, tracks each order's lifecycle, and
//! drives compensating actions (cancel, resend, convert to aggressive,
//! split, stop out) until every intent is satisfied or abandoned.
//!
//! ## Architecture
//! - **Single-threaded cooperative**: all entry points are invoked serially
//!   by the strategy harness; no locks, no suspension points
//! - **Arena-and-index**: packs own nothing but their own state; every
//!   cross-reference is an id resolved through the registry
//! - **Static dispatch**: supervision callbacks are an enum matched in the
//!   engine, invoked in track insertion order per event
//! - **Injected mode**: live vs backtest is a constructor parameter that
//!   selects the clock source and the step/depth degradation
//!
//! ## Core Modules
//! - `core`: order ids, command/direction/offset/status enums, snapshots
//! - `market`: tick/bar types and the per-symbol last-value cache
//! - `execution`: the `Gateway` trait and the scripted `SimGateway`
//! - `orders`: `OrderPack` bookkeeping and the registry with linking and
//!   closed/locked/unlocked volume accounting
//! - `supervise`: one record type per task (time-limit, composory, step,
//!   depth, repending, auto-exit, conditional close, assemble)
//! - `engine`: `OrderSupervisor`, the event pump and periodic driver

pub mod config;
pub mod core;
pub mod engine;
pub mod execution;
pub mod market;
pub mod orders;
pub mod supervise;
pub mod testing;
pub mod utils;

pub use crate::config::SupervisorConfig;
pub use crate::core::{
    Direction, Offset, OrderCommand, OrderId, OrderSnapshot, OrderStatus, PriceType,
    SuperviseError, TradeFill, TradeId,
};
pub use crate::engine::{OrderSupervisor, Strategy};
pub use crate::execution::{ContractInfo, ExecutionMode, Gateway, OrderRequest, SimGateway};
pub use crate::market::{Bar, DepthLevel, MarketCache, Tick};
pub use crate::orders::{OrderPack, OrderRegistry, PackInfo, TrackTag};
pub use crate::supervise::RecordId;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::SupervisorConfig;
    pub use crate::core::{
        Direction, Offset, OrderCommand, OrderId, OrderSnapshot, OrderStatus, PriceType,
        SuperviseError, TradeFill, TradeId,
    };
    pub use crate::engine::{OrderSupervisor, Strategy};
    pub use crate::execution::{ContractInfo, ExecutionMode, Gateway, OrderRequest, SimGateway};
    pub use crate::market::{Bar, DepthLevel, MarketCache, Tick};
    pub use crate::orders::{OrderPack, TrackTag};
    pub use crate::supervise::RecordId;
}
