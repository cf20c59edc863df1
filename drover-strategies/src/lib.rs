//! Drover Strategies - worked strategies over the supervision core
//!
//! Each strategy here shows one intended call pattern for
//! `drover_core::OrderSupervisor`: what to do on bars, which intents to
//! combine, and where the `Strategy` hooks fit in.
//!
//! ## Available Strategies
//!
//! ### TimedEntry
//! Accumulates a position in paced chunks inside an entry window, then
//! guards every filled chunk with a stop-loss and a scheduled close.

pub mod timed_entry;

pub use timed_entry::{TimedEntry, TimedEntryConfig};
