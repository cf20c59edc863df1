//! Per-order bookkeeping record.
//!
//! An [`OrderPack`] is created at submission, updated exclusively by order
//! events, and annotated by the supervision tasks tracking it. Packs refer
//! to other packs by id only; the registry is the single owner.

use crate::core::types::{OrderId, OrderSnapshot, TradeFill, TradeId};
use crate::supervise::{AssembleRole, RecordId, RependingOrderInfo};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Names a supervision callback invoked on every event for a pack.
///
/// Dispatch is a static match in the engine; the list on each pack preserves
/// insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackTag {
    TimeLimit,
    Composory,
    Repending,
    TakeProfit,
    Step,
    Depth,
}

/// Typed supervision slots attached to a pack.
///
/// One optional slot per task family plus the linking and lifecycle tags.
/// Task slots hold record ids into the engine-side pools; the repending
/// record is small and order-local, so the pack owns it directly.
#[derive(Debug, Clone, Default)]
pub struct PackInfo {
    /// Ids of close packs linked to this (open) pack.
    pub close_ids: BTreeSet<OrderId>,
    /// Id of the open pack this (close) pack reduces.
    pub open_id: Option<OrderId>,
    /// When a supervising task wants this primitive off the book.
    pub expire_at: Option<DateTime<Utc>>,
    /// Set after the callbacks of the terminal event have run; later events
    /// for this id are dropped.
    pub finished: bool,
    /// An operator-initiated cancel is in flight (or was delivered).
    pub cancel_requested: bool,
    /// The pack was force-closed via composory close; volume accounting
    /// shortcuts to closed == traded.
    pub composory_closed: bool,

    pub time_limit: Option<RecordId>,
    pub composory: Option<RecordId>,
    pub step: Option<RecordId>,
    pub depth: Option<RecordId>,
    pub repending: Option<RependingOrderInfo>,
    /// Origin pack of the auto-exit record this take-profit child serves.
    pub take_profit_origin: Option<OrderId>,
    pub assemble: Option<AssembleSlot>,
}

/// Membership of a pack in an assemble (split) relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleSlot {
    pub record: RecordId,
    pub role: AssembleRole,
}

#[derive(Debug, Clone)]
pub struct OrderPack {
    pub id: OrderId,
    pub order: OrderSnapshot,
    pub info: PackInfo,
    pub trades: BTreeMap<TradeId, TradeFill>,
    pub tracks: Vec<TrackTag>,
}

impl OrderPack {
    pub fn new(order: OrderSnapshot) -> Self {
        Self {
            id: order.id.clone(),
            order,
            info: PackInfo::default(),
            trades: BTreeMap::new(),
            tracks: Vec::new(),
        }
    }

    /// Append a track tag. Duplicates are allowed and fire once per entry,
    /// matching list semantics.
    pub fn add_track(&mut self, tag: TrackTag) {
        self.tracks.push(tag);
    }

    /// Remove the first occurrence of a tag, if present.
    pub fn remove_track(&mut self, tag: TrackTag) {
        if let Some(pos) = self.tracks.iter().position(|t| *t == tag) {
            self.tracks.remove(pos);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.order.status.is_finished()
    }
}
