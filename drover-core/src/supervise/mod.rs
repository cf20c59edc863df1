//! Supervision task records.
//!
//! One record per active intent, owned by an engine-side pool and referenced
//! from order packs by [`RecordId`]. The records themselves are plain
//! bookkeeping: id sets, prices, deadlines. All decisions (send, cancel,
//! resend) live in the engine, which keeps every record reachable from a
//! single `&mut self`.

pub mod assemble;
pub mod auto_exit;
pub mod composory;
pub mod conditional;
pub mod repending;
pub mod step;
pub mod time_limit;

pub use assemble::{AssembleOrderInfo, AssembleRole};
pub use auto_exit::AutoExitInfo;
pub use composory::{ComposoryClosePool, ComposoryOrderInfo};
pub use conditional::ConditionalOrderClose;
pub use repending::RependingOrderInfo;
pub use step::{DepthOrderInfo, StepOrderInfo};
pub use time_limit::TimeLimitOrderInfo;

use crate::core::types::OrderId;
use std::collections::BTreeSet;
use std::fmt;

/// Key of a supervision record within its pool.
///
/// Monotonically increasing per engine instance, so pool iteration follows
/// creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live/finished order id sets shared by the volume-tracking records.
///
/// `live` holds primitives still on the book; a finished primitive moves to
/// `filled` if it traded anything, `unfilled` otherwise. The split matters
/// for remaining-volume arithmetic: live orders reserve their full requested
/// volume, filled ones only what they actually traded.
#[derive(Debug, Clone, Default)]
pub struct OrderGroup {
    pub live: BTreeSet<OrderId>,
    pub filled: BTreeSet<OrderId>,
    pub unfilled: BTreeSet<OrderId>,
}

impl OrderGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: OrderId) {
        self.live.insert(id);
    }

    /// Move a live id into the finished set matching its fill state. Ids not
    /// in `live` are left alone, so finishing is idempotent.
    pub fn finish(&mut self, id: &OrderId, had_fill: bool) {
        if self.live.remove(id) {
            if had_fill {
                self.filled.insert(id.clone());
            } else {
                self.unfilled.insert(id.clone());
            }
        }
    }

    /// No primitives left on the book.
    pub fn is_idle(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_routes_by_fill() {
        let mut group = OrderGroup::new();
        group.add(OrderId::new("a"));
        group.add(OrderId::new("b"));
        assert!(!group.is_idle());

        group.finish(&OrderId::new("a"), true);
        group.finish(&OrderId::new("b"), false);
        assert!(group.is_idle());
        assert!(group.filled.contains(&OrderId::new("a")));
        assert!(group.unfilled.contains(&OrderId::new("b")));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut group = OrderGroup::new();
        group.add(OrderId::new("a"));
        group.finish(&OrderId::new("a"), true);
        // A second terminal event must not reclassify the id.
        group.finish(&OrderId::new("a"), false);
        assert!(group.filled.contains(&OrderId::new("a")));
        assert!(!group.unfilled.contains(&OrderId::new("a")));
    }
}
