//! Order packs and the registry that owns them.

pub mod pack;
pub mod registry;

pub use pack::{AssembleSlot, OrderPack, PackInfo, TrackTag};
pub use registry::OrderRegistry;
