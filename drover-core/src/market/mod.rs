//! Market data types and the per-symbol last-value cache.

pub mod cache;
pub mod types;

pub use cache::MarketCache;
pub use types::{Bar, DepthLevel, Tick};
