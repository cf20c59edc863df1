//! Core order types and errors.

pub mod errors;
pub mod types;

pub use errors::SuperviseError;
pub use types::{
    Direction, Offset, OrderCommand, OrderId, OrderSnapshot, OrderStatus, PriceType, TradeFill,
    TradeId,
};
