//! Domain error types for supervision operations.
//!
//! Precondition violations indicate a strategy bug and fail fast; everything
//! else (rejections, cancels, missing market data) is handled as state, not
//! as an error.

use crate::core::types::{Direction, Offset, OrderId};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuperviseError {
    /// Order volume must be strictly positive after rounding.
    #[error("order volume must be positive, got {0}")]
    InvalidVolume(Decimal),

    /// Order price must be strictly positive after tick rounding.
    #[error("order price must be positive, got {0}")]
    InvalidPrice(Decimal),

    /// Linking requires an open-offset pack on the open side.
    #[error("pack {id} is not an open order (offset {offset})")]
    NotOpenOrder { id: OrderId, offset: Offset },

    /// Linking requires a close-offset pack on the close side.
    #[error("pack {id} is not a close order (offset {offset})")]
    NotCloseOrder { id: OrderId, offset: Offset },

    /// Open and close directions must cancel out.
    #[error("cannot link {open_id} ({open_direction}) with {close_id} ({close_direction})")]
    LinkDirectionMismatch {
        open_id: OrderId,
        open_direction: Direction,
        close_id: OrderId,
        close_direction: Direction,
    },

    /// Operation addressed an order id the registry has never seen.
    #[error("unknown order id {0}")]
    UnknownOrder(OrderId),

    /// Construction-time configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Gateway refused or failed the request outright.
    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}
