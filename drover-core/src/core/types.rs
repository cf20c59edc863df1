//! Core order types shared by the registry, the supervision tasks and the
//! gateway boundary.
//!
//! All prices and volumes are `Decimal`; volume arithmetic is rounded to a
//! configurable number of digits after every sum to avoid drift.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a gateway order.
///
/// Gateway-assigned, opaque. Synthetic packs created by `split_order` derive
/// their ids from the origin id (`"<origin>-<n>"`), so a string newtype is
/// the honest representation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the `index`-th synthetic child of this order.
    pub fn child(&self, index: usize) -> OrderId {
        OrderId(format!("{}-{}", self.0, index))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a trade (fill) report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(String);

impl TradeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TradeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Trade direction of an order: long profits on rise, short on fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// +1 for long, -1 for short. Used for link checks and price comparisons.
    pub fn sign(self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Whether an order establishes a position or flattens one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Offset {
    Open,
    Close,
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Open => write!(f, "OPEN"),
            Offset::Close => write!(f, "CLOSE"),
        }
    }
}

/// The four strategy-level order commands.
///
/// Each command pins down a (direction, offset) pair:
///
/// | Command | Direction | Offset |
/// |---------|-----------|--------|
/// | Buy     | Long      | Open   |
/// | Short   | Short     | Open   |
/// | Sell    | Short     | Close  |
/// | Cover   | Long      | Close  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    /// Open a long position.
    Buy,
    /// Open a short position.
    Short,
    /// Close a long position (sells, so the order itself trades short).
    Sell,
    /// Close a short position (buys back, so the order itself trades long).
    Cover,
}

impl OrderCommand {
    /// Trade direction of the order this command produces.
    pub fn direction(self) -> Direction {
        match self {
            OrderCommand::Buy | OrderCommand::Cover => Direction::Long,
            OrderCommand::Sell | OrderCommand::Short => Direction::Short,
        }
    }

    pub fn offset(self) -> Offset {
        match self {
            OrderCommand::Buy | OrderCommand::Short => Offset::Open,
            OrderCommand::Sell | OrderCommand::Cover => Offset::Close,
        }
    }

    /// The command that flattens an open position of the given direction.
    pub fn close_of(open_direction: Direction) -> OrderCommand {
        match open_direction {
            Direction::Long => OrderCommand::Sell,
            Direction::Short => OrderCommand::Cover,
        }
    }

    /// Reassemble a command from the (offset, direction) of an order
    /// snapshot. Inverse of `direction()` + `offset()`.
    pub fn from_parts(offset: Offset, direction: Direction) -> OrderCommand {
        match (offset, direction) {
            (Offset::Open, Direction::Long) => OrderCommand::Buy,
            (Offset::Open, Direction::Short) => OrderCommand::Short,
            (Offset::Close, Direction::Short) => OrderCommand::Sell,
            (Offset::Close, Direction::Long) => OrderCommand::Cover,
        }
    }
}

impl fmt::Display for OrderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderCommand::Buy => write!(f, "BUY"),
            OrderCommand::Short => write!(f, "SHORT"),
            OrderCommand::Sell => write!(f, "SELL"),
            OrderCommand::Cover => write!(f, "COVER"),
        }
    }
}

/// Price type of a primitive order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceType {
    /// Limit order at a specified price.
    Limit,
    /// Market order (execute at best available price).
    Market,
}

/// Order lifecycle state as reported by the gateway.
///
/// `Init` is synthesized locally at submission time, before the gateway has
/// acknowledged anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Init,
    NotTraded,
    PartTraded,
    AllTraded,
    Cancelled,
    Rejected,
    Unknown,
}

impl OrderStatus {
    /// Terminal statuses: no further gateway updates are expected.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            OrderStatus::AllTraded | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Cancelled or Rejected: the order left the book without completing.
    pub fn is_removed(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Rejected)
    }

    /// Coarse progress rank; snapshots should never move backwards.
    pub fn rank(self) -> u8 {
        match self {
            OrderStatus::Init => 0,
            OrderStatus::Unknown => 0,
            OrderStatus::NotTraded => 1,
            OrderStatus::PartTraded => 2,
            OrderStatus::AllTraded => 3,
            OrderStatus::Cancelled => 3,
            OrderStatus::Rejected => 3,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Init => "INIT",
            OrderStatus::NotTraded => "NOT_TRADED",
            OrderStatus::PartTraded => "PART_TRADED",
            OrderStatus::AllTraded => "ALL_TRADED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// Last known state of a gateway order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: Decimal,
    pub price_type: PriceType,
    pub total_volume: Decimal,
    pub traded_volume: Decimal,
    /// Average fill price; some gateways omit it on partial fills, in which
    /// case the registry derives it from recorded trades.
    pub price_avg: Option<Decimal>,
    pub status: OrderStatus,
    pub datetime: DateTime<Utc>,
}

impl OrderSnapshot {
    /// Synthetic snapshot registered at submission time, before the first
    /// gateway report arrives.
    pub fn init(
        id: OrderId,
        symbol: impl Into<String>,
        command: OrderCommand,
        price: Decimal,
        price_type: PriceType,
        volume: Decimal,
        datetime: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            direction: command.direction(),
            offset: command.offset(),
            price,
            price_type,
            total_volume: volume,
            traded_volume: Decimal::ZERO,
            price_avg: None,
            status: OrderStatus::Init,
            datetime,
        }
    }

    pub fn remaining_volume(&self) -> Decimal {
        self.total_volume - self.traded_volume
    }

    pub fn has_fill(&self) -> bool {
        self.traded_volume > Decimal::ZERO
    }

    /// The command that would reproduce this order.
    pub fn command(&self) -> OrderCommand {
        OrderCommand::from_parts(self.offset, self.direction)
    }
}

/// A single fill report from the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFill {
    pub id: TradeId,
    pub order_id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: Decimal,
    pub volume: Decimal,
    pub datetime: DateTime<Utc>,
}

impl TradeFill {
    pub fn notional(&self) -> Decimal {
        self.price * self.volume
    }
}
