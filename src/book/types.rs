//! Core value types shared by the order book, the gateway, and the wire layer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Which side of the book an order or trade leg belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A resting or incoming buy order.
    Buy,
    /// A resting or incoming sell order.
    Sell,
}

impl Side {
    /// The side an incoming order would match against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// A resting or newly-arrived limit order.
///
/// Market, stop and iceberg order types are out of scope; every order in
/// this crate is a plain limit order that either matches immediately,
/// rests at its price, or is cancelled whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Server-assigned identifier, unique for the lifetime of the book.
    pub order_id: Uuid,
    /// The trader that submitted this order.
    pub trader_id: Uuid,
    /// Buy or sell.
    pub side: Side,
    /// Limit price; the order never trades worse than this.
    pub limit_price: Decimal,
    /// Quantity remaining to be filled. Decremented in place as the order
    /// matches; never goes negative.
    pub quantity: u64,
    /// Time the order was accepted by the gateway, used for price-time
    /// priority within a level.
    pub arrival_timestamp: f64,
}

/// A single match between a resting order and an incoming order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Monotonically increasing identifier assigned at match time.
    pub trade_id: u64,
    /// The order id of the resting (maker) side.
    pub maker_order_id: Uuid,
    /// The order id of the incoming (taker) side.
    pub taker_order_id: Uuid,
    /// The trader on the buy side of this trade.
    pub buyer_id: Uuid,
    /// The trader on the sell side of this trade.
    pub seller_id: Uuid,
    /// Execution price: always the maker's resting price.
    pub price: Decimal,
    /// Quantity executed in this match.
    pub quantity: u64,
    /// Wall-clock time the match occurred.
    pub timestamp: f64,
}

/// Returns the current wall-clock time as Unix seconds.
///
/// The single clock source for the crate, so tests can reason about
/// ordering without depending on real elapsed time.
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
