//! Wire types shared by the order gateway and the market-data
//! distributor. Every message is a single UTF-8 JSON text frame.

use crate::book::{LevelSnapshot, Order, Side, Trade};
use crate::store::OhlcBar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// An inbound order submission on the order gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderRequest {
    /// Place a new limit order on the given side.
    NewOrder {
        /// Buy or sell.
        side: Side,
        /// Limit price.
        price: Decimal,
        /// Quantity to trade.
        quantity: u64,
    },
    /// Cancel the remaining quantity of a previously accepted order.
    CancelOrder {
        /// The id returned in the original acceptance reply.
        order_id: Uuid,
    },
}

/// A reply sent back on the order gateway for requests that do not
/// resolve to a trade list.
///
/// A successful `NewOrder` does not use this type: the gateway replies
/// with a bare JSON array of trades (possibly empty), and counterparty
/// notices are single-element arrays of the same shape.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayReply {
    /// The order was cancelled.
    OrderCancelled {
        /// The id of the order that was cancelled.
        order_id: Uuid,
    },
    /// The request could not be processed.
    Error {
        /// A human-readable description of the failure.
        message: String,
    },
}

/// A control message on the market-data endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Start receiving a trade notice for every match.
    SubscribeTrades,
    /// Stop receiving trade notices.
    UnsubscribeTrades,
    /// Start receiving periodic order book snapshots.
    SubscribeOrderBook,
    /// Stop receiving order book snapshots.
    UnsubscribeOrderBook,
    /// Request trades in `[from_time, to_time]`; either bound may be
    /// omitted to leave that side open-ended.
    RequestHistorical {
        /// Inclusive lower bound, Unix seconds.
        #[serde(default)]
        from_time: Option<f64>,
        /// Inclusive upper bound, Unix seconds.
        #[serde(default)]
        to_time: Option<f64>,
    },
    /// Request OHLC bars covering `[from_time, to_time]` bucketed by
    /// `candle_interval` seconds (default 60 if omitted).
    RequestHistoricalOhlc {
        /// Inclusive lower bound, Unix seconds.
        #[serde(default)]
        from_time: Option<f64>,
        /// Inclusive upper bound, Unix seconds.
        #[serde(default)]
        to_time: Option<f64>,
        /// Bucket width, in seconds. Defaults to 60 when absent.
        #[serde(default)]
        candle_interval: Option<f64>,
    },
}

/// The `data` payload of a periodic `order_book_update` push.
#[derive(Debug, Clone, Serialize)]
pub struct OrderBookData {
    /// Resting bids, keyed by stringified price.
    pub bids: BTreeMap<String, Vec<Order>>,
    /// Resting asks, keyed by stringified price.
    pub asks: BTreeMap<String, Vec<Order>>,
    /// The most recent trade price, if the book has ever traded.
    pub last_price: Option<Decimal>,
    /// The last few trades, most recent last.
    pub recent_trades: Vec<Trade>,
}

impl OrderBookData {
    /// Builds the wire payload from a book snapshot's price levels.
    pub fn from_levels(
        bids: Vec<LevelSnapshot>,
        asks: Vec<LevelSnapshot>,
        last_price: Option<Decimal>,
        recent_trades: Vec<Trade>,
    ) -> Self {
        let keyed = |levels: Vec<LevelSnapshot>| {
            levels
                .into_iter()
                .map(|level| (level.price.to_string(), level.orders))
                .collect()
        };
        Self {
            bids: keyed(bids),
            asks: keyed(asks),
            last_price,
            recent_trades,
        }
    }
}

/// A message pushed to a market-data subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPush {
    /// One or more trades just matched.
    NewTrades {
        /// The trades, in match order.
        trades: Vec<Trade>,
    },
    /// A periodic snapshot of both sides of the book.
    OrderBookUpdate {
        /// Bids, asks, last trade price, and recent trades.
        data: OrderBookData,
    },
    /// Reply to `request_historical`.
    HistoricalTrades {
        /// Matching trades, oldest first.
        trades: Vec<Trade>,
    },
    /// Reply to `request_historical_ohlc`.
    HistoricalOhlc {
        /// The computed bars, oldest first.
        data: Vec<OhlcBar>,
    },
}
