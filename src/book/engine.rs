//! Price-time priority matching engine.
//!
//! [`OrderBookState`] is a plain, non-concurrent data structure. It is
//! owned exclusively by the [`super::actor::OrderBookActor`] task, which
//! is what makes "one critical section" a structural property of the
//! system rather than something a lock enforces.

use super::error::BookError;
use super::level::PriceLevel;
use super::types::{Order, Side, Trade, now_seconds};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, VecDeque};
use uuid::Uuid;

/// How many recent trades the in-memory ring keeps for snapshot replay.
const RECENT_TRADE_CAPACITY: usize = 1000;

/// A point-in-time view of the book, suitable for serializing to clients.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BookSnapshot {
    /// Resting bid levels, best price first.
    pub bids: Vec<LevelSnapshot>,
    /// Resting ask levels, best price first.
    pub asks: Vec<LevelSnapshot>,
    /// The most recent trade price, if the book has ever traded.
    pub last_trade_price: Option<Decimal>,
    /// The last `n` trades, most recent last.
    pub recent_trades: Vec<Trade>,
}

/// A single price level, for snapshots: the price plus every order
/// resting there, in arrival order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LevelSnapshot {
    /// The price of this level.
    pub price: Decimal,
    /// Every order resting at this price, oldest first.
    pub orders: Vec<Order>,
}

/// The matching engine's full state: both sides of the book, the order
/// registry, the recent-trade ring, and the buffer of trades awaiting a
/// durable flush.
pub struct OrderBookState {
    symbol: String,
    bids: BTreeMap<Decimal, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    registry: HashMap<Uuid, (Decimal, Side)>,
    recent_trades: VecDeque<Trade>,
    pending_trades: Vec<Trade>,
    next_trade_id: u64,
    last_trade_price: Option<Decimal>,
}

impl OrderBookState {
    /// A fresh, empty book for the given symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            registry: HashMap::new(),
            recent_trades: VecDeque::with_capacity(RECENT_TRADE_CAPACITY),
            pending_trades: Vec::new(),
            next_trade_id: 1,
            last_trade_price: None,
        }
    }

    /// The symbol this book trades.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Validates, matches, and (if quantity remains) rests an incoming
    /// order. Returns every trade the order participated in, in the
    /// order they occurred.
    ///
    /// Matching always executes at the resting (maker) order's price,
    /// never the incoming (taker) order's price — this is what lets a
    /// marketable limit order receive price improvement. There is no
    /// self-trade prevention: an order may match against a resting order
    /// from the same trader.
    pub fn submit(&mut self, mut incoming: Order) -> Result<Vec<Trade>, BookError> {
        if incoming.limit_price <= Decimal::ZERO {
            return Err(BookError::InvalidPrice {
                price: incoming.limit_price,
            });
        }
        if incoming.quantity == 0 {
            return Err(BookError::InvalidQuantity);
        }
        if self.registry.contains_key(&incoming.order_id) {
            return Err(BookError::DuplicateOrderId {
                order_id: incoming.order_id,
            });
        }

        let mut trades = Vec::new();
        self.match_incoming(&mut incoming, &mut trades);

        if incoming.quantity > 0 {
            self.rest(incoming);
        }

        if !trades.is_empty() {
            self.recent_trades.extend(trades.iter().cloned());
            while self.recent_trades.len() > RECENT_TRADE_CAPACITY {
                self.recent_trades.pop_front();
            }
            self.pending_trades.extend(trades.iter().cloned());
            self.last_trade_price = trades.last().map(|t| t.price);
        }

        Ok(trades)
    }

    fn match_incoming(&mut self, incoming: &mut Order, trades: &mut Vec<Trade>) {
        loop {
            if incoming.quantity == 0 {
                return;
            }
            let crosses = match incoming.side {
                Side::Buy => self
                    .asks
                    .first_key_value()
                    .is_some_and(|(price, _)| *price <= incoming.limit_price),
                Side::Sell => self
                    .bids
                    .last_key_value()
                    .is_some_and(|(price, _)| *price >= incoming.limit_price),
            };
            if !crosses {
                return;
            }

            let opposite = match incoming.side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let (&best_price, level) = match incoming.side {
                Side::Buy => opposite.iter_mut().next(),
                Side::Sell => opposite.iter_mut().next_back(),
            }
            .expect("crosses implies a best opposite level exists");

            let maker = level.front_mut().expect("non-empty level has a front order");
            let fill_qty = incoming.quantity.min(maker.quantity);

            let (buyer_id, seller_id) = match incoming.side {
                Side::Buy => (incoming.trader_id, maker.trader_id),
                Side::Sell => (maker.trader_id, incoming.trader_id),
            };

            let trade = Trade {
                trade_id: self.next_trade_id,
                maker_order_id: maker.order_id,
                taker_order_id: incoming.order_id,
                buyer_id,
                seller_id,
                price: best_price,
                quantity: fill_qty,
                timestamp: now_seconds(),
            };
            self.next_trade_id += 1;

            maker.quantity -= fill_qty;
            incoming.quantity -= fill_qty;
            let maker_order_id = maker.order_id;
            let maker_exhausted = maker.quantity == 0;

            trades.push(trade);

            if maker_exhausted {
                level.pop_front();
                self.registry.remove(&maker_order_id);
            }
            if level.is_empty() {
                opposite.remove(&best_price);
            }
        }
    }

    fn rest(&mut self, order: Order) {
        let side_map = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        self.registry
            .insert(order.order_id, (order.limit_price, order.side));
        side_map
            .entry(order.limit_price)
            .or_insert_with(PriceLevel::new)
            .push_back(order);
    }

    /// Cancels the remaining resting quantity of an order.
    ///
    /// Partial fills already executed are untouched; only the quantity
    /// still resting is removed from the book.
    pub fn cancel(&mut self, order_id: Uuid) -> Result<Order, BookError> {
        let (price, side) = self
            .registry
            .remove(&order_id)
            .ok_or(BookError::UnknownOrder { order_id })?;

        let side_map = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level = side_map
            .get_mut(&price)
            .expect("registry entry implies the level exists");
        let removed = level
            .remove(order_id)
            .expect("registry entry implies the order is in its level");
        if level.is_empty() {
            side_map.remove(&price);
        }
        Ok(removed)
    }

    /// Drains every trade accumulated since the last drain, for the
    /// flusher to hand to the trade store.
    pub fn drain_pending_trades(&mut self) -> Vec<Trade> {
        std::mem::take(&mut self.pending_trades)
    }

    /// How many trades are currently waiting to be flushed.
    pub fn pending_trade_count(&self) -> usize {
        self.pending_trades.len()
    }

    /// The best (highest) resting bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.last_key_value().map(|(price, _)| *price)
    }

    /// The best (lowest) resting ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first_key_value().map(|(price, _)| *price)
    }

    /// A full point-in-time snapshot of the book for distribution to
    /// market-data subscribers.
    pub fn snapshot(&self) -> BookSnapshot {
        let levels = |side: &BTreeMap<Decimal, PriceLevel>, rev: bool| -> Vec<LevelSnapshot> {
            let mut v: Vec<LevelSnapshot> = side
                .iter()
                .map(|(price, level)| LevelSnapshot {
                    price: *price,
                    orders: level.iter().cloned().collect(),
                })
                .collect();
            if rev {
                v.reverse();
            }
            v
        };
        BookSnapshot {
            bids: levels(&self.bids, true),
            asks: levels(&self.asks, false),
            last_trade_price: self.last_trade_price,
            recent_trades: self.recent_trades.iter().rev().take(10).rev().cloned().collect(),
        }
    }
}
