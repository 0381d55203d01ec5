//! A single price level: the FIFO queue of resting orders at one price.

use super::types::Order;
use std::collections::VecDeque;
use uuid::Uuid;

/// Orders resting at a single price, in arrival order.
///
/// The book owns exactly one `PriceLevel` per occupied price on each side.
/// A level is removed from its side as soon as it empties, so an empty
/// level never lingers in the tree.
#[derive(Debug, Default)]
pub struct PriceLevel {
    orders: VecDeque<Order>,
}

impl PriceLevel {
    /// An empty level.
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
        }
    }

    /// Appends an order to the back of the queue (newest arrival).
    pub fn push_back(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    /// The order at the front of the queue, if any.
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Mutable access to the front order, used to decrement its quantity
    /// as it is partially filled.
    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    /// Removes and returns the front order once it is fully filled.
    pub fn pop_front(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    /// Removes a specific order by id, wherever it sits in the queue.
    ///
    /// Cancellation is not restricted to the front of the level, so this
    /// is a linear scan; levels in this workload stay small enough that
    /// an intrusive O(1) handle is not worth the added bookkeeping.
    pub fn remove(&mut self, order_id: Uuid) -> Option<Order> {
        let index = self.orders.iter().position(|o| o.order_id == order_id)?;
        self.orders.remove(index)
    }

    /// True once every order in the level has been filled or cancelled.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Total resting quantity at this level.
    pub fn total_quantity(&self) -> u64 {
        self.orders.iter().map(|o| o.quantity).sum()
    }

    /// Orders at this level in arrival order, for snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::types::Side;
    use rust_decimal::Decimal;

    fn order(id: Uuid, qty: u64, ts: f64) -> Order {
        Order {
            order_id: id,
            trader_id: Uuid::new_v4(),
            side: Side::Buy,
            limit_price: Decimal::new(100, 0),
            quantity: qty,
            arrival_timestamp: ts,
        }
    }

    #[test]
    fn fifo_order_preserved() {
        let mut level = PriceLevel::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        level.push_back(order(first, 10, 1.0));
        level.push_back(order(second, 5, 2.0));

        assert_eq!(level.front().unwrap().order_id, first);
        let popped = level.pop_front().unwrap();
        assert_eq!(popped.order_id, first);
        assert_eq!(level.front().unwrap().order_id, second);
    }

    #[test]
    fn remove_from_middle_leaves_others_intact() {
        let mut level = PriceLevel::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        level.push_back(order(a, 1, 1.0));
        level.push_back(order(b, 1, 2.0));
        level.push_back(order(c, 1, 3.0));

        let removed = level.remove(b).unwrap();
        assert_eq!(removed.order_id, b);
        assert_eq!(level.total_quantity(), 2);
        assert_eq!(level.front().unwrap().order_id, a);
    }

    #[test]
    fn empty_after_draining() {
        let mut level = PriceLevel::new();
        level.push_back(order(Uuid::new_v4(), 1, 1.0));
        level.pop_front();
        assert!(level.is_empty());
    }
}
