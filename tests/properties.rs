//! Property tests for the matching engine's core invariants, run against
//! `OrderBookState` directly (no actor indirection needed here since the
//! properties concern the algorithm, not the channel plumbing).

use matchbook::book::{Order, OrderBookState, Side, now_seconds};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn arbitrary_order() -> impl Strategy<Value = (bool, i64, u64)> {
    (any::<bool>(), 95i64..105, 1u64..20)
}

fn to_order(side_is_buy: bool, price: i64, qty: u64) -> Order {
    Order {
        order_id: Uuid::new_v4(),
        trader_id: Uuid::new_v4(),
        side: if side_is_buy { Side::Buy } else { Side::Sell },
        limit_price: Decimal::new(price, 0),
        quantity: qty,
        arrival_timestamp: now_seconds(),
    }
}

proptest! {
    /// The book never ends up with a crossed best bid/ask: every
    /// marketable order is matched down to the point where it no longer
    /// crosses before it is allowed to rest.
    #[test]
    fn book_is_never_crossed(orders in proptest::collection::vec(arbitrary_order(), 1..40)) {
        let mut book = OrderBookState::new("XYZ");
        for (is_buy, price, qty) in orders {
            let _ = book.submit(to_order(is_buy, price, qty));
            if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
                prop_assert!(bid < ask, "crossed book: bid {bid} >= ask {ask}");
            }
        }
    }

    /// Total quantity submitted equals quantity resting plus twice the
    /// quantity traded (each trade removes quantity from both sides).
    #[test]
    fn quantity_is_conserved(orders in proptest::collection::vec(arbitrary_order(), 1..40)) {
        let mut book = OrderBookState::new("XYZ");
        let mut submitted: u64 = 0;
        let mut traded: u64 = 0;
        for (is_buy, price, qty) in orders {
            submitted += qty;
            if let Ok(trades) = book.submit(to_order(is_buy, price, qty)) {
                traded += trades.iter().map(|t| t.quantity).sum::<u64>();
            }
        }
        let snapshot = book.snapshot();
        let level_quantity = |l: &matchbook::book::LevelSnapshot| {
            l.orders.iter().map(|o| o.quantity).sum::<u64>()
        };
        let resting: u64 = snapshot.bids.iter().map(level_quantity).sum::<u64>()
            + snapshot.asks.iter().map(level_quantity).sum::<u64>();
        prop_assert_eq!(submitted, resting + 2 * traded);
    }

    /// Cancelling a resting order is idempotent in its effect on total
    /// resting quantity: calling it twice never removes more than once.
    #[test]
    fn cancel_is_idempotent(price in 95i64..105, qty in 1u64..20) {
        let mut book = OrderBookState::new("XYZ");
        let resting = to_order(true, price, qty);
        let order_id = resting.order_id;
        book.submit(resting).unwrap();

        let first = book.cancel(order_id);
        let second = book.cancel(order_id);
        prop_assert!(first.is_ok());
        prop_assert!(second.is_err());
    }
}
