//! End-to-end scenarios driven through the book actor's public handle,
//! exercising the channel plumbing rather than `OrderBookState` directly.

use matchbook::book::{Order, OrderBookActor, Side, now_seconds};
use matchbook::events;
use rust_decimal::Decimal;
use uuid::Uuid;

fn order(side: Side, price: i64, qty: u64) -> Order {
    Order {
        order_id: Uuid::new_v4(),
        trader_id: Uuid::new_v4(),
        side,
        limit_price: Decimal::new(price, 0),
        quantity: qty,
        arrival_timestamp: now_seconds(),
    }
}

#[tokio::test]
async fn submit_and_match_through_the_actor() {
    let bus = events::new_bus();
    let (flush_tx, _flush_rx) = tokio::sync::mpsc::channel(1);
    let book = OrderBookActor::spawn("XYZ", bus.clone(), 100, flush_tx);

    let mut subscriber = bus.subscribe();

    let maker = order(Side::Sell, 100, 10);
    let maker_id = maker.order_id;
    let trades = book.submit(maker).await.unwrap();
    assert!(trades.is_empty());

    let taker = order(Side::Buy, 100, 10);
    let trades = book.submit(taker).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].maker_order_id, maker_id);

    let event = subscriber.recv().await.unwrap();
    match event {
        matchbook::events::Event::NewTrades(trades) => assert_eq!(trades.len(), 1),
        other => panic!("expected NewTrades, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_is_reflected_in_snapshot() {
    let bus = events::new_bus();
    let (flush_tx, _flush_rx) = tokio::sync::mpsc::channel(1);
    let book = OrderBookActor::spawn("XYZ", bus, 100, flush_tx);

    let resting = order(Side::Buy, 100, 5);
    let resting_id = resting.order_id;
    book.submit(resting).await.unwrap();

    let snapshot = book.snapshot().await;
    assert_eq!(snapshot.bids.len(), 1);

    book.cancel(resting_id).await.unwrap();
    let snapshot = book.snapshot().await;
    assert!(snapshot.bids.is_empty());
}

#[tokio::test]
async fn pending_trades_drain_exactly_once() {
    let bus = events::new_bus();
    let (flush_tx, _flush_rx) = tokio::sync::mpsc::channel(1);
    let book = OrderBookActor::spawn("XYZ", bus, 100, flush_tx);

    book.submit(order(Side::Sell, 100, 10)).await.unwrap();
    book.submit(order(Side::Buy, 100, 10)).await.unwrap();

    let first_drain = book.drain_pending_trades().await;
    assert_eq!(first_drain.len(), 1);
    let second_drain = book.drain_pending_trades().await;
    assert!(second_drain.is_empty());
}

#[tokio::test]
async fn ohlc_round_trips_through_the_store() {
    use matchbook::store::TradeStore;

    let bus = events::new_bus();
    let (flush_tx, _flush_rx) = tokio::sync::mpsc::channel(1);
    let book = OrderBookActor::spawn("XYZ", bus, 100, flush_tx);
    let store = TradeStore::open_memory().unwrap();

    book.submit(order(Side::Sell, 100, 10)).await.unwrap();
    book.submit(order(Side::Buy, 100, 10)).await.unwrap();

    let trades = book.drain_pending_trades().await;
    store.append_batch(&trades).unwrap();

    let bars = store.ohlc(Some(0.0), Some(now_seconds() + 60.0), 3600.0).unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].volume, 10);
}
