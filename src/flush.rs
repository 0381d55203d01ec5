//! The periodic (and threshold-triggered) flush of pending trades from
//! the book actor into the durable trade store.

use crate::book::BookHandle;
use crate::store::TradeStore;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, trace};

/// Runs until `flush_requested` is dropped (i.e. the book actor exits).
/// Drains the book's pending trade buffer on a fixed period, or
/// immediately whenever the book actor signals the buffer has crossed
/// its configured threshold.
pub async fn run(
    book: BookHandle,
    store: TradeStore,
    period: Duration,
    mut flush_requested: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = flush_requested.recv() => {
                if signal.is_none() {
                    flush_once(&book, &store).await;
                    return;
                }
            }
        }
        flush_once(&book, &store).await;
    }
}

async fn flush_once(book: &BookHandle, store: &TradeStore) {
    let trades = book.drain_pending_trades().await;
    if trades.is_empty() {
        return;
    }
    let store = store.clone();
    let count = trades.len();
    let result = tokio::task::spawn_blocking(move || store.append_batch(&trades))
        .await
        .expect("blocking trade-store flush task panicked");
    match result {
        Ok(inserted) => trace!(count, inserted, "flushed pending trades"),
        Err(err) => error!(%err, "failed to flush pending trades"),
    }
}
