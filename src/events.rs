//! The event bus: a bounded, multi-producer/multi-consumer broadcast of
//! book activity that every market-data session subscribes to.
//!
//! A [`tokio::sync::broadcast`] channel already gives us the semantics
//! called for here: a slow subscriber falls behind and is told so via
//! `RecvError::Lagged` rather than the sender ever blocking.

use crate::book::Trade;
use uuid::Uuid;

/// Capacity of the broadcast channel: how many events a lagging
/// subscriber can fall behind by before it starts missing them.
pub const EVENT_BUS_CAPACITY: usize = 4096;

/// Something that happened in the order book, broadcast to anyone
/// listening.
#[derive(Debug, Clone)]
pub enum Event {
    /// One or more trades matched in a single submit.
    NewTrades(Vec<Trade>),
    /// An order was cancelled.
    Cancel(Uuid),
}

/// Creates a fresh event bus. The returned sender is cloned into the
/// book actor; each subscriber calls `.subscribe()` on it independently.
pub fn new_bus() -> tokio::sync::broadcast::Sender<Event> {
    let (tx, _rx) = tokio::sync::broadcast::channel(EVENT_BUS_CAPACITY);
    tx
}
