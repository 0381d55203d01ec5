//! The order book's dedicated task: the single critical section.
//!
//! Every mutation of [`OrderBookState`] happens inside
//! [`run`](OrderBookActor::run), reached only by sending a [`BookCommand`]
//! on the actor's channel. No other task ever touches the state directly,
//! so there is nothing to lock.

use super::engine::{BookSnapshot, OrderBookState};
use super::error::BookError;
use super::types::{Order, Trade};
use crate::events::Event;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, trace};
use uuid::Uuid;

/// A request sent to the order book's dedicated task.
pub enum BookCommand {
    /// Submit a new order; reply with the trades it generated.
    Submit {
        /// The order to validate, match, and possibly rest.
        order: Order,
        /// Channel the caller will read the result from.
        reply: oneshot::Sender<Result<Vec<Trade>, BookError>>,
    },
    /// Cancel the remaining quantity of a resting order.
    Cancel {
        /// The order to remove.
        order_id: Uuid,
        /// Channel the caller will read the result from.
        reply: oneshot::Sender<Result<Order, BookError>>,
    },
    /// Request a point-in-time snapshot of both sides of the book.
    Snapshot {
        /// Channel the caller will read the result from.
        reply: oneshot::Sender<BookSnapshot>,
    },
    /// Drain the trades accumulated since the last drain, for the flusher.
    DrainPendingTrades {
        /// Channel the caller will read the result from.
        reply: oneshot::Sender<Vec<Trade>>,
    },
}

/// A handle used by other tasks to talk to the book actor.
#[derive(Clone)]
pub struct BookHandle {
    commands: mpsc::Sender<BookCommand>,
}

impl BookHandle {
    /// Submits an order and awaits the resulting trades.
    pub async fn submit(&self, order: Order) -> Result<Vec<Trade>, BookError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(BookCommand::Submit { order, reply })
            .await
            .expect("book actor task should not exit while handles are alive");
        rx.await.expect("book actor should always answer a submit")
    }

    /// Cancels an order and awaits the removed order, or an error if it
    /// was not found.
    pub async fn cancel(&self, order_id: Uuid) -> Result<Order, BookError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(BookCommand::Cancel { order_id, reply })
            .await
            .expect("book actor task should not exit while handles are alive");
        rx.await.expect("book actor should always answer a cancel")
    }

    /// Requests a snapshot of the current book state.
    pub async fn snapshot(&self) -> BookSnapshot {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(BookCommand::Snapshot { reply })
            .await
            .expect("book actor task should not exit while handles are alive");
        rx.await.expect("book actor should always answer a snapshot request")
    }

    /// Drains trades accumulated since the last drain. Called periodically
    /// by the flush task and once more on shutdown.
    pub async fn drain_pending_trades(&self) -> Vec<Trade> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(BookCommand::DrainPendingTrades { reply })
            .await
            .expect("book actor task should not exit while handles are alive");
        rx.await.expect("book actor should always answer a drain request")
    }
}

/// The task that owns [`OrderBookState`] exclusively.
pub struct OrderBookActor {
    state: OrderBookState,
    commands: mpsc::Receiver<BookCommand>,
    events: broadcast::Sender<Event>,
    flush_threshold: usize,
    flush_requested: mpsc::Sender<()>,
}

impl OrderBookActor {
    /// Spawns the actor task and returns a handle the rest of the crate
    /// uses to reach it. `flush_requested` is pinged whenever the pending
    /// trade buffer crosses `flush_threshold`, so the flush task does not
    /// have to poll on a fixed timer alone.
    pub fn spawn(
        symbol: impl Into<String>,
        events: broadcast::Sender<Event>,
        flush_threshold: usize,
        flush_requested: mpsc::Sender<()>,
    ) -> BookHandle {
        let (tx, rx) = mpsc::channel(1024);
        let actor = OrderBookActor {
            state: OrderBookState::new(symbol),
            commands: rx,
            events,
            flush_threshold,
            flush_requested,
        };
        tokio::spawn(actor.run());
        BookHandle { commands: tx }
    }

    async fn run(mut self) {
        info!(symbol = self.state.symbol(), "order book actor started");
        while let Some(command) = self.commands.recv().await {
            match command {
                BookCommand::Submit { order, reply } => {
                    let result = self.state.submit(order);
                    if let Ok(trades) = &result {
                        if !trades.is_empty() {
                            trace!(count = trades.len(), "matched trades");
                            let _ = self.events.send(Event::NewTrades(trades.clone()));
                            if self.state.pending_trade_count() >= self.flush_threshold {
                                let _ = self.flush_requested.try_send(());
                            }
                        }
                    }
                    let _ = reply.send(result);
                }
                BookCommand::Cancel { order_id, reply } => {
                    let result = self.state.cancel(order_id);
                    if result.is_ok() {
                        let _ = self.events.send(Event::Cancel(order_id));
                    }
                    let _ = reply.send(result);
                }
                BookCommand::Snapshot { reply } => {
                    let _ = reply.send(self.state.snapshot());
                }
                BookCommand::DrainPendingTrades { reply } => {
                    let _ = reply.send(self.state.drain_pending_trades());
                }
            }
        }
        info!(symbol = self.state.symbol(), "order book actor stopped");
    }
}
