//! One market-data connection: event-driven trade notices, periodic
//! order book snapshots, and historical queries — folded into a single
//! `select!` loop.

use super::MarketDataState;
use crate::events::Event;
use crate::transport::{ControlMessage, OrderBookData, ServerPush};
use axum::extract::ws::{Message, WebSocket};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Bucket width used when a client omits `candle_interval`.
const DEFAULT_CANDLE_INTERVAL: f64 = 60.0;

/// Per-session subscription flags, defaulting to both off.
#[derive(Default)]
struct Subscriptions {
    trades: bool,
    order_book: bool,
}

/// Runs a single market-data connection until it closes or falls too
/// far behind the event bus to keep up.
pub async fn run(mut socket: WebSocket, state: MarketDataState) {
    let mut events = state.events.subscribe();
    let mut ticker = tokio::time::interval(state.order_book_broadcast_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut subs = Subscriptions::default();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(Event::NewTrades(trades)) if subs.trades => {
                        let push = ServerPush::NewTrades { trades };
                        if send(&mut socket, &push).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "market data session lagged, evicting");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ticker.tick(), if subs.order_book => {
                let snapshot = state.book.snapshot().await;
                let push = ServerPush::OrderBookUpdate {
                    data: OrderBookData::from_levels(
                        snapshot.bids,
                        snapshot.asks,
                        snapshot.last_trade_price,
                        snapshot.recent_trades,
                    ),
                };
                if send(&mut socket, &push).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if handle_control(&text, &state, &mut subs, &mut socket).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(%err, "market data socket error");
                        break;
                    }
                }
            }
        }
    }
}

async fn handle_control(
    text: &str,
    state: &MarketDataState,
    subs: &mut Subscriptions,
    socket: &mut WebSocket,
) -> Result<(), axum::Error> {
    // Malformed or unrecognized control messages are silently ignored,
    // not treated as a reason to drop the connection.
    let Ok(message) = serde_json::from_str::<ControlMessage>(text) else {
        return Ok(());
    };

    match message {
        ControlMessage::SubscribeTrades => {
            subs.trades = true;
            debug!("subscribed to trades");
            Ok(())
        }
        ControlMessage::UnsubscribeTrades => {
            subs.trades = false;
            Ok(())
        }
        ControlMessage::SubscribeOrderBook => {
            subs.order_book = true;
            debug!("subscribed to order book updates");
            Ok(())
        }
        ControlMessage::UnsubscribeOrderBook => {
            subs.order_book = false;
            Ok(())
        }
        ControlMessage::RequestHistorical { from_time, to_time } => {
            let store = state.store.clone();
            let trades =
                tokio::task::spawn_blocking(move || store.range_trades(from_time, to_time))
                    .await
                    .expect("blocking trade-store query task panicked");
            match trades {
                Ok(trades) => send(socket, &ServerPush::HistoricalTrades { trades }).await,
                Err(err) => {
                    warn!(%err, "historical trade query failed");
                    Ok(())
                }
            }
        }
        ControlMessage::RequestHistoricalOhlc {
            from_time,
            to_time,
            candle_interval,
        } => {
            let store = state.store.clone();
            let interval = candle_interval.unwrap_or(DEFAULT_CANDLE_INTERVAL);
            let bars = tokio::task::spawn_blocking(move || store.ohlc(from_time, to_time, interval))
                .await
                .expect("blocking trade-store query task panicked");
            match bars {
                Ok(data) => send(socket, &ServerPush::HistoricalOhlc { data }).await,
                Err(err) => {
                    warn!(%err, "historical ohlc query failed");
                    Ok(())
                }
            }
        }
    }
}

async fn send(socket: &mut WebSocket, push: &ServerPush) -> Result<(), axum::Error> {
    let text = serde_json::to_string(push).unwrap_or_else(|err| {
        warn!(%err, "failed to serialize market data push");
        "{}".to_string()
    });
    socket.send(Message::Text(text.into())).await
}
