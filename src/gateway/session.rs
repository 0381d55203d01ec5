//! One order gateway connection: order ingestion plus counterparty
//! trade notices.

use super::GatewayState;
use crate::book::{Order, Trade, now_seconds};
use crate::transport::{GatewayReply, OrderRequest};
use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Runs a single connection until it closes or is evicted.
pub async fn run(mut socket: WebSocket, state: GatewayState) {
    let trader_id = Uuid::new_v4();
    let (notice_tx, mut notice_rx) = mpsc::channel::<Vec<Trade>>(256);
    state.sessions.lock().insert(trader_id, notice_tx);
    info!(%trader_id, "trader connected");

    loop {
        tokio::select! {
            Some(notice) = notice_rx.recv() => {
                if send_trades(&mut socket, &notice).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if handle_text(&text, trader_id, &state, &mut socket).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(%trader_id, %err, "gateway socket error");
                        break;
                    }
                }
            }
        }
    }

    state.sessions.lock().remove(&trader_id);
    info!(%trader_id, "trader disconnected");
}

async fn handle_text(
    text: &str,
    trader_id: Uuid,
    state: &GatewayState,
    socket: &mut WebSocket,
) -> Result<(), axum::Error> {
    let request: OrderRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(err) => {
            warn!(%trader_id, %err, "malformed order request");
            let reply = GatewayReply::Error {
                message: format!("malformed request: {err}"),
            };
            return send(socket, &reply).await;
        }
    };

    match request {
        OrderRequest::NewOrder {
            side,
            price,
            quantity,
        } => {
            let order = Order {
                order_id: Uuid::new_v4(),
                trader_id,
                side,
                limit_price: price,
                quantity,
                arrival_timestamp: now_seconds(),
            };
            match state.book.submit(order).await {
                Ok(trades) => {
                    notify_counterparties(state, trader_id, &trades).await;
                    send_trades(socket, &trades).await
                }
                Err(err) => {
                    let reply = GatewayReply::Error {
                        message: err.to_string(),
                    };
                    send(socket, &reply).await
                }
            }
        }
        OrderRequest::CancelOrder { order_id } => match state.book.cancel(order_id).await {
            Ok(_) => {
                let reply = GatewayReply::OrderCancelled { order_id };
                send(socket, &reply).await
            }
            Err(err) => {
                let reply = GatewayReply::Error {
                    message: err.to_string(),
                };
                send(socket, &reply).await
            }
        },
    }
}

/// Pushes a single-element trade array to every counterparty that was
/// not the originator of this submit.
async fn notify_counterparties(state: &GatewayState, originator: Uuid, trades: &[Trade]) {
    for trade in trades {
        let counterparty = if trade.buyer_id == originator {
            trade.seller_id
        } else if trade.seller_id == originator {
            trade.buyer_id
        } else {
            continue;
        };
        // Self-trades (both legs are the originator) get no notice;
        // the originator already has the fill in its own reply.
        if counterparty == originator {
            continue;
        }
        let sender = state.sessions.lock().get(&counterparty).cloned();
        if let Some(sender) = sender {
            let _ = sender.send(vec![trade.clone()]).await;
        }
    }
}

async fn send(socket: &mut WebSocket, reply: &GatewayReply) -> Result<(), axum::Error> {
    let text = serde_json::to_string(reply).unwrap_or_else(|err| {
        warn!(%err, "failed to serialize gateway reply");
        "{\"type\":\"error\",\"message\":\"internal serialization error\"}".to_string()
    });
    socket.send(Message::Text(text.into())).await
}

/// Sends a bare JSON array of trades — the wire shape for a successful
/// order submission and for each counterparty notice.
async fn send_trades(socket: &mut WebSocket, trades: &[Trade]) -> Result<(), axum::Error> {
    let text = serde_json::to_string(trades).unwrap_or_else(|err| {
        warn!(%err, "failed to serialize trade list");
        "[]".to_string()
    });
    socket.send(Message::Text(text.into())).await
}
