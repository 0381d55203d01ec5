//! The market-data distributor: real-time and historical trade/book data
//! over a separate WebSocket endpoint.

mod distributor;

use crate::book::BookHandle;
use crate::events::Event;
use crate::store::TradeStore;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use axum::routing::get;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

/// Shared state every market-data connection handler needs.
#[derive(Clone)]
pub struct MarketDataState {
    book: BookHandle,
    store: TradeStore,
    events: broadcast::Sender<Event>,
    order_book_broadcast_interval: Duration,
}

impl MarketDataState {
    /// Builds distributor state around the book, the store, and the
    /// shared event bus.
    pub fn new(
        book: BookHandle,
        store: TradeStore,
        events: broadcast::Sender<Event>,
        order_book_broadcast_interval: Duration,
    ) -> Self {
        Self {
            book,
            store,
            events,
            order_book_broadcast_interval,
        }
    }
}

/// Binds and serves the market-data distributor until the process is
/// asked to shut down.
pub async fn serve(addr: &str, state: MarketDataState) -> std::io::Result<()> {
    let app = Router::new()
        .route("/", get(upgrade))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    let local_addr: SocketAddr = listener.local_addr()?;
    info!(%local_addr, "market data distributor listening");
    axum::serve(listener, app).await
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<MarketDataState>) -> Response {
    ws.on_upgrade(move |socket| distributor::run(socket, state))
}
