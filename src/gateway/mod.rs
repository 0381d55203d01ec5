//! The order gateway: the public-facing WebSocket endpoint traders
//! submit and cancel orders on.

mod session;

use crate::book::{BookHandle, Trade};
use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use axum::routing::get;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Per-connection channel counterparty trade notices are delivered
/// through: each sent value is a single-element trade list.
type SessionSender = mpsc::Sender<Vec<Trade>>;

/// Shared state every gateway connection handler needs.
#[derive(Clone)]
pub struct GatewayState {
    book: BookHandle,
    sessions: Arc<Mutex<HashMap<Uuid, SessionSender>>>,
}

impl GatewayState {
    /// Builds gateway state around a handle to the book actor.
    pub fn new(book: BookHandle) -> Self {
        Self {
            book,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Binds and serves the order gateway until the process is asked to
/// shut down.
pub async fn serve(addr: &str, state: GatewayState) -> std::io::Result<()> {
    let app = Router::new()
        .route("/", get(upgrade))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    let local_addr: SocketAddr = listener.local_addr()?;
    info!(%local_addr, "order gateway listening");
    axum::serve(listener, app).await
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| session::run(socket, state))
}
