use matchbook::book::OrderBookActor;
use matchbook::config::Config;
use matchbook::gateway::{self, GatewayState};
use matchbook::marketdata::{self, MarketDataState};
use matchbook::store::TradeStore;
use matchbook::{events, flush};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let config = Config::load();

    let store = match TradeStore::open(&config.db_path) {
        Ok(store) => store,
        Err(err) => {
            error!(%err, "failed to open trade store");
            return ExitCode::FAILURE;
        }
    };

    let event_bus = events::new_bus();
    let (flush_requested_tx, flush_requested_rx) = mpsc::channel(1);
    let book = OrderBookActor::spawn(
        config.symbol.clone(),
        event_bus.clone(),
        config.flush_threshold,
        flush_requested_tx,
    );

    tokio::spawn(flush::run(
        book.clone(),
        store.clone(),
        Duration::from_secs_f64(config.flush_period_secs),
        flush_requested_rx,
    ));

    let gateway_state = GatewayState::new(book.clone());
    let market_data_state = MarketDataState::new(
        book.clone(),
        store.clone(),
        event_bus.clone(),
        Duration::from_secs_f64(config.order_book_broadcast_interval_secs),
    );

    let gateway_addr = config.order_gateway_addr.clone();
    let market_data_addr = config.market_data_addr.clone();

    let gateway_task = tokio::spawn(async move { gateway::serve(&gateway_addr, gateway_state).await });
    let market_data_task =
        tokio::spawn(async move { marketdata::serve(&market_data_addr, market_data_state).await });

    info!(symbol = %config.symbol, "exchange started");

    tokio::select! {
        result = gateway_task => {
            report_exit("order gateway", result).await
        }
        result = market_data_task => {
            report_exit("market data distributor", result).await
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            ExitCode::SUCCESS
        }
    }
}

async fn report_exit(
    name: &str,
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> ExitCode {
    match result {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            error!(%err, "{name} exited with an error");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(%err, "{name} task panicked");
            ExitCode::FAILURE
        }
    }
}
