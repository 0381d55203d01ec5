//! Process configuration, parsed from the command line.

use clap::Parser;

/// A simulated single-symbol electronic exchange.
#[derive(Debug, Parser)]
#[command(name = "matchbookd", version, about)]
pub struct Config {
    /// Symbol this exchange trades.
    #[arg(long, default_value = "XYZ")]
    pub symbol: String,

    /// Address the order gateway listens on.
    #[arg(long, default_value = "127.0.0.1:8765")]
    pub order_gateway_addr: String,

    /// Address the market-data distributor listens on.
    #[arg(long, default_value = "127.0.0.1:8766")]
    pub market_data_addr: String,

    /// Path to the SQLite trade store. `:memory:` for an ephemeral store.
    #[arg(long, default_value = "trades.db")]
    pub db_path: String,

    /// How many pending trades accumulate before an out-of-band flush is
    /// triggered, independent of the periodic flush.
    #[arg(long, default_value_t = 100)]
    pub flush_threshold: usize,

    /// How often, in seconds, the pending trade buffer is flushed even if
    /// the threshold has not been reached.
    #[arg(long, default_value_t = 5.0)]
    pub flush_period_secs: f64,

    /// How often, in seconds, each order-book-subscribed market-data
    /// session receives a fresh snapshot.
    #[arg(long, default_value_t = 0.5)]
    pub order_book_broadcast_interval_secs: f64,
}

impl Config {
    /// Parses configuration from `std::env::args()`.
    pub fn load() -> Self {
        Config::parse()
    }
}
