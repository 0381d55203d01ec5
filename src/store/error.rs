//! Trade store error types.

use std::fmt;

/// Errors raised by [`super::TradeStore`].
#[derive(Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// The requested OHLC bucket interval was not positive.
    InvalidInterval {
        /// The rejected interval, in seconds.
        seconds: f64,
    },
    /// The underlying SQLite connection returned an error.
    Unavailable {
        /// The underlying error message.
        message: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidInterval { seconds } => {
                write!(f, "invalid OHLC interval: {seconds} seconds")
            }
            StoreError::Unavailable { message } => {
                write!(f, "trade store unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable {
            message: err.to_string(),
        }
    }
}
