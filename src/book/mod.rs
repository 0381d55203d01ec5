//! The matching engine: price-time priority limit order book running on
//! its own dedicated task.

pub mod actor;
pub mod engine;
pub mod error;
pub mod level;
pub mod types;

pub use actor::{BookHandle, OrderBookActor};
pub use engine::{BookSnapshot, LevelSnapshot, OrderBookState};
pub use error::BookError;
pub use types::{Order, Side, Trade, now_seconds};
