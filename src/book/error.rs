//! Order book error types.

use std::fmt;
use uuid::Uuid;

/// Errors that can occur while submitting or cancelling an order.
#[derive(Debug)]
#[non_exhaustive]
pub enum BookError {
    /// The order's limit price was zero or negative.
    InvalidPrice {
        /// The rejected price.
        price: rust_decimal::Decimal,
    },

    /// The order's quantity was zero.
    InvalidQuantity,

    /// An order with this id is already resting in the book.
    DuplicateOrderId {
        /// The id that was already present.
        order_id: Uuid,
    },

    /// A cancel was requested for an id that is not currently resting.
    UnknownOrder {
        /// The id that could not be found.
        order_id: Uuid,
    },
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::InvalidPrice { price } => {
                write!(f, "invalid order price: {price}")
            }
            BookError::InvalidQuantity => write!(f, "order quantity must be greater than zero"),
            BookError::DuplicateOrderId { order_id } => {
                write!(f, "duplicate order id: {order_id}")
            }
            BookError::UnknownOrder { order_id } => {
                write!(f, "unknown order id: {order_id}")
            }
        }
    }
}

impl std::error::Error for BookError {}
