use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
///
/// "No such order" is not an error: reads return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order to create has no line items.
    #[error("Cannot store an order without items")]
    EmptyOrder,

    /// An order paid with this authorization already exists.
    #[error("Payment {payment_id} is already recorded as order {order_id}")]
    DuplicatePayment { payment_id: String, order_id: OrderId },

    /// A stored row does not map back to a valid order.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// The backing store refused or failed the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
