//! Order aggregate, checkout requests and pricing rules.

mod aggregate;
mod pricing;
mod request;
mod state;
mod value_objects;

pub use aggregate::{NewOrder, Order};
pub use pricing::{ProductSnapshot, price_order};
pub use request::{LineItemRequest, OrderRequest, ValidatedOrder};
pub use state::{OrderStatus, UnknownStatus};
pub use value_objects::{Money, OrderItem};

use common::{IdParseError, ProductId};
use thiserror::Error;

/// Client-input errors: the request cannot be turned into an order as given.
///
/// None of these are worth retrying without changing the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The request has no line items.
    #[error("Order has no items")]
    NoItems,

    /// The payment-method reference is missing.
    #[error("Payment method is required")]
    PaymentMethodRequired,

    /// A user or product identifier is not a well-formed integer.
    #[error(transparent)]
    InvalidIdentifier(#[from] IdParseError),

    /// A line item asked for zero or fewer units.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: String, quantity: i32 },

    /// The catalog has no such product.
    #[error("Product not found: {0}")]
    UnknownProduct(ProductId),

    /// More units were requested than the catalog had in stock.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    /// The order total does not fit in the money representation.
    #[error("Order total is too large")]
    TotalOverflow,
}
