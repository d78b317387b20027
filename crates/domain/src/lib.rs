//! Domain layer for checkout.
//!
//! This crate provides:
//! - the committed `Order` aggregate and its line items
//! - `OrderRequest` validation into a typed `ValidatedOrder`
//! - `ProductSnapshot` and the pricing/stock rules that freeze the order total

pub mod order;

pub use order::{
    LineItemRequest, Money, NewOrder, Order, OrderError, OrderItem, OrderRequest, OrderStatus,
    ProductSnapshot, UnknownStatus, ValidatedOrder, price_order,
};
