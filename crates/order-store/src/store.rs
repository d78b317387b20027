use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{NewOrder, Order};

use crate::{Result, StoreError};

/// Core trait for order store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order and all of its items, returning the assigned identifier.
    ///
    /// The write is atomic - either the header and every item become visible
    /// together, or nothing does. An order carrying a `payment_id` that is
    /// already stored is rejected with [`StoreError::DuplicatePayment`] naming
    /// the existing order.
    async fn create_order(&self, order: NewOrder) -> Result<OrderId>;

    /// Retrieves an order with its items.
    ///
    /// Returns None if no order has this identifier.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves all orders placed by a user, most recent first.
    async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create_order(&self, order: NewOrder) -> Result<OrderId> {
        (**self).create_order(order).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        (**self).get_order(order_id).await
    }

    async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        (**self).list_orders_by_user(user_id).await
    }
}

/// Validates an order before it is written.
pub fn validate_new_order(order: &NewOrder) -> Result<()> {
    if order.items.is_empty() {
        return Err(StoreError::EmptyOrder);
    }
    if order.items.iter().any(|item| item.quantity == 0) {
        return Err(StoreError::InvalidData(
            "Item quantities must be greater than 0".to_string(),
        ));
    }
    if order.total_amount.cents() < 0 {
        return Err(StoreError::InvalidData(
            "Order total must not be negative".to_string(),
        ));
    }
    Ok(())
}
