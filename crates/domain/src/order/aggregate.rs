//! The order aggregate: header plus its immutable line items.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderItem, OrderStatus};

/// A committed order.
///
/// Orders are created exactly once, by checkout, after payment has been
/// authorized. They are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderItem>,
    /// Sum of unit price x quantity as observed in the catalog at creation time.
    total_amount: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Reassembles an order from its persisted parts.
    pub fn from_parts(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        total_amount: Money,
        status: OrderStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            items,
            total_amount,
            status,
            created_at,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Line items in the order they were requested.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// An order that has been paid for but not yet assigned an identifier.
///
/// This is what checkout hands to the order store for the atomic commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Processor authorization this order was paid with. The store keeps at
    /// most one order per payment.
    pub payment_id: Option<String>,
}

impl NewOrder {
    /// Completes the order with the identifier assigned by the store.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            user_id: self.user_id,
            items: self.items,
            total_amount: self.total_amount,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;

    #[test]
    fn test_into_order_keeps_every_field() {
        let created_at = Utc::now();
        let new_order = NewOrder {
            user_id: UserId::new(1),
            items: vec![
                OrderItem::new(ProductId::new(1), 2),
                OrderItem::new(ProductId::new(9), 1),
            ],
            total_amount: Money::from_cents(2500),
            status: OrderStatus::Confirmed,
            payment_id: None,
            created_at,
        };

        let order = new_order.clone().into_order(OrderId::new(17));

        assert_eq!(order.id(), OrderId::new(17));
        assert_eq!(order.user_id(), new_order.user_id);
        assert_eq!(order.items(), new_order.items.as_slice());
        assert_eq!(order.total_amount(), Money::from_cents(2500));
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.created_at(), created_at);
    }
}
