//! Integration tests for the order domain.
//!
//! These tests walk a request through validation and pricing into a committed
//! order, the same path checkout takes minus the remote calls.

use std::collections::HashMap;

use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{
    LineItemRequest, Money, NewOrder, OrderError, OrderItem, OrderRequest, OrderStatus,
    ProductSnapshot, price_order,
};

fn snapshot(id: i64, price: f64, stock: u32) -> (ProductId, ProductSnapshot) {
    let product_id = ProductId::new(id);
    (
        product_id,
        ProductSnapshot::new(
            product_id,
            format!("Product {id}"),
            Money::from_major_units(price).unwrap(),
            stock,
        ),
    )
}

mod order_lifecycle {
    use super::*;

    #[test]
    fn single_item_order_totals_twenty_dollars() {
        let request = OrderRequest::new("1", vec![LineItemRequest::new("1", 2)], "pm_mock");
        let catalog: HashMap<_, _> = [snapshot(1, 10.0, 5)].into_iter().collect();

        let validated = request.validate().unwrap();
        let total = price_order(&validated.items, &catalog).unwrap();

        let order = NewOrder {
            user_id: validated.user_id,
            items: validated.items.clone(),
            total_amount: total,
            status: OrderStatus::Confirmed,
            payment_id: None,
            created_at: Utc::now(),
        }
        .into_order(OrderId::new(1));

        assert_eq!(order.total_amount().as_major_units(), 20.0);
        assert_eq!(order.status().as_str(), "Confirmed");
        assert_eq!(order.user_id(), UserId::new(1));
        assert_eq!(order.items(), &[OrderItem::new(ProductId::new(1), 2)]);
    }

    #[test]
    fn multi_item_order_keeps_request_order_and_prices() {
        let request = OrderRequest::new(
            "7",
            vec![
                LineItemRequest::new("3", 1),
                LineItemRequest::new("1", 4),
                LineItemRequest::new("2", 2),
            ],
            "pm_card_visa",
        );
        let catalog: HashMap<_, _> = [snapshot(1, 2.5, 10), snapshot(2, 19.99, 2), snapshot(3, 0.99, 1)]
            .into_iter()
            .collect();

        let validated = request.validate().unwrap();
        let total = price_order(&validated.items, &catalog).unwrap();

        // 0.99 + 4 * 2.50 + 2 * 19.99
        assert_eq!(total, Money::from_cents(99 + 1000 + 3998));
        let ids: Vec<i64> = validated
            .items
            .iter()
            .map(|i| i.product_id.as_i64())
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}

mod rejections {
    use super::*;

    #[test]
    fn stock_shortfall_names_the_product() {
        let request = OrderRequest::new(
            "1",
            vec![LineItemRequest::new("1", 1), LineItemRequest::new("2", 3)],
            "pm",
        );
        let catalog: HashMap<_, _> = [snapshot(1, 1.0, 9), snapshot(2, 1.0, 2)].into_iter().collect();

        let validated = request.validate().unwrap();
        let err = price_order(&validated.items, &catalog).unwrap_err();

        assert_eq!(
            err,
            OrderError::InsufficientStock {
                product_id: ProductId::new(2),
                requested: 3,
                available: 2,
            }
        );
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 2: requested 3, available 2"
        );
    }

    #[test]
    fn malformed_identifiers_never_reach_pricing() {
        let request = OrderRequest::new("1", vec![LineItemRequest::new("one", 1)], "pm");
        let err = request.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid product ID 'one': expected a positive integer"
        );
    }
}
