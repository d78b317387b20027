//! Pricing and stock rules applied to catalog snapshots.

use std::collections::HashMap;

use common::ProductId;
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderItem};

/// Price and stock of a product as observed in the catalog at one point in time.
///
/// Snapshots are used to compute the order total and check stock; they are
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    /// Units available when the snapshot was taken.
    pub stock: u32,
}

impl ProductSnapshot {
    pub fn new(product_id: ProductId, name: impl Into<String>, unit_price: Money, stock: u32) -> Self {
        Self {
            product_id,
            name: name.into(),
            unit_price,
            stock,
        }
    }
}

/// Computes the authoritative order total from the given snapshots.
///
/// Requested quantities are summed per product before comparing against stock,
/// so repeating a product across line items cannot bypass the check. The first
/// offending item in request order is reported.
pub fn price_order(
    items: &[OrderItem],
    snapshots: &HashMap<ProductId, ProductSnapshot>,
) -> Result<Money, OrderError> {
    let mut requested: HashMap<ProductId, u64> = HashMap::with_capacity(snapshots.len());
    for item in items {
        *requested.entry(item.product_id).or_default() += u64::from(item.quantity);
    }

    let mut total = Money::zero();
    for item in items {
        let snapshot = snapshots
            .get(&item.product_id)
            .ok_or(OrderError::UnknownProduct(item.product_id))?;

        let wanted = requested[&item.product_id];
        if wanted > u64::from(snapshot.stock) {
            return Err(OrderError::InsufficientStock {
                product_id: item.product_id,
                requested: wanted,
                available: snapshot.stock,
            });
        }

        let line_total = snapshot
            .unit_price
            .checked_multiply(item.quantity)
            .ok_or(OrderError::TotalOverflow)?;
        total = total
            .checked_add(line_total)
            .ok_or(OrderError::TotalOverflow)?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(entries: &[(i64, i64, u32)]) -> HashMap<ProductId, ProductSnapshot> {
        entries
            .iter()
            .map(|&(id, cents, stock)| {
                let product_id = ProductId::new(id);
                (
                    product_id,
                    ProductSnapshot::new(product_id, format!("Product {id}"), Money::from_cents(cents), stock),
                )
            })
            .collect()
    }

    fn item(id: i64, quantity: u32) -> OrderItem {
        OrderItem::new(ProductId::new(id), quantity)
    }

    #[test]
    fn test_total_is_sum_of_price_times_quantity() {
        let snapshots = catalog(&[(1, 1000, 10), (2, 250, 10)]);
        let total = price_order(&[item(1, 2), item(2, 3)], &snapshots).unwrap();
        assert_eq!(total, Money::from_cents(2750));
    }

    #[test]
    fn test_quantity_equal_to_stock_is_allowed() {
        let snapshots = catalog(&[(1, 1000, 2)]);
        assert_eq!(
            price_order(&[item(1, 2)], &snapshots).unwrap(),
            Money::from_cents(2000)
        );
    }

    #[test]
    fn test_insufficient_stock() {
        let snapshots = catalog(&[(1, 1000, 1)]);
        let err = price_order(&[item(1, 2)], &snapshots).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock { requested: 2, available: 1, .. }
        ));
    }

    #[test]
    fn test_repeated_product_is_checked_in_aggregate() {
        let snapshots = catalog(&[(1, 100, 3)]);
        let err = price_order(&[item(1, 2), item(1, 2)], &snapshots).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock { requested: 4, available: 3, .. }
        ));
    }

    #[test]
    fn test_missing_snapshot_is_unknown_product() {
        let snapshots = catalog(&[(1, 100, 3)]);
        let err = price_order(&[item(1, 1), item(8, 1)], &snapshots).unwrap_err();
        assert!(matches!(err, OrderError::UnknownProduct(id) if id == ProductId::new(8)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let snapshots = catalog(&[(1, i64::MAX / 2, u32::MAX)]);
        let err = price_order(&[item(1, 3)], &snapshots).unwrap_err();
        assert!(matches!(err, OrderError::TotalOverflow));
    }

    #[test]
    fn test_free_items_total_zero() {
        let snapshots = catalog(&[(1, 0, 5)]);
        assert!(price_order(&[item(1, 5)], &snapshots).unwrap().is_zero());
    }
}
