//! Inbound create-order requests and their validation.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderItem};

/// A caller-supplied request to place an order.
///
/// Identifiers arrive string-encoded, exactly as received on the wire.
/// Nothing here is trusted until [`OrderRequest::validate`] succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: String,
    pub items: Vec<LineItemRequest>,
    /// Opaque payment-method reference, only interpreted by the payment processor.
    pub payment_method: String,
}

/// One requested line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: i32,
}

impl LineItemRequest {
    pub fn new(product_id: impl Into<String>, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A request whose shape has been checked and whose identifiers are typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub payment_method: String,
}

impl OrderRequest {
    pub fn new(
        user_id: impl Into<String>,
        items: Vec<LineItemRequest>,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            items,
            payment_method: payment_method.into(),
        }
    }

    /// Checks the request shape, reporting the first rule that fails.
    ///
    /// Rules, in order: at least one item, a non-blank payment method,
    /// a well-formed user ID, then for each item a well-formed product ID
    /// and a positive quantity.
    pub fn validate(&self) -> Result<ValidatedOrder, OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if self.payment_method.trim().is_empty() {
            return Err(OrderError::PaymentMethodRequired);
        }

        let user_id = UserId::parse(&self.user_id)?;

        let items = self
            .items
            .iter()
            .map(|line| {
                let product_id = ProductId::parse(&line.product_id)?;
                let quantity = u32::try_from(line.quantity)
                    .ok()
                    .filter(|q| *q > 0)
                    .ok_or(OrderError::InvalidQuantity {
                        product_id: line.product_id.clone(),
                        quantity: line.quantity,
                    })?;
                Ok(OrderItem::new(product_id, quantity))
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        Ok(ValidatedOrder {
            user_id,
            items,
            payment_method: self.payment_method.clone(),
        })
    }
}

impl ValidatedOrder {
    /// Distinct products in first-seen order. Each needs exactly one catalog lookup.
    pub fn distinct_products(&self) -> Vec<ProductId> {
        let mut seen = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.contains(&item.product_id) {
                seen.push(item.product_id);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(items: Vec<LineItemRequest>) -> OrderRequest {
        OrderRequest::new("1", items, "pm_mock")
    }

    #[test]
    fn test_valid_request() {
        let validated = request(vec![
            LineItemRequest::new("1", 2),
            LineItemRequest::new("5", 1),
        ])
        .validate()
        .unwrap();

        assert_eq!(validated.user_id, UserId::new(1));
        assert_eq!(
            validated.items,
            vec![
                OrderItem::new(ProductId::new(1), 2),
                OrderItem::new(ProductId::new(5), 1),
            ]
        );
        assert_eq!(validated.payment_method, "pm_mock");
    }

    #[test]
    fn test_empty_items_rejected() {
        assert!(matches!(
            request(vec![]).validate(),
            Err(OrderError::NoItems)
        ));
    }

    #[test]
    fn test_blank_payment_method_rejected() {
        let req = OrderRequest::new("1", vec![LineItemRequest::new("1", 1)], "  ");
        assert!(matches!(
            req.validate(),
            Err(OrderError::PaymentMethodRequired)
        ));
    }

    #[test]
    fn test_empty_items_reported_before_payment_method() {
        let req = OrderRequest::new("1", vec![], "");
        assert!(matches!(req.validate(), Err(OrderError::NoItems)));
    }

    #[test]
    fn test_malformed_user_id_rejected() {
        let req = OrderRequest::new("abc", vec![LineItemRequest::new("1", 1)], "pm");
        let err = req.validate().unwrap_err();
        assert!(matches!(err, OrderError::InvalidIdentifier(ref e) if e.kind == "user ID"));
    }

    #[test]
    fn test_malformed_product_id_rejected() {
        let err = request(vec![LineItemRequest::new("1", 1), LineItemRequest::new("x1", 1)])
            .validate()
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidIdentifier(ref e) if e.value == "x1"));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        for quantity in [0, -4] {
            let err = request(vec![LineItemRequest::new("3", quantity)])
                .validate()
                .unwrap_err();
            assert!(matches!(
                err,
                OrderError::InvalidQuantity { ref product_id, quantity: q }
                    if product_id == "3" && q == quantity
            ));
        }
    }

    #[test]
    fn test_distinct_products_preserves_first_seen_order() {
        let validated = request(vec![
            LineItemRequest::new("4", 1),
            LineItemRequest::new("2", 1),
            LineItemRequest::new("4", 3),
        ])
        .validate()
        .unwrap();

        assert_eq!(
            validated.distinct_products(),
            vec![ProductId::new(4), ProductId::new(2)]
        );
        assert_eq!(validated.items.len(), 3);
    }
}
