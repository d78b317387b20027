//! HTTP client for the remote catalog service.

use async_trait::async_trait;
use common::ProductId;
use domain::{Money, ProductSnapshot};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::catalog::{CatalogError, CatalogService};

/// Product as published by the catalog service.
#[derive(Deserialize)]
struct ProductResponse {
    product_id: String,
    name: String,
    price: f64,
    quantity: i32,
}

/// Catalog client speaking `GET {base_url}/products/{id}`.
#[derive(Debug, Clone)]
pub struct HttpCatalogService {
    client: Client,
    base_url: String,
}

impl HttpCatalogService {
    /// Creates a client. The base URL must not end with a slash.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ProductResponse {
    fn into_snapshot(self, requested: ProductId) -> Result<ProductSnapshot, CatalogError> {
        if self.product_id != requested.to_string() {
            return Err(CatalogError::InvalidResponse(format!(
                "asked for product {requested}, got {}",
                self.product_id
            )));
        }
        let unit_price = Money::from_major_units(self.price).ok_or_else(|| {
            CatalogError::InvalidResponse(format!(
                "invalid price {} for product {requested}",
                self.price
            ))
        })?;
        let stock = u32::try_from(self.quantity).map_err(|_| {
            CatalogError::InvalidResponse(format!(
                "negative stock {} for product {requested}",
                self.quantity
            ))
        })?;

        Ok(ProductSnapshot::new(requested, self.name, unit_price, stock))
    }
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    #[tracing::instrument(skip(self), fields(base_url = %self.base_url))]
    async fn get_product(&self, product_id: ProductId) -> Result<ProductSnapshot, CatalogError> {
        let response = self
            .client
            .get(format!("{}/products/{}", self.base_url, product_id))
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(CatalogError::NotFound(product_id)),
            status => {
                return Err(CatalogError::Unavailable(format!(
                    "catalog returned HTTP {status}"
                )));
            }
        }

        let body: ProductResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

        body.into_snapshot(product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(price: f64, quantity: i32) -> ProductResponse {
        ProductResponse {
            product_id: "1".to_string(),
            name: "Mechanical Keyboard".to_string(),
            price,
            quantity,
        }
    }

    #[test]
    fn test_snapshot_conversion() {
        let snapshot = response(10.0, 5).into_snapshot(ProductId::new(1)).unwrap();
        assert_eq!(snapshot.unit_price, Money::from_cents(1000));
        assert_eq!(snapshot.stock, 5);
        assert_eq!(snapshot.name, "Mechanical Keyboard");
    }

    #[test]
    fn test_rejects_bad_catalog_data() {
        for bad in [response(-1.0, 5), response(f64::NAN, 5), response(1.0, -3)] {
            assert!(matches!(
                bad.into_snapshot(ProductId::new(1)),
                Err(CatalogError::InvalidResponse(_))
            ));
        }
    }

    #[test]
    fn test_rejects_mismatched_product() {
        let result = response(1.0, 1).into_snapshot(ProductId::new(2));
        assert!(matches!(result, Err(CatalogError::InvalidResponse(_))));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let service = HttpCatalogService::new(Client::new(), "http://catalog:8080/");
        assert_eq!(service.base_url(), "http://catalog:8080");
    }
}
