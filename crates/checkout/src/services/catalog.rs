//! Catalog lookup trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use domain::{Money, ProductSnapshot};
use thiserror::Error;

/// Catalog lookup failures.
///
/// `NotFound` is the only variant the caller can fix by changing the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),
}

/// Trait for resolving products to their current price and stock.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetches the current snapshot of a product. Has no side effects.
    async fn get_product(&self, product_id: ProductId) -> Result<ProductSnapshot, CatalogError>;
}

#[async_trait]
impl<T: CatalogService + ?Sized> CatalogService for Arc<T> {
    async fn get_product(&self, product_id: ProductId) -> Result<ProductSnapshot, CatalogError> {
        (**self).get_product(product_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, ProductSnapshot>,
    lookups: usize,
    unavailable: bool,
    hang: bool,
    latency: Option<Duration>,
}

/// In-memory catalog for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogService {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogService {
    /// Creates an empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog seeded with a handful of products, ids 1 to 5.
    pub fn with_sample_products() -> Self {
        let catalog = Self::new();
        for (id, name, cents, stock) in [
            (1, "Mechanical Keyboard", 1000, 100),
            (2, "Wireless Mouse", 2499, 50),
            (3, "USB-C Hub", 3999, 25),
            (4, "27\" Monitor", 24999, 10),
            (5, "Laptop Stand", 4550, 0),
        ] {
            catalog.insert_product(ProductSnapshot::new(
                ProductId::new(id),
                name,
                Money::from_cents(cents),
                stock,
            ));
        }
        catalog
    }

    /// Adds or replaces a product.
    pub fn insert_product(&self, product: ProductSnapshot) {
        self.write().products.insert(product.product_id, product);
    }

    /// Makes every subsequent lookup fail as unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Makes every subsequent lookup wait forever.
    pub fn set_hang(&self, hang: bool) {
        self.write().hang = hang;
    }

    /// Delays every subsequent lookup.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.write().latency = latency;
    }

    /// Returns the number of lookups served, including failed ones.
    pub fn lookup_count(&self) -> usize {
        self.read().lookups
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryCatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryCatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn get_product(&self, product_id: ProductId) -> Result<ProductSnapshot, CatalogError> {
        // The guard must be released before any await point
        let (hang, latency, unavailable) = {
            let mut state = self.write();
            state.lookups += 1;
            (state.hang, state.latency, state.unavailable)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if unavailable {
            return Err(CatalogError::Unavailable(
                "catalog is not reachable".to_string(),
            ));
        }

        self.read()
            .products
            .get(&product_id)
            .cloned()
            .ok_or(CatalogError::NotFound(product_id))
    }
}
