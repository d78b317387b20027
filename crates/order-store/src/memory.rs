use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{NewOrder, Order};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{OrderStore, validate_new_order},
};

#[derive(Default)]
struct InMemoryState {
    orders: BTreeMap<OrderId, Order>,
    payments: HashMap<String, OrderId>,
    last_id: i64,
}

/// In-memory order store implementation for testing and local runs.
///
/// Provides the same interface and ordering guarantees as the PostgreSQL
/// implementation. Identifiers are assigned sequentially from 1.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryState>>,
    fail_on_create: Arc<AtomicBool>,
    fail_on_read: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every subsequent create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    /// Configures the store to fail every subsequent read.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.fail_on_read.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    fn check_readable(&self) -> Result<()> {
        if self.fail_on_read.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<OrderId> {
        validate_new_order(&order)?;

        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected create failure".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if let Some(payment_id) = &order.payment_id
            && let Some(&existing) = state.payments.get(payment_id)
        {
            return Err(StoreError::DuplicatePayment {
                payment_id: payment_id.clone(),
                order_id: existing,
            });
        }

        state.last_id += 1;
        let order_id = OrderId::new(state.last_id);
        if let Some(payment_id) = order.payment_id.clone() {
            state.payments.insert(payment_id, order_id);
        }
        state.orders.insert(order_id, order.into_order(order_id));

        Ok(order_id)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.check_readable()?;
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.check_readable()?;
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();

        // Most recent first; identifiers break ties the same way the SQL query does
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b.id().cmp(&a.id()))
        });
        Ok(orders)
    }
}
