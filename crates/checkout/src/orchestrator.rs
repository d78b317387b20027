//! Order orchestrator driving the checkout state machine.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{
    NewOrder, Order, OrderError, OrderItem, OrderRequest, OrderStatus, ProductSnapshot,
    price_order,
};
use futures_util::future::try_join_all;
use order_store::{OrderStore, StoreError};
use tokio::time::{Instant, timeout_at};
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{CheckoutError, ReconciliationRecord, Result, Upstream};
use crate::services::catalog::{CatalogError, CatalogService};
use crate::services::payment::{ChargeRequest, PaymentError, PaymentService};
use crate::state::CheckoutStage;

/// Currency charged when none is configured.
pub const DEFAULT_CURRENCY: &str = "usd";

/// Turns order requests into paid, committed orders.
///
/// The orchestrator owns all partial-failure policy: catalog lookups fan out
/// concurrently, the payment processor is called once per order, and the
/// order is committed only after the charge succeeds. Nothing is retried.
///
/// Charges in flight are tracked; call [`OrderOrchestrator::shutdown`] before
/// the runtime stops so none is abandoned between charge and commit.
pub struct OrderOrchestrator<C, P, S>
where
    C: CatalogService,
    P: PaymentService,
    S: OrderStore,
{
    catalog: C,
    payment: Arc<P>,
    store: Arc<S>,
    currency: String,
    tasks: TaskTracker,
}

/// Everything the authorize-and-commit task needs, detached from the request.
struct PendingCheckout {
    request_id: Uuid,
    deadline: Instant,
    user_id: UserId,
    items: Vec<OrderItem>,
    charge: ChargeRequest,
}

impl PendingCheckout {
    fn reconciliation(&self, payment_id: Option<String>, cause: String) -> ReconciliationRecord {
        ReconciliationRecord {
            request_id: self.request_id,
            user_id: self.user_id,
            items: self.items.clone(),
            amount: self.charge.amount,
            currency: self.charge.currency.clone(),
            payment_method: self.charge.payment_method.clone(),
            payment_id,
            cause,
        }
    }
}

fn enter(stage: CheckoutStage) {
    tracing::debug!(%stage, "checkout stage");
}

/// Logs a charge with no matching order, with every field an operator needs.
fn report_unreconciled(kind: &'static str, record: &ReconciliationRecord) {
    metrics::counter!("checkout_unreconciled_payments_total", "kind" => kind).increment(1);
    tracing::error!(
        kind,
        request_id = %record.request_id,
        user_id = %record.user_id,
        items = ?record.items,
        amount_cents = record.amount.cents(),
        currency = %record.currency,
        payment_method = %record.payment_method,
        payment_id = ?record.payment_id,
        cause = %record.cause,
        "payment requires manual reconciliation"
    );
}

impl<C, P, S> OrderOrchestrator<C, P, S>
where
    C: CatalogService,
    P: PaymentService + 'static,
    S: OrderStore + 'static,
{
    /// Creates an orchestrator charging in the default currency.
    pub fn new(catalog: C, payment: P, store: S) -> Self {
        Self {
            catalog,
            payment: Arc::new(payment),
            store: Arc::new(store),
            currency: DEFAULT_CURRENCY.to_string(),
            tasks: TaskTracker::new(),
        }
    }

    /// Sets the currency passed to the payment processor.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Number of authorize-and-commit tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for every charge already issued to reach its commit outcome.
    ///
    /// Requests accepted afterwards are still tracked; this only returns once
    /// nothing is in flight.
    pub async fn shutdown(&self) {
        self.tasks.close();
        if !self.tasks.is_empty() {
            tracing::info!(in_flight = self.tasks.len(), "waiting for in-flight checkouts");
        }
        self.tasks.wait().await;
    }

    /// Validates, prices, charges and commits an order.
    ///
    /// Once the charge has been issued it runs to completion together with
    /// the commit, even if this future is dropped.
    #[tracing::instrument(
        skip(self, ctx, request),
        fields(request_id = %ctx.id(), caller = ?ctx.caller_id(), user_id = %request.user_id)
    )]
    pub async fn create_order(&self, ctx: RequestContext, request: OrderRequest) -> Result<Order> {
        metrics::counter!("checkout_requests_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.run(ctx, request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            let class = e.class();
            metrics::counter!("checkout_failures_total", "class" => class.as_str()).increment(1);
            if e.reconciliation().is_none() {
                tracing::warn!(class = class.as_str(), error = %e, "checkout rejected");
            }
        }
        result
    }

    async fn run(&self, ctx: RequestContext, request: OrderRequest) -> Result<Order> {
        enter(CheckoutStage::Validating);
        let validated = request.validate()?;

        enter(CheckoutStage::PricingAndStockCheck);
        let snapshots = self
            .lookup_products(ctx.deadline(), &validated.distinct_products())
            .await?;
        let total = price_order(&validated.items, &snapshots)?;

        enter(CheckoutStage::Authorizing);
        if ctx.is_expired() {
            return Err(CheckoutError::DeadlineExceeded {
                stage: CheckoutStage::Authorizing.as_str(),
            });
        }

        let pending = PendingCheckout {
            request_id: ctx.id(),
            deadline: ctx.deadline(),
            user_id: validated.user_id,
            items: validated.items,
            charge: ChargeRequest {
                amount: total,
                currency: self.currency.clone(),
                payment_method: validated.payment_method,
                idempotency_key: ctx.idempotency_key_value().map(str::to_string),
            },
        };

        // Dropping a JoinHandle does not cancel the task
        let on_panic = pending.reconciliation(None, String::new());
        let task = self.tasks.spawn(
            authorize_and_commit(Arc::clone(&self.payment), Arc::clone(&self.store), pending)
                .in_current_span(),
        );

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                let record = ReconciliationRecord {
                    cause: format!("authorization task failed: {join_error}"),
                    ..on_panic
                };
                report_unreconciled("outcome_unknown", &record);
                Err(CheckoutError::PaymentOutcomeUnknown(Box::new(record)))
            }
        }
    }

    /// Fetches one snapshot per distinct product, concurrently.
    ///
    /// The first failure wins and the remaining lookups are dropped.
    async fn lookup_products(
        &self,
        deadline: Instant,
        products: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductSnapshot>> {
        let lookups = products.iter().map(|&product_id| async move {
            metrics::counter!("catalog_lookups_total").increment(1);
            match timeout_at(deadline, self.catalog.get_product(product_id)).await {
                Ok(Ok(snapshot)) => Ok((product_id, snapshot)),
                Ok(Err(CatalogError::NotFound(id))) => {
                    Err(CheckoutError::InvalidRequest(OrderError::UnknownProduct(id)))
                }
                Ok(Err(e)) => Err(CheckoutError::UpstreamUnavailable {
                    service: Upstream::Catalog,
                    reason: e.to_string(),
                }),
                Err(_) => Err(CheckoutError::DeadlineExceeded {
                    stage: CheckoutStage::PricingAndStockCheck.as_str(),
                }),
            }
        });

        Ok(try_join_all(lookups).await?.into_iter().collect())
    }

    /// Reads a single order.
    #[tracing::instrument(skip(self, ctx), fields(request_id = %ctx.id()))]
    pub async fn get_order(&self, ctx: RequestContext, order_id: OrderId) -> Result<Order> {
        timeout_at(ctx.deadline(), self.store.get_order(order_id))
            .await
            .map_err(|_| CheckoutError::DeadlineExceeded { stage: "get_order" })??
            .ok_or(CheckoutError::OrderNotFound(order_id))
    }

    /// Reads all orders of a user, most recent first.
    #[tracing::instrument(skip(self, ctx), fields(request_id = %ctx.id()))]
    pub async fn list_orders(&self, ctx: RequestContext, user_id: UserId) -> Result<Vec<Order>> {
        Ok(timeout_at(ctx.deadline(), self.store.list_orders_by_user(user_id))
            .await
            .map_err(|_| CheckoutError::DeadlineExceeded {
                stage: "list_orders",
            })??)
    }
}

/// Issues the single charge and, only on success, commits the order.
///
/// Runs as a detached task so that cancelling the inbound request cannot
/// leave a charge without its commit attempt.
async fn authorize_and_commit<P, S>(
    payment: Arc<P>,
    store: Arc<S>,
    pending: PendingCheckout,
) -> Result<Order>
where
    P: PaymentService + ?Sized,
    S: OrderStore + ?Sized,
{
    let authorization = match timeout_at(pending.deadline, payment.charge(pending.charge.clone()))
        .await
    {
        Ok(Ok(authorization)) => authorization,
        Ok(Err(PaymentError::Declined(reason))) => {
            return Err(CheckoutError::PaymentDeclined(reason));
        }
        Ok(Err(PaymentError::Unavailable(reason))) => {
            return Err(CheckoutError::UpstreamUnavailable {
                service: Upstream::Payment,
                reason,
            });
        }
        Ok(Err(PaymentError::OutcomeUnknown(reason))) => {
            let record = pending.reconciliation(None, reason);
            report_unreconciled("outcome_unknown", &record);
            return Err(CheckoutError::PaymentOutcomeUnknown(Box::new(record)));
        }
        Err(_) => {
            let record = pending.reconciliation(
                None,
                "deadline expired while awaiting the payment processor".to_string(),
            );
            report_unreconciled("outcome_unknown", &record);
            return Err(CheckoutError::PaymentOutcomeUnknown(Box::new(record)));
        }
    };

    enter(CheckoutStage::Committing);
    let new_order = NewOrder {
        user_id: pending.user_id,
        items: pending.items.clone(),
        total_amount: pending.charge.amount,
        status: OrderStatus::Confirmed,
        // Stored timestamps keep microseconds; reads must match the response
        created_at: Utc::now().trunc_subsecs(6),
        payment_id: Some(authorization.payment_id.clone()),
    };

    let cause = match timeout_at(pending.deadline, store.create_order(new_order.clone())).await {
        Ok(Ok(order_id)) => {
            enter(CheckoutStage::Done);
            metrics::counter!("checkout_orders_created_total").increment(1);
            tracing::info!(
                %order_id,
                payment_id = %authorization.payment_id,
                total = %new_order.total_amount,
                "order created"
            );
            return Ok(new_order.into_order(order_id));
        }
        Ok(Err(StoreError::DuplicatePayment { order_id, .. })) => {
            // A replayed idempotency key: the processor returned the original charge
            tracing::info!(
                %order_id,
                payment_id = %authorization.payment_id,
                "order already recorded for this payment"
            );
            return replayed_order(store.as_ref(), pending.deadline, order_id).await;
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => "deadline expired while committing the order".to_string(),
    };

    let record = pending.reconciliation(Some(authorization.payment_id), cause);
    report_unreconciled("captured_not_recorded", &record);
    Err(CheckoutError::PaymentCapturedOrderNotRecorded(Box::new(record)))
}

/// Loads the order an earlier request committed for the same charge.
async fn replayed_order<S>(store: &S, deadline: Instant, order_id: OrderId) -> Result<Order>
where
    S: OrderStore + ?Sized,
{
    match timeout_at(deadline, store.get_order(order_id)).await {
        Ok(Ok(Some(order))) => Ok(order),
        Ok(Ok(None)) => Err(CheckoutError::Store(StoreError::InvalidData(format!(
            "order {order_id} recorded for payment is missing"
        )))),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(CheckoutError::DeadlineExceeded {
            stage: CheckoutStage::Committing.as_str(),
        }),
    }
}
