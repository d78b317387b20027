//! Order-creation orchestration for checkout.
//!
//! This crate turns a validated order request into a durable, paid order by
//! coordinating three independent failure domains:
//! 1. a remote catalog (price and stock per product)
//! 2. a remote payment processor (one charge per order)
//! 3. the transactional order store (one atomic commit)
//!
//! Every failure is terminal for the request and classified by
//! [`CheckoutError`]. A charge that cannot be matched to a committed order is
//! reported with a [`ReconciliationRecord`] and never retried.

pub mod context;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod state;

pub use context::RequestContext;
pub use error::{CheckoutError, FailureClass, ReconciliationRecord, Upstream};
pub use orchestrator::{DEFAULT_CURRENCY, OrderOrchestrator};
pub use services::{
    Authorization, CatalogError, CatalogService, ChargeBehavior, ChargeRequest,
    HttpCatalogService, HttpPaymentService, InMemoryCatalogService, InMemoryPaymentService,
    PaymentError, PaymentService,
};
pub use state::CheckoutStage;
