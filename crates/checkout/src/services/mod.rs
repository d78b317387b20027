//! Remote collaborator traits with in-memory and HTTP implementations.

pub mod catalog;
pub mod catalog_http;
pub mod payment;
pub mod payment_http;

pub use catalog::{CatalogError, CatalogService, InMemoryCatalogService};
pub use catalog_http::HttpCatalogService;
pub use payment::{
    Authorization, ChargeBehavior, ChargeRequest, InMemoryPaymentService, PaymentError,
    PaymentService,
};
pub use payment_http::HttpPaymentService;
