//! Checkout error types.

use common::{OrderId, UserId};
use domain::{Money, OrderError, OrderItem};
use order_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Remote collaborator that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Upstream {
    Catalog,
    Payment,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Catalog => "catalog",
            Upstream::Payment => "payment processor",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse failure classes used for metrics and the transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    ClientInput,
    PaymentDeclined,
    UpstreamUnavailable,
    DeadlineExceeded,
    AmbiguousPayment,
    PostAuthorizationPersistenceFailure,
    NotFound,
    Internal,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::ClientInput => "client_input",
            FailureClass::PaymentDeclined => "payment_declined",
            FailureClass::UpstreamUnavailable => "upstream_unavailable",
            FailureClass::DeadlineExceeded => "deadline_exceeded",
            FailureClass::AmbiguousPayment => "ambiguous_payment",
            FailureClass::PostAuthorizationPersistenceFailure => {
                "post_authorization_persistence_failure"
            }
            FailureClass::NotFound => "not_found",
            FailureClass::Internal => "internal",
        }
    }

    /// Whether the caller may blindly resend the same request.
    ///
    /// Never true once money may have moved.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureClass::UpstreamUnavailable
                | FailureClass::DeadlineExceeded
                | FailureClass::Internal
        )
    }
}

/// What an operator needs to settle a charge that has no matching order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationRecord {
    pub request_id: Uuid,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub amount: Money,
    pub currency: String,
    pub payment_method: String,
    /// Processor reference, when the processor confirmed the charge.
    pub payment_id: Option<String>,
    pub cause: String,
}

/// Errors that can occur while creating or reading orders.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed request, unknown product, insufficient stock or an unrepresentable total.
    #[error(transparent)]
    InvalidRequest(#[from] OrderError),

    /// The processor refused the charge; no money moved.
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// A collaborator could not be reached before any charge was issued.
    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable { service: Upstream, reason: String },

    /// The request deadline expired before authorization started, or during a read.
    #[error("Deadline exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str },

    /// The processor may or may not have charged.
    #[error("Payment outcome unknown: {}", .0.cause)]
    PaymentOutcomeUnknown(Box<ReconciliationRecord>),

    /// The processor charged but the order could not be committed.
    #[error("Payment captured but order not recorded: {}", .0.cause)]
    PaymentCapturedOrderNotRecorded(Box<ReconciliationRecord>),

    /// No order has this identifier.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Order store failure outside the commit step.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    pub fn class(&self) -> FailureClass {
        match self {
            CheckoutError::InvalidRequest(_) => FailureClass::ClientInput,
            CheckoutError::PaymentDeclined(_) => FailureClass::PaymentDeclined,
            CheckoutError::UpstreamUnavailable { .. } => FailureClass::UpstreamUnavailable,
            CheckoutError::DeadlineExceeded { .. } => FailureClass::DeadlineExceeded,
            CheckoutError::PaymentOutcomeUnknown(_) => FailureClass::AmbiguousPayment,
            CheckoutError::PaymentCapturedOrderNotRecorded(_) => {
                FailureClass::PostAuthorizationPersistenceFailure
            }
            CheckoutError::OrderNotFound(_) => FailureClass::NotFound,
            CheckoutError::Store(_) => FailureClass::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }

    /// The reconciliation record, for failures that left a charge unmatched.
    pub fn reconciliation(&self) -> Option<&ReconciliationRecord> {
        match self {
            CheckoutError::PaymentOutcomeUnknown(record)
            | CheckoutError::PaymentCapturedOrderNotRecorded(record) => Some(record),
            _ => None,
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
