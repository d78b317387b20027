//! Payment authorization trait and in-memory implementation.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use domain::Money;
use thiserror::Error;

/// A single charge to authorize and confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Amount in minor units. Never negative.
    pub amount: Money,
    /// Three-letter lower-case currency code.
    pub currency: String,
    /// Opaque reference only the processor can interpret.
    pub payment_method: String,
    /// Lets the processor collapse retried charges into one.
    pub idempotency_key: Option<String>,
}

/// Result of a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// The payment reference assigned by the processor.
    pub payment_id: String,
}

/// Payment authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The processor refused the charge. No money moved.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The charge never reached the processor, or was rejected before processing.
    #[error("Payment processor unavailable: {0}")]
    Unavailable(String),

    /// The processor may or may not have charged.
    #[error("Payment outcome unknown: {0}")]
    OutcomeUnknown(String),
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges and confirms a payment in one call.
    ///
    /// A successful call moves money. Callers must not retry after
    /// `OutcomeUnknown` unless the request carries an idempotency key.
    async fn charge(&self, request: ChargeRequest) -> Result<Authorization, PaymentError>;
}

#[async_trait]
impl<T: PaymentService + ?Sized> PaymentService for Arc<T> {
    async fn charge(&self, request: ChargeRequest) -> Result<Authorization, PaymentError> {
        (**self).charge(request).await
    }
}

/// How the in-memory processor answers the next charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeBehavior {
    #[default]
    Approve,
    Decline,
    Unavailable,
    OutcomeUnknown,
    /// Never answers.
    Hang,
    /// Approves after the given delay.
    Delay(Duration),
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    behavior: ChargeBehavior,
    calls: usize,
    charges: Vec<(String, ChargeRequest)>,
    next_id: u32,
}

/// In-memory payment processor for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a processor that approves every charge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how subsequent charges are answered.
    pub fn set_behavior(&self, behavior: ChargeBehavior) {
        self.write().behavior = behavior;
    }

    /// Returns the number of charge attempts, successful or not.
    pub fn call_count(&self) -> usize {
        self.read().calls
    }

    /// Returns the approved charges with their payment ids.
    pub fn charges(&self) -> Vec<(String, ChargeRequest)> {
        self.read().charges.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryPaymentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryPaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn approve(&self, request: ChargeRequest) -> Authorization {
        let mut state = self.write();

        // A repeated idempotency key returns the original authorization
        if let Some(key) = &request.idempotency_key
            && let Some((payment_id, _)) = state
                .charges
                .iter()
                .find(|(_, c)| c.idempotency_key.as_ref() == Some(key))
        {
            return Authorization {
                payment_id: payment_id.clone(),
            };
        }

        state.next_id += 1;
        let payment_id = format!("pi_mock_{:04}", state.next_id);
        state.charges.push((payment_id.clone(), request));
        Authorization { payment_id }
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn charge(&self, request: ChargeRequest) -> Result<Authorization, PaymentError> {
        let behavior = {
            let mut state = self.write();
            state.calls += 1;
            state.behavior
        };

        match behavior {
            ChargeBehavior::Approve => Ok(self.approve(request)),
            ChargeBehavior::Decline => Err(PaymentError::Declined(
                "Your card was declined.".to_string(),
            )),
            ChargeBehavior::Unavailable => Err(PaymentError::Unavailable(
                "connection refused".to_string(),
            )),
            ChargeBehavior::OutcomeUnknown => Err(PaymentError::OutcomeUnknown(
                "processor returned 502".to_string(),
            )),
            ChargeBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(PaymentError::OutcomeUnknown("unreachable".to_string()))
            }
            ChargeBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.approve(request))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge(cents: i64, key: Option<&str>) -> ChargeRequest {
        ChargeRequest {
            amount: Money::from_cents(cents),
            currency: "usd".to_string(),
            payment_method: "pm_mock".to_string(),
            idempotency_key: key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_approve_records_charge() {
        let service = InMemoryPaymentService::new();

        let auth = service.charge(charge(2000, None)).await.unwrap();
        assert_eq!(auth.payment_id, "pi_mock_0001");
        assert_eq!(service.call_count(), 1);
        assert_eq!(service.charges()[0].1.amount, Money::from_cents(2000));
    }

    #[tokio::test]
    async fn test_decline_records_nothing() {
        let service = InMemoryPaymentService::new();
        service.set_behavior(ChargeBehavior::Decline);

        let result = service.charge(charge(2000, None)).await;
        assert!(matches!(result, Err(PaymentError::Declined(_))));
        assert_eq!(service.call_count(), 1);
        assert!(service.charges().is_empty());
    }

    #[tokio::test]
    async fn test_idempotency_key_collapses_charges() {
        let service = InMemoryPaymentService::new();

        let first = service.charge(charge(2000, Some("k1"))).await.unwrap();
        let second = service.charge(charge(2000, Some("k1"))).await.unwrap();
        let third = service.charge(charge(2000, Some("k2"))).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(service.call_count(), 3);
        assert_eq!(service.charges().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_then_approve() {
        let service = InMemoryPaymentService::new();
        service.set_behavior(ChargeBehavior::Delay(Duration::from_millis(200)));

        let started = tokio::time::Instant::now();
        service.charge(charge(100, None)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
