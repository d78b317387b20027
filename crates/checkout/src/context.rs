//! Per-request context, resolved once at the edge and passed by value.

use std::time::Duration;

use common::UserId;
use tokio::time::Instant;
use uuid::Uuid;

/// Everything the orchestrator needs to know about the inbound request
/// besides its payload.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    caller: Option<UserId>,
    deadline: Instant,
    idempotency_key: Option<String>,
}

impl RequestContext {
    /// Creates a context whose deadline is `timeout` from now.
    pub fn new(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Creates a context with an absolute deadline.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            caller: None,
            deadline,
            idempotency_key: None,
        }
    }

    /// Sets the authenticated caller.
    pub fn caller(mut self, caller: UserId) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Sets the key that makes a payment authorization safe to retry.
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Overrides the generated request identifier.
    pub fn request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn id(&self) -> Uuid {
        self.request_id
    }

    pub fn caller_id(&self) -> Option<UserId> {
        self.caller
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn idempotency_key_value(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_sets_fields() {
        let request_id = Uuid::new_v4();
        let ctx = RequestContext::new(Duration::from_secs(5))
            .caller(UserId::new(7))
            .idempotency_key("order-7-1")
            .request_id(request_id);

        assert_eq!(ctx.id(), request_id);
        assert_eq!(ctx.caller_id(), Some(UserId::new(7)));
        assert_eq!(ctx.idempotency_key_value(), Some("order-7-1"));
        assert!(!ctx.is_expired());
        assert!(ctx.deadline() <= Instant::now() + Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry() {
        let ctx = RequestContext::new(Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(ctx.is_expired());
    }
}
