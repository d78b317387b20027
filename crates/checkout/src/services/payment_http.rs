//! Stripe-compatible payment intent client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::payment::{Authorization, ChargeRequest, PaymentError, PaymentService};

#[derive(Serialize)]
struct PaymentIntentForm<'a> {
    amount: i64,
    currency: &'a str,
    payment_method: &'a str,
    confirm: bool,
}

#[derive(Deserialize)]
struct PaymentIntent {
    id: String,
    status: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
}

/// Payment client creating and confirming a payment intent in one call.
///
/// The API key is owned by the instance; nothing is process-wide.
#[derive(Clone)]
pub struct HttpPaymentService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HttpPaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPaymentService")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpPaymentService {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

/// Maps a payment intent status to the charge outcome.
fn intent_outcome(intent: PaymentIntent) -> Result<Authorization, PaymentError> {
    match intent.status.as_str() {
        "succeeded" | "requires_capture" => Ok(Authorization {
            payment_id: intent.id,
        }),
        "processing" => Err(PaymentError::OutcomeUnknown(format!(
            "payment intent {} is still processing",
            intent.id
        ))),
        other => Err(PaymentError::Declined(format!(
            "payment intent {} ended in status {other}",
            intent.id
        ))),
    }
}

/// Maps a non-success HTTP status to the charge outcome.
fn status_outcome(status: StatusCode, body: Option<ErrorEnvelope>) -> PaymentError {
    let detail = body
        .and_then(|b| b.error.message.or(b.error.code))
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        StatusCode::BAD_REQUEST | StatusCode::PAYMENT_REQUIRED => PaymentError::Declined(detail),
        s if s.is_server_error() => PaymentError::OutcomeUnknown(detail),
        // Authentication, rate limiting and routing failures happen before processing
        _ => PaymentError::Unavailable(detail),
    }
}

#[async_trait]
impl PaymentService for HttpPaymentService {
    #[tracing::instrument(
        skip(self, request),
        fields(amount = request.amount.cents(), currency = %request.currency)
    )]
    async fn charge(&self, request: ChargeRequest) -> Result<Authorization, PaymentError> {
        let form = PaymentIntentForm {
            amount: request.amount.cents(),
            currency: &request.currency,
            payment_method: &request.payment_method,
            confirm: true,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.api_key)
            .form(&form);
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                PaymentError::Unavailable(e.to_string())
            } else {
                // The request may have been delivered
                PaymentError::OutcomeUnknown(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorEnvelope>().await.ok();
            return Err(status_outcome(status, body));
        }

        let intent: PaymentIntent = response
            .json()
            .await
            .map_err(|e| PaymentError::OutcomeUnknown(format!("unreadable response: {e}")))?;

        intent_outcome(intent)
    }
}
