//! HTTP catalog and payment clients against local stub servers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use checkout::{
    CatalogError, CatalogService, ChargeRequest, HttpCatalogService, HttpPaymentService,
    OrderOrchestrator, PaymentError, PaymentService, RequestContext,
};
use common::ProductId;
use domain::{LineItemRequest, Money, OrderRequest};
use order_store::InMemoryOrderStore;
use serde_json::json;

/// Serves the router on an ephemeral local port and returns its base URL.
async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn product(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "1" => Json(json!({
            "product_id": "1",
            "name": "Mechanical Keyboard",
            "description": "Tactile switches",
            "price": 10.0,
            "quantity": 5
        }))
        .into_response(),
        "6" => Json(json!({
            "product_id": "6",
            "name": "Broken",
            "price": -4.0,
            "quantity": 1
        }))
        .into_response(),
        "7" => (StatusCode::OK, "not json").into_response(),
        "500" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn catalog_router() -> Router {
    Router::new().route("/products/{id}", get(product))
}

#[derive(Debug, Clone)]
struct CapturedCharge {
    form: HashMap<String, String>,
    authorization: Option<String>,
    idempotency_key: Option<String>,
}

type Captured = Arc<Mutex<Vec<CapturedCharge>>>;

async fn payment_intents(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    captured.lock().unwrap().push(CapturedCharge {
        form: form.clone(),
        authorization: header("authorization"),
        idempotency_key: header("idempotency-key"),
    });

    match form.get("payment_method").map(String::as_str) {
        Some("pm_card_visa") => Json(json!({"id": "pi_123", "status": "succeeded"})).into_response(),
        Some("pm_processing") => {
            Json(json!({"id": "pi_456", "status": "processing"})).into_response()
        }
        Some("pm_card_chargeDeclined") => (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({"error": {"code": "card_declined", "message": "Your card was declined."}})),
        )
            .into_response(),
        Some("pm_rate_limited") => StatusCode::TOO_MANY_REQUESTS.into_response(),
        _ => StatusCode::BAD_GATEWAY.into_response(),
    }
}

async fn payment_stub() -> (String, Captured) {
    let captured = Captured::default();
    let router = Router::new()
        .route("/v1/payment_intents", post(payment_intents))
        .with_state(captured.clone());
    (spawn_stub(router).await, captured)
}

fn charge(payment_method: &str, key: Option<&str>) -> ChargeRequest {
    ChargeRequest {
        amount: Money::from_cents(2000),
        currency: "usd".to_string(),
        payment_method: payment_method.to_string(),
        idempotency_key: key.map(str::to_string),
    }
}

/// A base URL nothing listens on.
async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn fetches_snapshot() {
        let base_url = spawn_stub(catalog_router()).await;
        let catalog = HttpCatalogService::new(reqwest::Client::new(), base_url);

        let snapshot = catalog.get_product(ProductId::new(1)).await.unwrap();
        assert_eq!(snapshot.name, "Mechanical Keyboard");
        assert_eq!(snapshot.unit_price, Money::from_cents(1000));
        assert_eq!(snapshot.stock, 5);
    }

    #[tokio::test]
    async fn distinguishes_failures() {
        let base_url = spawn_stub(catalog_router()).await;
        let catalog = HttpCatalogService::new(reqwest::Client::new(), base_url);

        assert_eq!(
            catalog.get_product(ProductId::new(404)).await,
            Err(CatalogError::NotFound(ProductId::new(404)))
        );
        assert!(matches!(
            catalog.get_product(ProductId::new(500)).await,
            Err(CatalogError::Unavailable(_))
        ));
        assert!(matches!(
            catalog.get_product(ProductId::new(6)).await,
            Err(CatalogError::InvalidResponse(_))
        ));
        assert!(matches!(
            catalog.get_product(ProductId::new(7)).await,
            Err(CatalogError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable() {
        let catalog = HttpCatalogService::new(reqwest::Client::new(), closed_port_url().await);

        assert!(matches!(
            catalog.get_product(ProductId::new(1)).await,
            Err(CatalogError::Unavailable(_))
        ));
    }
}

mod payment {
    use super::*;

    #[tokio::test]
    async fn sends_confirmed_payment_intent() {
        let (base_url, captured) = payment_stub().await;
        let payment = HttpPaymentService::new(reqwest::Client::new(), base_url, "sk_test_123");

        let auth = payment
            .charge(charge("pm_card_visa", Some("order-1")))
            .await
            .unwrap();
        assert_eq!(auth.payment_id, "pi_123");

        let sent = captured.lock().unwrap()[0].clone();
        assert_eq!(sent.form["amount"], "2000");
        assert_eq!(sent.form["currency"], "usd");
        assert_eq!(sent.form["payment_method"], "pm_card_visa");
        assert_eq!(sent.form["confirm"], "true");
        assert_eq!(sent.authorization.as_deref(), Some("Bearer sk_test_123"));
        assert_eq!(sent.idempotency_key.as_deref(), Some("order-1"));
    }

    #[tokio::test]
    async fn no_idempotency_header_without_key() {
        let (base_url, captured) = payment_stub().await;
        let payment = HttpPaymentService::new(reqwest::Client::new(), base_url, "sk_test_123");

        payment.charge(charge("pm_card_visa", None)).await.unwrap();
        assert!(captured.lock().unwrap()[0].idempotency_key.is_none());
    }

    #[tokio::test]
    async fn maps_processor_outcomes() {
        let (base_url, _) = payment_stub().await;
        let payment = HttpPaymentService::new(reqwest::Client::new(), base_url, "sk_test_123");

        assert_eq!(
            payment.charge(charge("pm_card_chargeDeclined", None)).await,
            Err(PaymentError::Declined("Your card was declined.".to_string()))
        );
        assert!(matches!(
            payment.charge(charge("pm_processing", None)).await,
            Err(PaymentError::OutcomeUnknown(_))
        ));
        assert!(matches!(
            payment.charge(charge("pm_rate_limited", None)).await,
            Err(PaymentError::Unavailable(_))
        ));
        assert!(matches!(
            payment.charge(charge("pm_anything_else", None)).await,
            Err(PaymentError::OutcomeUnknown(_))
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable() {
        let payment =
            HttpPaymentService::new(reqwest::Client::new(), closed_port_url().await, "sk_test");

        assert!(matches!(
            payment.charge(charge("pm_card_visa", None)).await,
            Err(PaymentError::Unavailable(_))
        ));
    }
}

#[tokio::test]
async fn checkout_over_http_collaborators() {
    let catalog_url = spawn_stub(catalog_router()).await;
    let (payment_url, captured) = payment_stub().await;
    let client = reqwest::Client::new();

    let orchestrator = OrderOrchestrator::new(
        HttpCatalogService::new(client.clone(), catalog_url),
        HttpPaymentService::new(client, payment_url, "sk_test_123"),
        InMemoryOrderStore::new(),
    );

    let order = orchestrator
        .create_order(
            RequestContext::new(Duration::from_secs(5)),
            OrderRequest::new("1", vec![LineItemRequest::new("1", 2)], "pm_card_visa"),
        )
        .await
        .unwrap();

    assert_eq!(order.total_amount().as_major_units(), 20.0);
    assert_eq!(captured.lock().unwrap()[0].form["amount"], "2000");
}
