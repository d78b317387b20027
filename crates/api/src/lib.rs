//! HTTP API for the checkout service.
//!
//! Exposes order creation and order reads over JSON, with structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use checkout::{
    CatalogService, HttpCatalogService, HttpPaymentService, InMemoryCatalogService,
    InMemoryPaymentService, OrderOrchestrator, PaymentService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::{Authenticator, TrustedHeaderAuthenticator};
use config::Config;
use error::StartupError;

/// Orchestrator over whichever collaborators the configuration selected.
pub type DynOrchestrator =
    OrderOrchestrator<Arc<dyn CatalogService>, Arc<dyn PaymentService>, Arc<dyn OrderStore>>;

/// Shared application state for all handlers.
pub struct AppState {
    pub orchestrator: DynOrchestrator,
    pub authenticator: Arc<dyn Authenticator>,
    pub request_timeout: Duration,
    pub max_request_timeout: Duration,
}

impl AppState {
    /// Wraps an orchestrator with header-based authentication and the
    /// configured deadlines.
    pub fn new(orchestrator: DynOrchestrator, config: &Config) -> Self {
        Self {
            orchestrator,
            authenticator: Arc::new(TrustedHeaderAuthenticator),
            request_timeout: config.request_timeout,
            max_request_timeout: config.max_request_timeout,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders/{order_id}", get(routes::orders::get))
        .route("/users/{user_id}/orders", get(routes::orders::list))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Connects the collaborators named by the configuration.
///
/// Unset collaborators fall back to in-process implementations so the
/// service can run standalone.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>, StartupError> {
    let store: Arc<dyn OrderStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(url)
                .await?;
            let store = PostgresOrderStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL order store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()?;

    let catalog: Arc<dyn CatalogService> = match &config.catalog_url {
        Some(url) => {
            tracing::info!(%url, "using remote catalog");
            Arc::new(HttpCatalogService::new(client.clone(), url.as_str()))
        }
        None => {
            tracing::warn!("CATALOG_URL not set, using the seeded in-memory catalog");
            Arc::new(InMemoryCatalogService::with_sample_products())
        }
    };

    let payment: Arc<dyn PaymentService> = match (&config.payment_url, &config.payment_api_key) {
        (Some(url), Some(key)) => {
            tracing::info!(%url, "using remote payment processor");
            Arc::new(HttpPaymentService::new(client, url.as_str(), key.as_str()))
        }
        _ => {
            tracing::warn!("PAYMENT_URL not set, payments are simulated and always approved");
            Arc::new(InMemoryPaymentService::new())
        }
    };

    let orchestrator = OrderOrchestrator::new(catalog, payment, store)
        .with_currency(config.payment_currency.as_str());

    Ok(Arc::new(AppState::new(orchestrator, config)))
}
