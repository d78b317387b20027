//! Order creation and read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::SecondsFormat;
use common::{OrderId, UserId};
use domain::{LineItemRequest, Order, OrderRequest};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::Authenticated;
use crate::error::ApiError;

// -- Request types --

/// Missing fields decode as empty and are rejected by validation.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<OrderItemBody>,
    #[serde(default)]
    pub payment_method_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemBody {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: i32,
}

impl From<CreateOrderBody> for OrderRequest {
    fn from(body: CreateOrderBody) -> Self {
        OrderRequest::new(
            body.user_id,
            body.items
                .into_iter()
                .map(|item| LineItemRequest::new(item.product_id, item.quantity))
                .collect(),
            body.payment_method_id,
        )
    }
}

// -- Response types --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: String,
    pub user_id: String,
    pub items: Vec<OrderItemView>,
    pub total_amount: f64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemView {
    pub product_id: String,
    pub quantity: u32,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemView {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                })
                .collect(),
            total_amount: order.total_amount().as_major_units(),
            status: order.status().to_string(),
            created_at: order.created_at().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: OrderView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderView>,
}

// -- Handlers --

/// POST /orders — validate, price, charge and commit an order.
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
    body: Result<Json<CreateOrderBody>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = OrderRequest::from(body);

    // Malformed ids are left to validation
    if let (Some(caller), Ok(owner)) = (ctx.caller_id(), UserId::parse(&request.user_id))
        && caller != owner
    {
        return Err(ApiError::PermissionDenied(format!(
            "user {caller} cannot place orders for user {owner}"
        )));
    }

    let order = state.orchestrator.create_order(ctx, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            order: OrderView::from(&order),
        }),
    ))
}

/// GET /orders/{order_id} — load a committed order.
#[tracing::instrument(skip_all)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::parse(&order_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let order = state.orchestrator.get_order(ctx, order_id).await?;

    Ok(Json(OrderResponse {
        order: OrderView::from(&order),
    }))
}

/// GET /users/{user_id}/orders — list a user's orders, most recent first.
#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Authenticated(ctx): Authenticated,
    Path(user_id): Path<String>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let user_id = UserId::parse(&user_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let orders = state.orchestrator.list_orders(ctx, user_id).await?;

    Ok(Json(OrdersResponse {
        orders: orders.iter().map(OrderView::from).collect(),
    }))
}
