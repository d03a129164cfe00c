//! Order placement, lookup and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{CreateOrderRequest, LineItemRequest, Order, OrderId};
use serde::{Deserialize, Serialize};
use store::Storage;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderBody {
    pub products: Vec<LineItemRequest>,
}

#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub items: Vec<OrderItemResponse>,
    pub amount_cents: i64,
    pub discount_percent: i64,
    pub final_amount_cents: i64,
    pub status: String,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub quantity: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.as_i64(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.as_i64(),
                    quantity: item.quantity,
                })
                .collect(),
            amount_cents: order.amount.cents(),
            discount_percent: order.discount_percent,
            final_amount_cents: order.final_amount.cents(),
            status: order.status.to_string(),
            dispatched_at: order.dispatched_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// -- Handlers --

/// POST /orders: place a new order.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateOrderBody>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(body) = body?;

    let order = state
        .order_service
        .create_order(CreateOrderRequest::new(body.products))
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{id}: load an order with its line items.
#[tracing::instrument(skip(state))]
pub async fn get<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = id?;

    let order = state
        .order_service
        .get_order_details(OrderId::new(id))
        .await?;

    Ok(Json(order.into()))
}

/// GET /orders: list order summaries.
#[tracing::instrument(skip(state))]
pub async fn list<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.list_orders().await?;

    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// PATCH /orders/{id}/status: move an order to a new status.
#[tracing::instrument(skip(state, body))]
pub async fn update_status<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;

    let order = state
        .order_service
        .update_order_status(OrderId::new(id), &body.status)
        .await?;

    Ok(Json(order.into()))
}
