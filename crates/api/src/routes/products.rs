//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use domain::{Product, ProductId};
use serde::Serialize;
use store::Storage;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub category: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name,
            price_cents: product.price.cents(),
            category: product.category.to_string(),
            quantity: product.quantity,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// GET /products: list the catalog.
#[tracing::instrument(skip(state))]
pub async fn list<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.catalog.list_products().await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// GET /products/{id}: look up one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Path(id) = id?;

    let product = state.catalog.get_product(ProductId::new(id)).await?;

    Ok(Json(product.into()))
}
