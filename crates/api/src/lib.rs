//! HTTP API server with observability for the storefront order service.
//!
//! Provides REST endpoints for order placement, status changes and catalog
//! lookups, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::{CatalogService, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Storage;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Storage> {
    pub order_service: OrderService<S>,
    pub catalog: CatalogService<S>,
    /// Name of the store backend, reported by `/health`.
    pub backend: &'static str,
}

impl<S: Storage + Clone> AppState<S> {
    pub fn new(store: S, backend: &'static str) -> Self {
        Self {
            order_service: OrderService::new(store.clone()),
            catalog: CatalogService::new(store),
            backend,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storage + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<S>),
        )
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
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
