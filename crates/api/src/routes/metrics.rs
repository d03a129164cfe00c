//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers descriptions for the metrics the order service records.
pub fn describe() {
    metrics::describe_counter!("orders_created_total", "Orders placed successfully");
    metrics::describe_counter!(
        "orders_rejected_total",
        "Order placements rejected, labelled by reason"
    );
    metrics::describe_counter!(
        "order_status_transitions_total",
        "Committed status changes, labelled by target status"
    );
    metrics::describe_counter!(
        "stock_units_restocked_total",
        "Units put back on hand by cancellations and returns"
    );
    metrics::describe_histogram!(
        "order_final_amount_cents",
        Unit::Count,
        "Post-discount amount of placed orders, in cents"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
