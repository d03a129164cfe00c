//! Order pricing, lifecycle and orchestration.

mod model;
mod pricing;
mod service;
mod state;

pub use model::{CreateOrderRequest, LineItemRequest, Order, OrderLineItem};
pub use pricing::{
    DISCOUNT_PERCENT, MAX_QUANTITY_PER_PRODUCT, PREMIUM_PRODUCTS_FOR_DISCOUNT, PricedOrder,
    PricingEngine, PricingPolicy, coalesce,
};
pub use service::OrderService;
pub use state::{OrderStatus, UnknownStatus};

use common::{OrderId, ProductId};
use thiserror::Error;

use crate::error::ErrorKind;

/// Business-rule failures of order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// A requested product does not exist.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// The combined quantity for one product is above the per-order limit.
    #[error("Product {product_id} quantity exceeded: limit {limit}, asked {asked}")]
    ProductQuantityExceeded {
        product_id: ProductId,
        limit: i64,
        asked: i64,
    },

    /// Not enough stock on hand for one product.
    #[error("Product {product_id} quantity insufficient: remaining {remaining}, asked {asked}")]
    ProductQuantityInsufficient {
        product_id: ProductId,
        remaining: i64,
        asked: i64,
    },

    /// The order does not exist.
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    /// The requested status name is not a known status.
    #[error("Order {order_id} status invalid: {status}")]
    OrderStatusInvalid { order_id: OrderId, status: String },

    /// The lifecycle does not allow the requested transition.
    #[error("Order {order_id} cannot move from {current} to {requested}")]
    OrderUpdationInvalid {
        order_id: OrderId,
        current: OrderStatus,
        requested: OrderStatus,
    },

    /// The request has no line items.
    #[error("Order has no items")]
    EmptyOrder,

    /// A line item asks for zero or fewer units.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ProductNotFound { .. } | OrderError::OrderNotFound { .. } => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::Validation,
        }
    }

    /// Short machine-readable reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            OrderError::ProductNotFound { .. } => "product_not_found",
            OrderError::ProductQuantityExceeded { .. } => "product_quantity_exceeded",
            OrderError::ProductQuantityInsufficient { .. } => "product_quantity_insufficient",
            OrderError::OrderNotFound { .. } => "order_not_found",
            OrderError::OrderStatusInvalid { .. } => "order_status_invalid",
            OrderError::OrderUpdationInvalid { .. } => "order_updation_invalid",
            OrderError::EmptyOrder => "empty_order",
            OrderError::InvalidQuantity { .. } => "invalid_quantity",
        }
    }
}
