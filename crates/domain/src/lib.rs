//! Domain layer for the storefront order service.
//!
//! This crate provides:
//! - A pricing and validation engine that checks requested items against
//!   stock and applies the premium bulk discount
//! - The order lifecycle state machine
//! - `OrderService`, which runs order placement and status changes as
//!   single store transactions
//! - `CatalogService` for read-only product lookups

pub mod catalog;
pub mod error;
pub mod order;
pub mod value_objects;

pub use catalog::{CatalogService, Product};
pub use common::{OrderId, ProductId};
pub use error::{DomainError, ErrorKind};
pub use order::{
    CreateOrderRequest, LineItemRequest, Order, OrderError, OrderLineItem, OrderService,
    OrderStatus, PricedOrder, PricingEngine, PricingPolicy,
};
pub use value_objects::{Category, Money};
