//! Order read model and creation request.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};
use store::{OrderItemRecord, OrderRecord};

use super::{OrderError, OrderStatus};
use crate::error::DomainError;
use crate::value_objects::Money;

/// One product and quantity committed to an order at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// An order as returned to callers.
///
/// `items` is empty for the summaries produced by `list_orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderLineItem>,
    /// Pre-discount total.
    pub amount: Money,
    pub discount_percent: i64,
    /// Post-discount total.
    pub final_amount: Money,
    pub status: OrderStatus,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds an order from its stored header and line items.
    pub fn from_records(
        record: OrderRecord,
        items: Vec<OrderItemRecord>,
    ) -> Result<Self, DomainError> {
        let status = record
            .status
            .parse::<OrderStatus>()
            .map_err(|e| DomainError::InvalidRecord {
                entity: "order",
                id: record.id.as_i64(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: record.id,
            items: items
                .into_iter()
                .map(|item| OrderLineItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
            amount: Money::from_cents(record.amount_cents),
            discount_percent: record.discount_percent,
            final_amount: Money::from_cents(record.final_amount_cents),
            status,
            dispatched_at: record.dispatched_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Total units across all line items.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// One requested (product, quantity) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineItemRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Request to place a new order.
///
/// The same product may appear in several entries; their quantities are
/// combined before any limit or stock check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineItemRequest>,
}

impl CreateOrderRequest {
    pub fn new(items: Vec<LineItemRequest>) -> Self {
        Self { items }
    }

    /// Checks the request shape: at least one entry, every quantity positive.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if let Some(item) = self.items.iter().find(|item| item.quantity < 1) {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }
        Ok(())
    }
}
