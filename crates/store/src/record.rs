//! Row shapes as they are persisted.
//!
//! Records keep enumerated columns (category, status) as their stored
//! strings; the domain layer owns their interpretation.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};

/// A persisted catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    /// Unit price in cents.
    pub price_cents: i64,
    pub category: String,
    /// On-hand quantity, never negative.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product to insert; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub category: String,
    pub quantity: i64,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        price_cents: i64,
        category: impl Into<String>,
        quantity: i64,
    ) -> Self {
        Self {
            name: name.into(),
            price_cents,
            category: category.into(),
            quantity,
        }
    }
}

/// A persisted order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    /// Pre-discount total in cents.
    pub amount_cents: i64,
    pub discount_percent: i64,
    /// Post-discount total in cents.
    pub final_amount_cents: i64,
    pub status: String,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order header to insert; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub amount_cents: i64,
    pub discount_percent: i64,
    pub final_amount_cents: i64,
    pub status: String,
}

/// A persisted order line item. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// A line item to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
}
