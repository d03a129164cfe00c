//! Read-only product catalog.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};
use store::{CatalogStore, ProductRecord};

use crate::error::DomainError;
use crate::order::OrderError;
use crate::value_objects::{Category, Money};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub category: Category,
    /// Units on hand.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRecord> for Product {
    type Error = DomainError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let category = record
            .category
            .parse::<Category>()
            .map_err(|e| DomainError::InvalidRecord {
                entity: "product",
                id: record.id.as_i64(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: record.id,
            name: record.name,
            price: Money::from_cents(record.price_cents),
            category,
            quantity: record.quantity,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Catalog lookups. Reads run outside any transaction.
pub struct CatalogService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetches a product by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.store
            .get_product(None, product_id)
            .await?
            .ok_or(OrderError::ProductNotFound { product_id })?
            .try_into()
    }

    /// Lists all products ordered by id.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        self.store
            .list_products(None)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }
}
