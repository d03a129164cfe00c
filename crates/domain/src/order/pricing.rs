//! Stock-checked pricing of order requests.

use std::collections::BTreeMap;

use common::ProductId;
use store::CatalogStore;

use super::{LineItemRequest, OrderError};
use crate::error::DomainError;
use crate::value_objects::{Category, Money};

/// Most units of a single product one order may hold.
pub const MAX_QUANTITY_PER_PRODUCT: i64 = 10;

/// Distinct premium products needed to unlock the discount.
pub const PREMIUM_PRODUCTS_FOR_DISCOUNT: usize = 3;

/// The single discount rate, in percent.
pub const DISCOUNT_PERCENT: i64 = 10;

/// Limits and discount rule applied by the [`PricingEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub max_quantity_per_product: i64,
    pub premium_products_for_discount: usize,
    pub discount_percent: i64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            max_quantity_per_product: MAX_QUANTITY_PER_PRODUCT,
            premium_products_for_discount: PREMIUM_PRODUCTS_FOR_DISCOUNT,
            discount_percent: DISCOUNT_PERCENT,
        }
    }
}

/// The result of pricing a request against current stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    /// Pre-discount total.
    pub amount: Money,
    pub discount_percent: i64,
    /// Post-discount total.
    pub final_amount: Money,
    /// Combined requested units per distinct product.
    pub quantities: BTreeMap<ProductId, i64>,
    /// On-hand quantity each product will have once the order is placed.
    pub remaining: BTreeMap<ProductId, i64>,
}

/// Sums the quantities of entries that name the same product.
///
/// Sums saturate at `i64::MAX`, which is still above any per-order limit.
/// The map iterates in ascending product id order, which is also the order
/// in which product rows get locked.
pub fn coalesce(items: &[LineItemRequest]) -> BTreeMap<ProductId, i64> {
    let mut combined = BTreeMap::new();
    for item in items {
        let total = combined.entry(item.product_id).or_insert(0i64);
        *total = total.saturating_add(item.quantity);
    }
    combined
}

/// Prices requests and checks them against the catalog.
///
/// The engine only reads. Every read goes through the caller's transaction so
/// that the rows it checks stay locked until the caller commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    policy: PricingPolicy,
}

impl PricingEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    /// Prices `items` inside `tx`.
    ///
    /// For each distinct product the checks run in this order: existence,
    /// per-order limit, stock on hand. The first failure aborts pricing.
    pub async fn price<S: CatalogStore>(
        &self,
        store: &S,
        tx: &mut S::Tx,
        items: &[LineItemRequest],
    ) -> Result<PricedOrder, DomainError> {
        let quantities = coalesce(items);
        let mut remaining = BTreeMap::new();
        let mut amount = Money::zero();
        let mut premium_products = 0;

        for (&product_id, &asked) in &quantities {
            let product = store
                .get_product(Some(&mut *tx), product_id)
                .await?
                .ok_or(OrderError::ProductNotFound { product_id })?;

            if asked > self.policy.max_quantity_per_product {
                return Err(OrderError::ProductQuantityExceeded {
                    product_id,
                    limit: self.policy.max_quantity_per_product,
                    asked,
                }
                .into());
            }

            if asked > product.quantity {
                return Err(OrderError::ProductQuantityInsufficient {
                    product_id,
                    remaining: product.quantity,
                    asked,
                }
                .into());
            }

            let category = product
                .category
                .parse::<Category>()
                .map_err(|e| DomainError::InvalidRecord {
                    entity: "product",
                    id: product_id.as_i64(),
                    reason: e.to_string(),
                })?;

            amount += Money::from_cents(product.price_cents).multiply(asked);
            if category.is_premium() {
                premium_products += 1;
            }
            remaining.insert(product_id, product.quantity - asked);
        }

        let discount_percent = self.discount_for(premium_products);
        tracing::debug!(
            products = quantities.len(),
            premium_products,
            discount_percent,
            "priced order"
        );

        Ok(PricedOrder {
            amount,
            discount_percent,
            final_amount: amount.discounted(discount_percent),
            quantities,
            remaining,
        })
    }

    /// Discount earned by an order with `premium_products` distinct premium lines.
    pub fn discount_for(&self, premium_products: usize) -> i64 {
        if premium_products >= self.policy.premium_products_for_discount {
            self.policy.discount_percent
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use store::{InMemoryStore, NewProduct, Transactional};

    use super::*;

    async fn store_with(products: &[(&str, i64, &str, i64)]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for &(name, price_cents, category, quantity) in products {
            store
                .insert_product(None, NewProduct::new(name, price_cents, category, quantity))
                .await
                .unwrap();
        }
        store
    }

    async fn price(
        store: &InMemoryStore,
        items: &[LineItemRequest],
    ) -> Result<PricedOrder, DomainError> {
        let mut tx = store.begin_tx().await.unwrap();
        let priced = PricingEngine::default().price(store, &mut tx, items).await;
        store.rollback(tx).await.unwrap();
        priced
    }

    fn order_error(result: Result<PricedOrder, DomainError>) -> OrderError {
        match result {
            Err(DomainError::Order(err)) => err,
            other => panic!("expected order error, got {other:?}"),
        }
    }

    #[test]
    fn test_coalesce_sums_duplicates() {
        let combined = coalesce(&[
            LineItemRequest::new(2, 3),
            LineItemRequest::new(1, 1),
            LineItemRequest::new(2, 4),
        ]);
        assert_eq!(
            combined.into_iter().collect::<Vec<_>>(),
            vec![(ProductId::new(1), 1), (ProductId::new(2), 7)]
        );
    }

    #[test]
    fn test_coalesce_saturates_instead_of_overflowing() {
        let combined = coalesce(&[
            LineItemRequest::new(1, i64::MAX),
            LineItemRequest::new(1, 1),
        ]);
        assert_eq!(combined[&ProductId::new(1)], i64::MAX);
    }

    #[test]
    fn test_discount_threshold_is_inclusive() {
        let engine = PricingEngine::default();
        assert_eq!(engine.discount_for(0), 0);
        assert_eq!(engine.discount_for(2), 0);
        assert_eq!(engine.discount_for(3), 10);
        assert_eq!(engine.discount_for(5), 10);
    }

    #[tokio::test]
    async fn test_single_regular_product() {
        let store = store_with(&[("Widget", 1000, "Regular", 10)]).await;

        let priced = price(&store, &[LineItemRequest::new(1, 2)]).await.unwrap();

        assert_eq!(priced.amount, Money::from_dollars(20));
        assert_eq!(priced.discount_percent, 0);
        assert_eq!(priced.final_amount, Money::from_dollars(20));
        assert_eq!(priced.remaining[&ProductId::new(1)], 8);
    }

    #[tokio::test]
    async fn test_three_premium_products_earn_discount() {
        let store = store_with(&[
            ("A", 1000, "Premium", 2),
            ("B", 2000, "Premium", 2),
            ("C", 3000, "Premium", 2),
        ])
        .await;

        let priced = price(
            &store,
            &[
                LineItemRequest::new(1, 1),
                LineItemRequest::new(2, 1),
                LineItemRequest::new(3, 2),
            ],
        )
        .await
        .unwrap();

        assert_eq!(priced.amount, Money::from_dollars(90));
        assert_eq!(priced.discount_percent, 10);
        assert_eq!(priced.final_amount, Money::from_dollars(81));
    }

    #[tokio::test]
    async fn test_premium_counted_per_product_not_per_unit() {
        let store = store_with(&[
            ("A", 1000, "Premium", 10),
            ("B", 1000, "Premium", 10),
            ("C", 1000, "Regular", 10),
        ])
        .await;

        let priced = price(
            &store,
            &[
                LineItemRequest::new(1, 5),
                LineItemRequest::new(2, 5),
                LineItemRequest::new(3, 1),
            ],
        )
        .await
        .unwrap();

        assert_eq!(priced.discount_percent, 0);
        assert_eq!(priced.final_amount, priced.amount);
    }

    #[tokio::test]
    async fn test_quantity_limit_boundary() {
        let store = store_with(&[("Widget", 100, "Regular", 20)]).await;

        let at_limit = price(&store, &[LineItemRequest::new(1, 10)]).await;
        assert!(at_limit.is_ok());

        let over = order_error(price(&store, &[LineItemRequest::new(1, 11)]).await);
        assert_eq!(
            over,
            OrderError::ProductQuantityExceeded {
                product_id: ProductId::new(1),
                limit: 10,
                asked: 11
            }
        );
    }

    #[tokio::test]
    async fn test_limit_applies_to_combined_quantity() {
        let store = store_with(&[("Widget", 100, "Regular", 20)]).await;

        let err = order_error(
            price(
                &store,
                &[LineItemRequest::new(1, 6), LineItemRequest::new(1, 6)],
            )
            .await,
        );
        assert!(matches!(
            err,
            OrderError::ProductQuantityExceeded { asked: 12, .. }
        ));
    }

    #[tokio::test]
    async fn test_insufficient_stock() {
        let store = store_with(&[("Widget", 100, "Regular", 4)]).await;

        let err = order_error(price(&store, &[LineItemRequest::new(1, 8)]).await);
        assert_eq!(
            err,
            OrderError::ProductQuantityInsufficient {
                product_id: ProductId::new(1),
                remaining: 4,
                asked: 8
            }
        );
    }

    #[tokio::test]
    async fn test_limit_checked_before_stock() {
        let store = store_with(&[("Widget", 100, "Regular", 4)]).await;

        let err = order_error(price(&store, &[LineItemRequest::new(1, 11)]).await);
        assert_eq!(err.reason(), "product_quantity_exceeded");
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let store = store_with(&[("Widget", 100, "Regular", 4)]).await;

        let err = order_error(
            price(
                &store,
                &[LineItemRequest::new(1, 1), LineItemRequest::new(99, 1)],
            )
            .await,
        );
        assert_eq!(
            err,
            OrderError::ProductNotFound {
                product_id: ProductId::new(99)
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_category_is_invalid_record() {
        let store = store_with(&[("Widget", 100, "Luxury", 4)]).await;

        let result = price(&store, &[LineItemRequest::new(1, 1)]).await;
        assert!(matches!(
            result,
            Err(DomainError::InvalidRecord {
                entity: "product",
                id: 1,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_pricing_does_not_write() {
        let store = store_with(&[("Widget", 100, "Regular", 4)]).await;

        let mut tx = store.begin_tx().await.unwrap();
        PricingEngine::default()
            .price(&store, &mut tx, &[LineItemRequest::new(1, 3)])
            .await
            .unwrap();
        store.commit(tx).await.unwrap();

        let product = store
            .get_product(None, ProductId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity, 4);
    }
}
