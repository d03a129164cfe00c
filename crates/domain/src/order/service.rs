//! Order workflow: placement, lifecycle transitions and reads.

use std::collections::BTreeMap;

use chrono::Utc;
use common::{OrderId, ProductId};
use store::{NewOrder, NewOrderItem, StoreError, Storage};

use super::{CreateOrderRequest, Order, OrderError, OrderStatus, PricingEngine, PricingPolicy};
use crate::error::{DomainError, ErrorKind};

/// Service for placing orders and moving them through their lifecycle.
///
/// Every write runs in one store transaction. The transaction is committed
/// only when the whole operation succeeds and rolled back otherwise.
pub struct OrderService<S: Storage> {
    store: S,
    pricing: PricingEngine,
}

impl<S: Storage> OrderService<S> {
    /// Creates a new order service with the default pricing policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, PricingPolicy::default())
    }

    /// Creates a new order service with a custom pricing policy.
    pub fn with_policy(store: S, policy: PricingPolicy) -> Self {
        Self {
            store,
            pricing: PricingEngine::new(policy),
        }
    }

    /// Places an order: prices it against current stock, persists it with its
    /// line items and reserves the stock.
    #[tracing::instrument(skip(self, request), fields(entries = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, DomainError> {
        let result = self.try_create_order(&request).await;

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                metrics::histogram!("order_final_amount_cents")
                    .record(order.final_amount.cents() as f64);
                tracing::info!(
                    order_id = %order.id,
                    amount = %order.amount,
                    discount_percent = order.discount_percent,
                    final_amount = %order.final_amount,
                    "order placed"
                );
            }
            Err(err) => {
                metrics::counter!("orders_rejected_total", "reason" => err.reason())
                    .increment(1);
                log_failure(err, "order rejected");
            }
        }

        result
    }

    async fn try_create_order(&self, request: &CreateOrderRequest) -> Result<Order, DomainError> {
        request.validate()?;

        let mut tx = self.store.begin_tx().await?;
        let result = self.place_order(&mut tx, request).await;
        self.finish_transaction(tx, result).await
    }

    async fn place_order(
        &self,
        tx: &mut S::Tx,
        request: &CreateOrderRequest,
    ) -> Result<Order, DomainError> {
        let priced = self.pricing.price(&self.store, tx, &request.items).await?;

        let record = self
            .store
            .create_order(
                Some(&mut *tx),
                NewOrder {
                    amount_cents: priced.amount.cents(),
                    discount_percent: priced.discount_percent,
                    final_amount_cents: priced.final_amount.cents(),
                    status: OrderStatus::Placed.as_str().to_string(),
                },
            )
            .await?;

        let items = priced
            .quantities
            .iter()
            .map(|(&product_id, &quantity)| NewOrderItem {
                order_id: record.id,
                product_id,
                quantity,
            })
            .collect();
        let items = self.store.bulk_create_items(Some(&mut *tx), items).await?;

        self.store
            .update_quantities(Some(&mut *tx), &priced.remaining)
            .await?;

        Order::from_records(record, items)
    }

    /// Moves an order to `requested`, restocking its products when the new
    /// status releases them and stamping the dispatch time on `Dispatched`.
    ///
    /// Returns the order as it is after the transition.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        requested: &str,
    ) -> Result<Order, DomainError> {
        let result = self.try_update_order_status(order_id, requested).await;

        match &result {
            Ok(order) => {
                metrics::counter!("order_status_transitions_total", "to" => order.status.as_str())
                    .increment(1);
                if order.status.releases_stock() {
                    metrics::counter!("stock_units_restocked_total")
                        .increment(order.unit_count().unsigned_abs());
                }
                tracing::info!(%order_id, status = %order.status, "order status updated");
            }
            Err(err) => log_failure(err, "order status update rejected"),
        }

        result
    }

    async fn try_update_order_status(
        &self,
        order_id: OrderId,
        requested: &str,
    ) -> Result<Order, DomainError> {
        let mut tx = self.store.begin_tx().await?;
        let result = self.transition(&mut tx, order_id, requested).await;
        self.finish_transaction(tx, result).await
    }

    async fn transition(
        &self,
        tx: &mut S::Tx,
        order_id: OrderId,
        requested: &str,
    ) -> Result<Order, DomainError> {
        let requested: OrderStatus = requested.parse().map_err(|_| OrderError::OrderStatusInvalid {
            order_id,
            status: requested.to_string(),
        })?;

        let record = self
            .store
            .get_order(Some(&mut *tx), order_id)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id })?;
        let current = Order::from_records(record, Vec::new())?.status;

        if !current.can_transition_to(requested) {
            return Err(OrderError::OrderUpdationInvalid {
                order_id,
                current,
                requested,
            }
            .into());
        }

        self.store
            .update_status(Some(&mut *tx), order_id, requested.as_str())
            .await?;

        if requested.releases_stock() {
            self.restock(tx, order_id).await?;
        }

        if requested == OrderStatus::Dispatched {
            self.store
                .update_dispatched_at(Some(&mut *tx), order_id, Utc::now())
                .await?;
        }

        self.load_order(Some(tx), order_id).await
    }

    /// Puts the stock held by an order's line items back on hand.
    async fn restock(&self, tx: &mut S::Tx, order_id: OrderId) -> Result<(), DomainError> {
        let items = self
            .store
            .get_items_by_order_id(Some(&mut *tx), order_id)
            .await?;

        let mut held: BTreeMap<ProductId, i64> = BTreeMap::new();
        for item in &items {
            *held.entry(item.product_id).or_insert(0) += item.quantity;
        }

        let mut restocked = BTreeMap::new();
        for (&product_id, &quantity) in &held {
            let product = self
                .store
                .get_product(Some(&mut *tx), product_id)
                .await?
                .ok_or(StoreError::RowNotFound {
                    entity: "product",
                    id: product_id.as_i64(),
                })?;
            restocked.insert(product_id, product.quantity + quantity);
        }

        self.store
            .update_quantities(Some(&mut *tx), &restocked)
            .await?;

        tracing::debug!(%order_id, products = held.len(), "restocked order items");

        Ok(())
    }

    /// Loads an order with its line items.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_details(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.load_order(None, order_id).await
    }

    /// Lists all orders without their line items.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        self.store
            .list_orders(None)
            .await?
            .into_iter()
            .map(|record| Order::from_records(record, Vec::new()))
            .collect()
    }

    async fn load_order(
        &self,
        mut tx: Option<&mut S::Tx>,
        order_id: OrderId,
    ) -> Result<Order, DomainError> {
        let record = self
            .store
            .get_order(tx.as_deref_mut(), order_id)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id })?;
        let items = self
            .store
            .get_items_by_order_id(tx.as_deref_mut(), order_id)
            .await?;

        Order::from_records(record, items)
    }

    /// Commits on success and rolls back on failure.
    ///
    /// A failed commit replaces the result. A failed rollback is logged and
    /// the error that triggered it is returned.
    async fn finish_transaction<T: Send>(
        &self,
        tx: S::Tx,
        result: Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        match result {
            Ok(value) => {
                self.store.commit(tx).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback(tx).await {
                    tracing::error!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

fn log_failure(err: &DomainError, message: &str) {
    match err.kind() {
        ErrorKind::Infrastructure => tracing::error!(error = %err, "{message}"),
        ErrorKind::NotFound | ErrorKind::Validation => {
            tracing::warn!(error = %err, reason = err.reason(), "{message}")
        }
    }
}
