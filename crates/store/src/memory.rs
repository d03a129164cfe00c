use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    NewOrder, NewOrderItem, NewProduct, OrderId, OrderItemRecord, OrderRecord, ProductId,
    ProductRecord, Result, StoreError,
    seed::demo_catalog,
    store::{CatalogStore, OrderItemStore, OrderStore, Transactional},
};

const QUANTITY_CONSTRAINT: &str = "products_quantity_non_negative";

#[derive(Debug, Clone, Default)]
struct State {
    products: BTreeMap<ProductId, ProductRecord>,
    orders: BTreeMap<OrderId, OrderRecord>,
    items: Vec<OrderItemRecord>,
    last_product_id: i64,
    last_order_id: i64,
    last_item_id: i64,
}

impl State {
    fn insert_product(&mut self, product: NewProduct, now: DateTime<Utc>) -> ProductRecord {
        self.last_product_id += 1;
        let record = ProductRecord {
            id: ProductId::new(self.last_product_id),
            name: product.name,
            price_cents: product.price_cents,
            category: product.category,
            quantity: product.quantity,
            created_at: now,
            updated_at: now,
        };
        self.products.insert(record.id, record.clone());
        record
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut OrderRecord> {
        self.orders.get_mut(&id).ok_or(StoreError::RowNotFound {
            entity: "order",
            id: id.as_i64(),
        })
    }
}

/// Open transaction on an [`InMemoryStore`].
///
/// Holds the store lock for its whole lifetime, so transactions are
/// serialized. Writes go to a staged copy that replaces the shared state
/// on commit.
pub struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

/// In-memory store implementation.
///
/// Used by tests and by the server when no database is configured. It
/// provides the same interface and transaction semantics as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    fail_on_update_quantities: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with the demo catalog.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let mut state = State::default();
        for product in demo_catalog() {
            state.insert_product(product, now);
        }
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_on_update_quantities: Arc::default(),
        }
    }

    /// Makes every subsequent `update_quantities` call fail.
    pub fn set_fail_on_update_quantities(&self, fail: bool) {
        self.fail_on_update_quantities.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the number of committed line items.
    pub async fn item_count(&self) -> usize {
        self.state.lock().await.items.len()
    }

    async fn with_state<F, R>(&self, tx: Option<&mut InMemoryTx>, f: F) -> R
    where
        F: FnOnce(&mut State) -> R + Send,
        R: Send,
    {
        match tx {
            Some(tx) => f(&mut tx.staged),
            None => {
                let mut state = self.state.lock().await;
                f(&mut state)
            }
        }
    }
}

#[async_trait]
impl Transactional for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin_tx(&self) -> Result<InMemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTx { guard, staged })
    }

    async fn commit(&self, tx: InMemoryTx) -> Result<()> {
        let InMemoryTx { mut guard, staged } = tx;
        *guard = staged;
        Ok(())
    }

    async fn rollback(&self, tx: InMemoryTx) -> Result<()> {
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_product(
        &self,
        tx: Option<&mut InMemoryTx>,
        id: ProductId,
    ) -> Result<Option<ProductRecord>> {
        Ok(self
            .with_state(tx, |state| state.products.get(&id).cloned())
            .await)
    }

    async fn list_products(&self, tx: Option<&mut InMemoryTx>) -> Result<Vec<ProductRecord>> {
        Ok(self
            .with_state(tx, |state| state.products.values().cloned().collect())
            .await)
    }

    async fn insert_product(
        &self,
        tx: Option<&mut InMemoryTx>,
        product: NewProduct,
    ) -> Result<ProductRecord> {
        if product.quantity < 0 {
            return Err(StoreError::ConstraintViolation(QUANTITY_CONSTRAINT.into()));
        }
        let now = Utc::now();
        Ok(self
            .with_state(tx, |state| state.insert_product(product, now))
            .await)
    }

    async fn update_quantities(
        &self,
        tx: Option<&mut InMemoryTx>,
        quantities: &BTreeMap<ProductId, i64>,
    ) -> Result<()> {
        if self.fail_on_update_quantities.load(Ordering::SeqCst) {
            tracing::warn!("injected failure on product quantity update");
            return Err(StoreError::Unavailable(
                "product quantity update refused".to_string(),
            ));
        }
        if quantities.values().any(|quantity| *quantity < 0) {
            return Err(StoreError::ConstraintViolation(QUANTITY_CONSTRAINT.into()));
        }

        let now = Utc::now();
        self.with_state(tx, |state| {
            // Validate every id before touching any row.
            if let Some(missing) = quantities
                .keys()
                .find(|id| !state.products.contains_key(id))
            {
                return Err(StoreError::RowNotFound {
                    entity: "product",
                    id: missing.as_i64(),
                });
            }
            for (id, quantity) in quantities {
                if let Some(product) = state.products.get_mut(id) {
                    product.quantity = *quantity;
                    product.updated_at = now;
                }
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn get_order(
        &self,
        tx: Option<&mut InMemoryTx>,
        id: OrderId,
    ) -> Result<Option<OrderRecord>> {
        Ok(self
            .with_state(tx, |state| state.orders.get(&id).cloned())
            .await)
    }

    async fn create_order(
        &self,
        tx: Option<&mut InMemoryTx>,
        order: NewOrder,
    ) -> Result<OrderRecord> {
        let now = Utc::now();
        Ok(self
            .with_state(tx, |state| {
                state.last_order_id += 1;
                let record = OrderRecord {
                    id: OrderId::new(state.last_order_id),
                    amount_cents: order.amount_cents,
                    discount_percent: order.discount_percent,
                    final_amount_cents: order.final_amount_cents,
                    status: order.status,
                    dispatched_at: None,
                    created_at: now,
                    updated_at: now,
                };
                state.orders.insert(record.id, record.clone());
                record
            })
            .await)
    }

    async fn update_status(
        &self,
        tx: Option<&mut InMemoryTx>,
        id: OrderId,
        status: &str,
    ) -> Result<()> {
        let now = Utc::now();
        self.with_state(tx, |state| {
            let order = state.order_mut(id)?;
            order.status = status.to_string();
            order.updated_at = now;
            Ok(())
        })
        .await
    }

    async fn update_dispatched_at(
        &self,
        tx: Option<&mut InMemoryTx>,
        id: OrderId,
        dispatched_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_state(tx, |state| {
            let order = state.order_mut(id)?;
            order.dispatched_at = Some(dispatched_at);
            order.updated_at = dispatched_at;
            Ok(())
        })
        .await
    }

    async fn list_orders(&self, tx: Option<&mut InMemoryTx>) -> Result<Vec<OrderRecord>> {
        Ok(self
            .with_state(tx, |state| state.orders.values().cloned().collect())
            .await)
    }
}

#[async_trait]
impl OrderItemStore for InMemoryStore {
    async fn get_items_by_order_id(
        &self,
        tx: Option<&mut InMemoryTx>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemRecord>> {
        Ok(self
            .with_state(tx, |state| {
                state
                    .items
                    .iter()
                    .filter(|item| item.order_id == order_id)
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn bulk_create_items(
        &self,
        tx: Option<&mut InMemoryTx>,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItemRecord>> {
        let now = Utc::now();
        self.with_state(tx, |state| {
            if let Some(item) = items
                .iter()
                .find(|item| !state.orders.contains_key(&item.order_id))
            {
                return Err(StoreError::RowNotFound {
                    entity: "order",
                    id: item.order_id.as_i64(),
                });
            }
            let created: Vec<OrderItemRecord> = items
                .into_iter()
                .map(|item| {
                    state.last_item_id += 1;
                    OrderItemRecord {
                        id: state.last_item_id,
                        order_id: item.order_id,
                        product_id: item.product_id,
                        quantity: item.quantity,
                        created_at: now,
                    }
                })
                .collect();
            state.items.extend(created.iter().cloned());
            Ok(created)
        })
        .await
    }
}
