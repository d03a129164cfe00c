use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    NewOrder, NewOrderItem, NewProduct, OrderId, OrderItemRecord, OrderRecord, ProductId,
    ProductRecord, Result,
};

/// Transaction demarcation shared by every store.
///
/// `Tx` is an opaque unit of work. Store operations accept `Option<&mut Tx>`:
/// `Some` joins the open transaction, `None` runs outside any transaction,
/// which is only appropriate for pure reads.
///
/// Dropping a `Tx` without committing discards its writes.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// The unit-of-work handle.
    type Tx: Send;

    /// Opens a new transaction.
    async fn begin_tx(&self) -> Result<Self::Tx>;

    /// Publishes every write made through `tx`.
    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    /// Discards every write made through `tx`.
    async fn rollback(&self, tx: Self::Tx) -> Result<()>;
}

/// Product catalog persistence.
#[async_trait]
pub trait CatalogStore: Transactional {
    /// Fetches a product by id, or `None` if it does not exist.
    ///
    /// Inside a transaction the row stays locked until the transaction ends,
    /// so a later quantity write in the same transaction cannot be based on
    /// a stale read.
    async fn get_product(
        &self,
        tx: Option<&mut Self::Tx>,
        id: ProductId,
    ) -> Result<Option<ProductRecord>>;

    /// Lists all products ordered by id.
    async fn list_products(&self, tx: Option<&mut Self::Tx>) -> Result<Vec<ProductRecord>>;

    /// Inserts a product.
    async fn insert_product(
        &self,
        tx: Option<&mut Self::Tx>,
        product: NewProduct,
    ) -> Result<ProductRecord>;

    /// Sets the on-hand quantity of every listed product in one statement.
    ///
    /// Fails with `RowNotFound` if any id does not exist and with
    /// `ConstraintViolation` if any quantity is negative.
    async fn update_quantities(
        &self,
        tx: Option<&mut Self::Tx>,
        quantities: &BTreeMap<ProductId, i64>,
    ) -> Result<()>;
}

/// Order header persistence.
#[async_trait]
pub trait OrderStore: Transactional {
    /// Fetches an order by id, or `None` if it does not exist.
    ///
    /// Inside a transaction the row stays locked until the transaction ends.
    async fn get_order(&self, tx: Option<&mut Self::Tx>, id: OrderId)
    -> Result<Option<OrderRecord>>;

    /// Inserts an order and returns it with its assigned id and timestamps.
    async fn create_order(&self, tx: Option<&mut Self::Tx>, order: NewOrder)
    -> Result<OrderRecord>;

    /// Overwrites the status column.
    async fn update_status(
        &self,
        tx: Option<&mut Self::Tx>,
        id: OrderId,
        status: &str,
    ) -> Result<()>;

    /// Sets the dispatch timestamp.
    async fn update_dispatched_at(
        &self,
        tx: Option<&mut Self::Tx>,
        id: OrderId,
        dispatched_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Lists all order headers ordered by id.
    async fn list_orders(&self, tx: Option<&mut Self::Tx>) -> Result<Vec<OrderRecord>>;
}

/// Order line-item persistence.
#[async_trait]
pub trait OrderItemStore: Transactional {
    /// Fetches the line items of an order ordered by id.
    async fn get_items_by_order_id(
        &self,
        tx: Option<&mut Self::Tx>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemRecord>>;

    /// Inserts all line items in one statement.
    async fn bulk_create_items(
        &self,
        tx: Option<&mut Self::Tx>,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItemRecord>>;
}

/// Everything the order workflow needs from one backend.
pub trait Storage: CatalogStore + OrderStore + OrderItemStore {}

impl<T> Storage for T where T: CatalogStore + OrderStore + OrderItemStore {}
