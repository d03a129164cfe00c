use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    NewOrder, NewOrderItem, NewProduct, OrderId, OrderItemRecord, OrderRecord, ProductId,
    ProductRecord, Result, StoreError,
    store::{CatalogStore, OrderItemStore, OrderStore, Transactional},
};

const PRODUCT_COLUMNS: &str = "id, name, price_cents, category, quantity, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, amount_cents, discount_percent, final_amount_cents, status, dispatched_at, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, created_at";

/// Open transaction on a [`PostgresStore`]. Rolls back when dropped.
pub type PgTx = Transaction<'static, Postgres>;

/// Runs a query against the open transaction when there is one, otherwise
/// against the pool.
macro_rules! run {
    ($store:expr, $tx:expr, $query:expr, $method:ident) => {
        match $tx {
            Some(tx) => $query.$method(&mut **tx).await,
            None => $query.$method(&$store.pool).await,
        }
    };
}

/// PostgreSQL-backed store implementation.
///
/// Product and order reads inside a transaction use `SELECT ... FOR UPDATE`,
/// so two transactions touching the same row serialize on its lock.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        let migrator = sqlx::migrate!("../../migrations");
        tracing::info!(migrations = migrator.iter().count(), "running database migrations");
        migrator.run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<ProductRecord> {
        Ok(ProductRecord {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price_cents: row.try_get("price_cents")?,
            category: row.try_get("category")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        Ok(OrderRecord {
            id: OrderId::new(row.try_get("id")?),
            amount_cents: row.try_get("amount_cents")?,
            discount_percent: row.try_get("discount_percent")?,
            final_amount_cents: row.try_get("final_amount_cents")?,
            status: row.try_get("status")?,
            dispatched_at: row.try_get::<Option<DateTime<Utc>>, _>("dispatched_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItemRecord> {
        Ok(OrderItemRecord {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn map_write_error(e: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && let Some(constraint) = db_err.constraint()
        {
            return StoreError::ConstraintViolation(constraint.to_string());
        }
        StoreError::Database(e)
    }

    fn ensure_updated(affected: u64, entity: &'static str, id: i64) -> Result<()> {
        if affected == 0 {
            return Err(StoreError::RowNotFound { entity, id });
        }
        Ok(())
    }
}

#[async_trait]
impl Transactional for PostgresStore {
    type Tx = PgTx;

    async fn begin_tx(&self) -> Result<PgTx> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: PgTx) -> Result<()> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: PgTx) -> Result<()> {
        tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn get_product(
        &self,
        tx: Option<&mut PgTx>,
        id: ProductId,
    ) -> Result<Option<ProductRecord>> {
        let row: Option<PgRow> = match tx {
            Some(tx) => {
                let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
                sqlx::query(&sql)
                    .bind(id.as_i64())
                    .fetch_optional(&mut **tx)
                    .await?
            }
            None => {
                let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
                sqlx::query(&sql)
                    .bind(id.as_i64())
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, tx: Option<&mut PgTx>) -> Result<Vec<ProductRecord>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC");
        let rows = run!(self, tx, sqlx::query(&sql), fetch_all)?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn insert_product(
        &self,
        tx: Option<&mut PgTx>,
        product: NewProduct,
    ) -> Result<ProductRecord> {
        let sql = format!(
            r#"
            INSERT INTO products (name, price_cents, category, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let query = sqlx::query(&sql)
            .bind(&product.name)
            .bind(product.price_cents)
            .bind(&product.category)
            .bind(product.quantity);
        let row = run!(self, tx, query, fetch_one).map_err(Self::map_write_error)?;

        Self::row_to_product(row)
    }

    async fn update_quantities(
        &self,
        tx: Option<&mut PgTx>,
        quantities: &BTreeMap<ProductId, i64>,
    ) -> Result<()> {
        if quantities.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = quantities.keys().map(|id| id.as_i64()).collect();
        let values: Vec<i64> = quantities.values().copied().collect();

        let query = sqlx::query(
            r#"
            UPDATE products AS p
            SET quantity = u.quantity, updated_at = NOW()
            FROM UNNEST($1::BIGINT[], $2::BIGINT[]) AS u(id, quantity)
            WHERE p.id = u.id
            RETURNING p.id
            "#,
        )
        .bind(&ids)
        .bind(&values);
        let rows = run!(self, tx, query, fetch_all).map_err(Self::map_write_error)?;

        let mut updated = Vec::with_capacity(rows.len());
        for row in rows {
            updated.push(row.try_get::<i64, _>("id")?);
        }
        tracing::debug!(products = updated.len(), "updated product quantities");
        if let Some(missing) = ids.into_iter().find(|id| !updated.contains(id)) {
            return Err(StoreError::RowNotFound {
                entity: "product",
                id: missing,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn get_order(&self, tx: Option<&mut PgTx>, id: OrderId) -> Result<Option<OrderRecord>> {
        let lock = if tx.is_some() { " FOR UPDATE" } else { "" };
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{lock}");
        let query = sqlx::query(&sql).bind(id.as_i64());
        let row: Option<PgRow> = run!(self, tx, query, fetch_optional)?;

        row.map(Self::row_to_order).transpose()
    }

    async fn create_order(&self, tx: Option<&mut PgTx>, order: NewOrder) -> Result<OrderRecord> {
        let sql = format!(
            r#"
            INSERT INTO orders (amount_cents, discount_percent, final_amount_cents, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let query = sqlx::query(&sql)
            .bind(order.amount_cents)
            .bind(order.discount_percent)
            .bind(order.final_amount_cents)
            .bind(&order.status);
        let row = run!(self, tx, query, fetch_one).map_err(Self::map_write_error)?;

        Self::row_to_order(row)
    }

    async fn update_status(&self, tx: Option<&mut PgTx>, id: OrderId, status: &str) -> Result<()> {
        let query = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_i64())
            .bind(status);
        let result = run!(self, tx, query, execute)?;

        Self::ensure_updated(result.rows_affected(), "order", id.as_i64())
    }

    async fn update_dispatched_at(
        &self,
        tx: Option<&mut PgTx>,
        id: OrderId,
        dispatched_at: DateTime<Utc>,
    ) -> Result<()> {
        let query =
            sqlx::query("UPDATE orders SET dispatched_at = $2, updated_at = $2 WHERE id = $1")
                .bind(id.as_i64())
                .bind(dispatched_at);
        let result = run!(self, tx, query, execute)?;

        Self::ensure_updated(result.rows_affected(), "order", id.as_i64())
    }

    async fn list_orders(&self, tx: Option<&mut PgTx>) -> Result<Vec<OrderRecord>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id ASC");
        let rows = run!(self, tx, sqlx::query(&sql), fetch_all)?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl OrderItemStore for PostgresStore {
    async fn get_items_by_order_id(
        &self,
        tx: Option<&mut PgTx>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemRecord>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC");
        let query = sqlx::query(&sql).bind(order_id.as_i64());
        let rows = run!(self, tx, query, fetch_all)?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn bulk_create_items(
        &self,
        tx: Option<&mut PgTx>,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItemRecord>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i64> = items.iter().map(|i| i.order_id.as_i64()).collect();
        let product_ids: Vec<i64> = items.iter().map(|i| i.product_id.as_i64()).collect();
        let quantities: Vec<i64> = items.iter().map(|i| i.quantity).collect();

        let sql = format!(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity)
            SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::BIGINT[])
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let query = sqlx::query(&sql)
            .bind(&order_ids)
            .bind(&product_ids)
            .bind(&quantities);
        let rows = run!(self, tx, query, fetch_all).map_err(Self::map_write_error)?;

        let mut created = rows
            .into_iter()
            .map(Self::row_to_item)
            .collect::<Result<Vec<_>>>()?;
        created.sort_by_key(|item| item.id);
        Ok(created)
    }
}
