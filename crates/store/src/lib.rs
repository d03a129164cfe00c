pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod seed;
pub mod store;

pub use common::{OrderId, ProductId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTx};
pub use postgres::{PgTx, PostgresStore};
pub use record::{NewOrder, NewOrderItem, NewProduct, OrderItemRecord, OrderRecord, ProductRecord};
pub use store::{CatalogStore, OrderItemStore, OrderStore, Storage, Transactional};
