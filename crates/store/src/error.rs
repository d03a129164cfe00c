use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A targeted update matched no row.
    #[error("{entity} not found: {id}")]
    RowNotFound { entity: &'static str, id: i64 },

    /// A write was refused by a table constraint.
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    /// The backend could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
