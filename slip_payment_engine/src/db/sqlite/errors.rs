use thiserror::Error;

use crate::{db_types::OrderId, traits::ReconciliationError};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
}

impl From<SqliteDatabaseError> for ReconciliationError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::OrderNotFound(oid) => ReconciliationError::OrderNotFound(oid),
            other => ReconciliationError::DatabaseError(other.to_string()),
        }
    }
}
