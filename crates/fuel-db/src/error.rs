//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (fuel-core) ← What the store traits return                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CoreError ← AlreadyActivePrice, or Store { context, source }          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use fuel_core::StoreError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and for the conversion into [`StoreError`].
#[derive(Debug, Error)]
pub enum DbError {
    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a second active price (partial unique index)
    /// - Reusing a price, operation or event id
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// CHECK constraint violation (negative counter, bad status text).
    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Invalid SQL in migration
    /// - Migration version conflict
    /// - Schema incompatibility
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// True when the violated index is the single-active-price index.
    pub fn is_active_price_conflict(&self) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field == "fuel_prices.is_active")
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // CHECK constraint:  "CHECK constraint failed: <expr>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Convert into the error the fuel-core store traits speak.
///
/// ## Mapping
/// ```text
/// UniqueViolation on fuel_prices.is_active → StoreError::ActivePriceExists
/// other UniqueViolation                    → StoreError::Duplicate
/// everything else                          → StoreError::Backend
/// ```
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        if err.is_active_price_conflict() {
            return StoreError::ActivePriceExists;
        }
        match err {
            DbError::UniqueViolation { field, .. } => StoreError::Duplicate(field),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_price_conflict_maps_to_store_error() {
        let err = DbError::UniqueViolation {
            field: "fuel_prices.is_active".to_string(),
            value: "1".to_string(),
        };
        assert!(matches!(
            StoreError::from(err),
            StoreError::ActivePriceExists
        ));

        let err = DbError::UniqueViolation {
            field: "refuel_operations.id".to_string(),
            value: "abc".to_string(),
        };
        assert!(matches!(
            StoreError::from(err),
            StoreError::Duplicate(field) if field == "refuel_operations.id"
        ));
    }

    #[test]
    fn test_other_errors_become_backend() {
        let err = StoreError::from(DbError::PoolExhausted);
        assert_eq!(
            err.to_string(),
            "storage backend failure: Connection pool exhausted"
        );
    }
}
