//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Postgres Error (sqlx::Error)      Domain outcome (CoreError)          │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError (this module) ◄─────────── DbError::Domain                    │
//! │       │   classify: unique / fk / busy / pool                          │
//! │       ▼                                                                 │
//! │  ApiError (apps/api) ← status code + stable error code                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use tally_core::{CoreError, ValidationError, ValidationErrors};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and domain outcomes raised inside a
/// repository call, so one `?` carries either out to the caller.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - ID doesn't exist
    /// - Soft-deleted product read without `include_deleted`
    /// - Ledger actor no longer exists
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate product SKU
    /// - Duplicate category name
    /// - Duplicate user email
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The store asked the caller to come back later.
    ///
    /// ## When This Occurs
    /// - A product row lock was not granted within `lock_timeout`
    /// - Deadlock or serialization failure reported by Postgres
    #[error("Database is busy")]
    Busy,

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (no connection within `acquire_timeout`).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for failures that may succeed if the caller tries again later.
    ///
    /// Nothing in this crate retries; the flag only drives the 503 mapping.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy | DbError::PoolExhausted | DbError::ConnectionFailed(_)
        )
    }

    /// Swaps the placeholder value of a unique violation for the offending input.
    pub(crate) fn with_value(self, value: &str) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.to_string(),
            },
            other => other,
        }
    }
}

impl From<ValidationErrors> for DbError {
    fn from(err: ValidationErrors) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::from(err))
    }
}

/// SQLSTATE codes that mean "try again later".
///
/// 40001 serialization_failure, 40P01 deadlock_detected,
/// 55P03 lock_not_available (lock_timeout), 57014 query_canceled
/// (statement_timeout).
const RETRYABLE_STATES: [&str; 4] = ["40001", "40P01", "55P03", "57014"];

/// SQLSTATE class 08: connection exception.
const CONNECTION_CLASS: &str = "08";

/// Column named by a default unique constraint name: `products_sku_key` → `sku`.
fn unique_column(constraint: Option<&str>) -> &str {
    constraint
        .and_then(|name| name.strip_suffix("_key"))
        .and_then(|name| name.split_once('_'))
        .map(|(_table, column)| column)
        .unwrap_or("unknown")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → unique / foreign key / busy / connection / query failed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// sqlx::Error::Io             → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();

                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        DbError::duplicate(unique_column(db_err.constraint()), "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                        message: db_err.message().to_string(),
                    },
                    _ if RETRYABLE_STATES.contains(&code.as_str()) => DbError::Busy,
                    _ if code.starts_with(CONNECTION_CLASS) => {
                        DbError::ConnectionFailed(db_err.message().to_string())
                    }
                    _ => DbError::QueryFailed(db_err.message().to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io_err) => DbError::ConnectionFailed(io_err.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
