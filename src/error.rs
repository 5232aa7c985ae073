//! # Data Manager Error Types
//!
//! Structured error handling for query construction using thiserror
//! for typed errors instead of `Box<dyn Error>` patterns.

use thiserror::Error;

/// Errors surfaced while building or executing prepared task queries
#[derive(Error, Debug)]
pub enum DataManagerError {
    #[error("Invalid numeric filter value: {value}")]
    InvalidNumber { value: String },

    #[error("Invalid datetime filter value: {value}: expected YYYY-MM-DDTHH:MM:SS.ffffffZ")]
    InvalidDatetime { value: String },

    #[error("Unknown annotation field: {field}")]
    UnknownAnnotation { field: String },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Database query error: {operation}: {message}")]
    DatabaseQuery { operation: String, message: String },

    #[error("Network timeout: operation {operation} timed out after {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("Connection pool exhausted: {message}")]
    PoolExhausted { message: String },
}

impl DataManagerError {
    /// Create an invalid number error
    pub fn invalid_number(value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            value: value.into(),
        }
    }

    /// Create an invalid datetime error
    pub fn invalid_datetime(value: impl Into<String>) -> Self {
        Self::InvalidDatetime {
            value: value.into(),
        }
    }

    /// Create an unknown annotation error
    pub fn unknown_annotation(field: impl Into<String>) -> Self {
        Self::UnknownAnnotation {
            field: field.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a database connection error
    pub fn database_connection(message: impl Into<String>) -> Self {
        Self::DatabaseConnection {
            message: message.into(),
        }
    }

    /// Create a database query error
    pub fn database_query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DatabaseQuery {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    /// Create a pool exhausted error
    pub fn pool_exhausted(message: impl Into<String>) -> Self {
        Self::PoolExhausted {
            message: message.into(),
        }
    }
}

/// Conversion from sqlx::Error to DataManagerError
impl From<sqlx::Error> for DataManagerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataManagerError::database_query("query", "No rows found"),
            sqlx::Error::Database(db_err) => {
                DataManagerError::database_query("database", db_err.to_string())
            }
            sqlx::Error::PoolTimedOut => {
                DataManagerError::timeout("database_pool", 30) // Default timeout
            }
            sqlx::Error::PoolClosed => DataManagerError::pool_exhausted("Database pool is closed"),
            sqlx::Error::Configuration(config_err) => {
                DataManagerError::configuration("database", config_err.to_string())
            }
            _ => DataManagerError::database_connection(err.to_string()),
        }
    }
}

/// Result type alias for data manager operations
pub type DataManagerResult<T> = Result<T, DataManagerError>;
