//! Error types for the reconciliation library.

use thiserror::Error;

/// Main error type for reconciliation operations.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store driver/connectivity probe failed before any work started
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Failed to acquire a connection to the source or target store
    #[error("Failed to connect to {store} store: {message}")]
    Connection { store: &'static str, message: String },

    /// Statement preparation failed
    #[error("Failed to prepare statement: {message}\n  Query: {query}")]
    Prepare { query: String, message: String },

    /// Query execution failed
    #[error("Failed to execute query: {message}\n  Query: {query}")]
    Query { query: String, message: String },

    /// Fetching a row from a result stream failed
    #[error("Failed to fetch row: {0}")]
    Fetch(String),

    /// Writing to a result file failed
    #[error("Failed to write results to {path}: {message}")]
    Report { path: String, message: String },

    /// Underlying Postgres error without more specific context
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReconError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl Into<String>, context: impl Into<String>) -> Self {
        ReconError::Pool {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Connection error for the named store
    pub fn connection(store: &'static str, message: impl Into<String>) -> Self {
        ReconError::Connection {
            store,
            message: message.into(),
        }
    }

    /// Create a Prepare error carrying the offending query text
    pub fn prepare(query: impl Into<String>, message: impl Into<String>) -> Self {
        ReconError::Prepare {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Create a Query error carrying the offending query text
    pub fn query(query: impl Into<String>, message: impl Into<String>) -> Self {
        ReconError::Query {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI. All fatal errors exit 1; a partial
    /// failure is signaled through the run summary instead.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconError>;
