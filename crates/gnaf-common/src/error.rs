//! Error types for the shared G-NAF types

use thiserror::Error;

/// Result type alias for shared G-NAF operations
pub type Result<T> = std::result::Result<T, GnafError>;

/// Main error type for shared G-NAF types
#[derive(Error, Debug)]
pub enum GnafError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid table name: '{0}'. Expected 'schema.table' or 'table' made of letters, digits and underscores.")]
    InvalidTableName(String),

    #[error("Cannot derive a destination table from object key '{0}'")]
    UnmappedKey(String),
}
