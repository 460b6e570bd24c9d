//! Error types for the G-NAF loader
//!
//! Every failure aborts the running command. Messages name the collaborator
//! that failed and what to check.

use gnaf_common::GnafError;
use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Error type for loader commands
#[derive(Error, Debug)]
pub enum LoaderError {
    /// S3 call failed
    #[error("Object storage error: {0}. Check the bucket, key and AWS credentials.")]
    Storage(String),

    /// SQS call failed
    #[error("Queue error: {0}. Check the queue name and AWS credentials.")]
    Queue(String),

    /// SQL statement or connection error
    #[error("Database error: {0}. Check your database connection settings.")]
    Database(#[from] sqlx::Error),

    /// Connection attempt did not finish in time
    #[error("Timed out after {secs}s connecting to database at {host}")]
    ConnectTimeout { host: String, secs: u64 },

    /// Operation attempted after the connection was closed
    #[error("Database connection is already closed")]
    ConnectionClosed,

    /// Archive could not be read
    #[error("Archive error: {0}. Check that the source object is a valid zip file.")]
    Archive(#[from] zip::result::ZipError),

    /// Queue message is well-formed JSON but cannot be acted on
    #[error("Invalid queue message: {0}")]
    InvalidMessage(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),

    /// Table names, object keys and message bodies
    #[error(transparent)]
    Gnaf(#[from] GnafError),
}

impl LoaderError {
    /// Create an object storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a queue error
    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    /// Create an invalid message error
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
