//! G-NAF Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the G-NAF loader.
//!
//! # Overview
//!
//! - **Error Handling**: [`GnafError`] and the [`Result`] alias
//! - **Logging**: command-scoped `tracing` subscriber setup
//! - **Types**: object references, table names, and the queue message body
//!
//! # Example
//!
//! ```no_run
//! use gnaf_common::types::{ImportFile, TableName};
//!
//! fn message_for(bucket: &str, key: &str) -> gnaf_common::Result<String> {
//!     let table: TableName = "public.address_detail".parse()?;
//!     ImportFile::new(bucket, key, &table).to_json()
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{GnafError, Result};
