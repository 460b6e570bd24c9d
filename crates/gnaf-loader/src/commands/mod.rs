//! Command implementations
//!
//! Each subcommand has its own module. `execute` builds the real AWS and
//! PostgreSQL collaborators from arguments and environment, then hands them
//! to `run`, which only sees the capability traits.

pub mod decompress;
pub mod import_data;
pub mod queue;
pub mod truncate_tables;

pub use decompress::DecompressOutcome;
pub use import_data::ImportSummary;
