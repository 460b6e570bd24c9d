//! G-NAF Loader Library
//!
//! Batch ETL tooling for loading the Geocoded National Address File into
//! PostgreSQL through S3 and SQS.
//!
//! # Overview
//!
//! A full load runs four commands, each its own process:
//!
//! - **Decompress**: Unzip a release archive from S3 into a fresh S3 folder (`decompress`)
//! - **Queue**: Publish one import message per unzipped file (`queue`)
//! - **Truncate**: Empty the G-NAF tables (`truncate-tables`)
//! - **Import**: Drain the queue, bulk-loading each file (`import-data`)
//!
//! Commands talk to S3, SQS and PostgreSQL through the [`storage::ObjectStore`],
//! [`queue::Queue`] and [`db::BulkLoader`] traits.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod queue;
pub mod storage;

// Re-export commonly used types
pub use context::LogContext;
pub use error::{LoaderError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// G-NAF Loader - load the Geocoded National Address File into PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "gnaf-loader")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the command reference as Markdown and exit
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available loader commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Unzip a G-NAF archive from S3 into a new S3 folder
    Decompress {
        /// Bucket holding the zip archive
        source_bucket: String,

        /// Key of the zip archive
        source_file_name: String,

        /// Bucket to write the unzipped files to
        destination_bucket: String,

        /// Folder under which a new uniquely named folder is created
        destination_folder: String,
    },

    /// Queue one import message per object under an S3 prefix
    Queue {
        /// Name of the SQS queue
        queue_name: String,

        /// Bucket holding the unzipped files
        bucket_name: String,

        /// Key prefix of the unzipped files
        key_name: String,
    },

    /// Truncate every G-NAF table
    TruncateTables {
        #[command(flatten)]
        db: DbArgs,
    },

    /// Import queued files into the database until the queue is empty
    ImportData {
        /// Name of the SQS queue
        queue_name: String,

        /// Local directory for downloaded files
        temp_dir: PathBuf,

        #[command(flatten)]
        db: DbArgs,
    },
}

impl Commands {
    /// Name of the subcommand as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Decompress { .. } => "decompress",
            Commands::Queue { .. } => "queue",
            Commands::TruncateTables { .. } => "truncate-tables",
            Commands::ImportData { .. } => "import-data",
        }
    }
}

/// Database connection arguments
#[derive(clap::Args, Debug, Clone)]
pub struct DbArgs {
    /// Database host
    pub db_host: String,

    /// Database name
    pub db_name: String,

    /// Database user
    pub db_username: String,

    /// Database password
    pub db_password: String,

    /// Database port
    pub db_port: u16,
}

impl DbArgs {
    pub fn to_config(&self) -> config::DbConfig {
        config::DbConfig::new(
            &self.db_host,
            self.db_port,
            &self.db_name,
            &self.db_username,
            &self.db_password,
        )
    }
}
