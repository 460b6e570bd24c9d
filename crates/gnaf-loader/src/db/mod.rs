//! PostgreSQL bulk loading
//!
//! [`BulkLoader`] is what the commands need from a database: truncation,
//! foreign-key toggling and `COPY`-based file import over one connection.
//! [`PgLoader`] implements it on a single `PgConnection`; there is no pool.

use crate::config::{DbConfig, LoadOptions};
use crate::context::LogContext;
use crate::error::{LoaderError, Result};
use async_trait::async_trait;
use gnaf_common::types::TableName;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgCopyIn};
use sqlx::Connection;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

pub mod tables;

pub use tables::{gnaf_tables, GNAF_TABLES};

/// Read size for streaming a file into `COPY`.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Capability interface over the target database connection
#[async_trait]
pub trait BulkLoader: Send {
    async fn truncate_table(&mut self, table: &TableName) -> Result<()>;

    async fn disable_foreign_key_checks(&mut self) -> Result<()>;

    async fn enable_foreign_key_checks(&mut self) -> Result<()>;

    /// Load the pipe-separated file at `path` into `table`, returning the
    /// number of rows copied
    async fn import_file(&mut self, path: &Path, table: &TableName) -> Result<u64>;

    /// Release the connection; later calls fail with
    /// [`LoaderError::ConnectionClosed`]
    async fn close(&mut self) -> Result<()>;
}

pub struct PgLoader {
    conn: Option<PgConnection>,
    host: String,
    header: bool,
    log: LogContext,
}

impl PgLoader {
    pub async fn connect(config: &DbConfig, options: &LoadOptions, log: LogContext) -> Result<Self> {
        info!(parent: log.span(), "Setting up database connection to {}...", config.host);
        debug!(parent: log.span(), "Connecting with {:?}", config);

        let connect_options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.username)
            .password(&config.password)
            .ssl_mode(config.ssl_mode);

        let conn = tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            PgConnection::connect_with(&connect_options),
        )
        .await
        .map_err(|_| LoaderError::ConnectTimeout {
            host: config.host.clone(),
            secs: config.connect_timeout_secs,
        })??;

        Ok(Self {
            conn: Some(conn),
            host: config.host.clone(),
            header: options.header,
            log,
        })
    }

    fn connection(&mut self) -> Result<&mut PgConnection> {
        self.conn.as_mut().ok_or(LoaderError::ConnectionClosed)
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        debug!(parent: self.log.span(), "Executing: {}", sql);
        let conn = self.connection()?;
        sqlx::query(sql).execute(&mut *conn).await?;
        Ok(())
    }
}

/// `COPY` statement for a pipe-separated file
pub fn copy_statement(table: &TableName, header: bool) -> String {
    format!(
        "COPY {} FROM STDIN WITH (FORMAT csv, DELIMITER '|', HEADER {})",
        table.quoted(),
        header
    )
}

async fn stream_file(copy: &mut PgCopyIn<&mut PgConnection>, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        copy.send(&buf[..read]).await?;
    }

    Ok(())
}

/// The error to report when streaming a file into `COPY` failed. A failed
/// abort is logged; the streaming error is what the caller sees.
fn stream_failure(
    err: LoaderError,
    aborted: std::result::Result<(), sqlx::Error>,
    log: &LogContext,
) -> LoaderError {
    if let Err(abort_err) = aborted {
        warn!(parent: log.span(), "Failed to abort COPY after '{}': {}", err, abort_err);
    }
    err
}

#[async_trait]
impl BulkLoader for PgLoader {
    async fn truncate_table(&mut self, table: &TableName) -> Result<()> {
        self.execute(&format!("TRUNCATE TABLE {}", table.quoted())).await
    }

    async fn disable_foreign_key_checks(&mut self) -> Result<()> {
        self.execute("SET session_replication_role = replica").await
    }

    async fn enable_foreign_key_checks(&mut self) -> Result<()> {
        self.execute("SET session_replication_role = DEFAULT").await
    }

    async fn import_file(&mut self, path: &Path, table: &TableName) -> Result<u64> {
        let statement = copy_statement(table, self.header);
        debug!(parent: self.log.span(), "Executing: {}", statement);

        let conn = self.connection()?;
        let mut copy = conn.copy_in_raw(&statement).await?;

        if let Err(err) = stream_file(&mut copy, path).await {
            let aborted = copy.abort(err.to_string()).await;
            return Err(stream_failure(err, aborted, &self.log));
        }

        let rows = copy.finish().await?;
        debug!(parent: self.log.span(), "Copied {} rows from {} into {}", rows, path.display(), table);

        Ok(rows)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            info!(parent: self.log.span(), "Close database connection to {}...", self.host);
            conn.close().await?;
        }
        Ok(())
    }
}
