//! `gnaf-loader truncate-tables` command implementation

use crate::config::{DbConfig, LoadOptions};
use crate::context::LogContext;
use crate::db::{gnaf_tables, BulkLoader, PgLoader};
use crate::error::Result;
use gnaf_common::types::TableName;
use tracing::info;

/// Connect to the database and empty every G-NAF table
pub async fn execute(db: DbConfig, log: &LogContext) -> Result<()> {
    let tables = gnaf_tables()?;
    let mut loader = PgLoader::connect(&db.with_env()?, &LoadOptions::from_env(), log.clone()).await?;

    run(&mut loader, &tables, log).await
}

/// Truncate `tables` in order, then close the connection.
///
/// Each truncate stands alone: a failure stops the run with earlier tables
/// already emptied and later ones untouched.
pub async fn run(loader: &mut dyn BulkLoader, tables: &[TableName], log: &LogContext) -> Result<()> {
    for table in tables {
        info!(parent: log.span(), "Truncate table {}...", table);
        loader.truncate_table(table).await?;
    }

    loader.close().await
}
