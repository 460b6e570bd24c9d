//! `gnaf-loader import-data` command implementation
//!
//! Drains the queue: every `import_file` message is downloaded, bulk-loaded
//! and then deleted. The loop ends on the first fetch that returns nothing.

use crate::config::{AwsConfig, DbConfig, LoadOptions, QueueConfig};
use crate::context::LogContext;
use crate::db::{BulkLoader, PgLoader};
use crate::error::{LoaderError, Result};
use crate::queue::{Queue, SqsQueue};
use crate::storage::{ObjectStore, S3Store};
use gnaf_common::types::{ImportFile, Instruction};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Messages imported and deleted
    pub imported: usize,
    /// Messages left on the queue because their instruction is unknown
    pub skipped: usize,
    pub rows: u64,
}

pub async fn execute(
    queue_name: &str,
    temp_dir: &Path,
    db: DbConfig,
    log: &LogContext,
) -> Result<()> {
    let aws = AwsConfig::from_env();
    let sdk_config = aws.load().await;
    let options = LoadOptions::from_env();

    let store = S3Store::new(&sdk_config, &aws, log.clone());
    let queue =
        SqsQueue::connect(&sdk_config, &aws, QueueConfig::from_env()?, queue_name, log.clone())
            .await?;
    let mut loader = PgLoader::connect(&db.with_env()?, &options, log.clone()).await?;

    run(&mut loader, &store, &queue, temp_dir, &options, log).await?;
    Ok(())
}

pub async fn run(
    loader: &mut dyn BulkLoader,
    store: &dyn ObjectStore,
    queue: &dyn Queue,
    temp_dir: &Path,
    options: &LoadOptions,
    log: &LogContext,
) -> Result<ImportSummary> {
    tokio::fs::create_dir_all(temp_dir).await?;

    info!(parent: log.span(), "Disable foreign key constraints checks...");
    loader.disable_foreign_key_checks().await?;

    let mut summary = ImportSummary::default();

    loop {
        info!(parent: log.span(), "Getting message from queue {}...", queue.name());
        let Some(message) = queue.fetch().await? else {
            break;
        };
        info!(parent: log.span(), "Message retrieved : {}", message.message_id);
        debug!(parent: log.span(), "Message body : {}", message.body);

        let instruction = Instruction::parse(&message.body)?;
        info!(parent: log.span(), "Message instruction : {}", instruction.tag());

        match instruction {
            Instruction::ImportFile(import) => {
                summary.rows += import_file(loader, store, &import, temp_dir, options, log).await?;

                info!(parent: log.span(), "Removing message {}...", message.message_id);
                queue.remove(&message).await?;
                summary.imported += 1;
            },
            Instruction::Unrecognized(tag) => {
                warn!(
                    parent: log.span(),
                    "Leaving message {} with unrecognized instruction '{}' on the queue",
                    message.message_id,
                    tag
                );
                summary.skipped += 1;
            },
        }
    }

    info!(parent: log.span(), "Enable foreign key constraints checks...");
    loader.enable_foreign_key_checks().await?;

    loader.close().await?;

    info!(
        parent: log.span(),
        "Imported {} files ({} rows), skipped {} messages",
        summary.imported,
        summary.rows,
        summary.skipped
    );

    Ok(summary)
}

/// Download one referenced object into `temp_dir` and load it
async fn import_file(
    loader: &mut dyn BulkLoader,
    store: &dyn ObjectStore,
    import: &ImportFile,
    temp_dir: &Path,
    options: &LoadOptions,
    log: &LogContext,
) -> Result<u64> {
    let object = import.object();
    let table = import.destination_table()?;

    let file_name = object.file_name();
    if file_name.is_empty() {
        return Err(LoaderError::invalid_message(format!(
            "key '{}' does not name a file",
            object.key
        )));
    }
    let file_path = temp_dir.join(file_name);

    info!(parent: log.span(), "Downloading file from {} to {}...", object, file_path.display());
    store.download(&object, &file_path).await?;

    info!(parent: log.span(), "Importing file {} to {}...", file_path.display(), table);
    let rows = loader.import_file(&file_path, &table).await?;

    if !options.keep_downloads {
        tokio::fs::remove_file(&file_path).await?;
    }

    Ok(rows)
}
