//! `gnaf-loader queue` command implementation
//!
//! Publishes one `import_file` message per object under a prefix.

use crate::config::{AwsConfig, QueueConfig};
use crate::context::LogContext;
use crate::error::Result;
use crate::queue::{Queue, SqsQueue};
use crate::storage::{ObjectStore, S3Store};
use gnaf_common::types::{ImportFile, ObjectRef, TableName, IMPORT_FILE};
use tracing::{debug, info};

pub async fn execute(
    queue_name: &str,
    bucket_name: &str,
    key_name: &str,
    log: &LogContext,
) -> Result<()> {
    let aws = AwsConfig::from_env();
    let sdk_config = aws.load().await;

    let store = S3Store::new(&sdk_config, &aws, log.clone());
    let queue =
        SqsQueue::connect(&sdk_config, &aws, QueueConfig::from_env()?, queue_name, log.clone())
            .await?;

    run(&store, &queue, bucket_name, key_name, log).await?;
    Ok(())
}

/// Publish one message per object under `bucket_name/key_name`, returning
/// the number published.
///
/// Every key is mapped to its table before anything is sent, so a key that
/// names no G-NAF table aborts the run with nothing published.
pub async fn run(
    store: &dyn ObjectStore,
    queue: &dyn Queue,
    bucket_name: &str,
    key_name: &str,
    log: &LogContext,
) -> Result<usize> {
    info!(
        parent: log.span(),
        "Start queueing item in {} to {}...",
        ObjectRef::new(bucket_name, key_name),
        queue.name()
    );
    info!(parent: log.span(), "Action type is {}...", IMPORT_FILE);

    let imports = store
        .list(bucket_name, key_name)
        .await?
        .into_iter()
        .filter(|o| !o.is_folder_marker())
        .map(|object| -> Result<_> {
            let table = TableName::from_object_key(&object.key)?;
            Ok((object, table))
        })
        .collect::<Result<Vec<_>>>()?;

    for (object, table) in &imports {
        let body = ImportFile::new(&object.bucket, &object.key, table).to_json()?;
        queue.publish(&body).await?;

        debug!(parent: log.span(), "Queued {} for {}", object, table);
    }

    info!(parent: log.span(), "Queued {} items to {}", imports.len(), queue.name());

    Ok(imports.len())
}
