//! `gnaf-loader decompress` command implementation
//!
//! Unzips a G-NAF release archive from one S3 location into a freshly
//! generated folder in another.

use crate::config::AwsConfig;
use crate::context::LogContext;
use crate::error::Result;
use crate::storage::{unzip_archive, ObjectStore, S3Store};
use gnaf_common::types::{join_key, ObjectRef, PSV_EXTENSION};
use tracing::info;
use uuid::Uuid;

/// Where a decompress run put its files
#[derive(Debug, Clone)]
pub struct DecompressOutcome {
    /// Destination bucket and the generated folder key
    pub destination: ObjectRef,
    pub files: Vec<ObjectRef>,
}

pub async fn execute(
    source_bucket: &str,
    source_file_name: &str,
    destination_bucket: &str,
    destination_folder: &str,
    log: &LogContext,
) -> Result<()> {
    let aws = AwsConfig::from_env();
    let store = S3Store::new(&aws.load().await, &aws, log.clone());

    run(
        &store,
        source_bucket,
        source_file_name,
        destination_bucket,
        destination_folder,
        log,
    )
    .await?;
    Ok(())
}

pub async fn run(
    store: &dyn ObjectStore,
    source_bucket: &str,
    source_file_name: &str,
    destination_bucket: &str,
    destination_folder: &str,
    log: &LogContext,
) -> Result<DecompressOutcome> {
    let destination = ObjectRef::new(
        destination_bucket,
        join_key(destination_folder, &Uuid::new_v4().to_string()),
    );
    let source = ObjectRef::new(source_bucket, source_file_name);

    info!(parent: log.span(), "Start unzipping file {} from cloud storage...", source);

    let files = unzip_archive(
        store,
        &source,
        &destination.bucket,
        &destination.key,
        PSV_EXTENSION,
        log,
    )
    .await?;

    info!(parent: log.span(), "Finish archiving {} files...", files.len());
    info!(parent: log.span(), "Files are archived in S3 {}", destination);

    Ok(DecompressOutcome { destination, files })
}
