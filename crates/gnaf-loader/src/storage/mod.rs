//! Object storage (S3)
//!
//! Commands talk to storage through [`ObjectStore`]; [`S3Store`] is the
//! production implementation. Archive decompression lives in [`archive`] and
//! is built on the same three calls.

use crate::config::AwsConfig;
use crate::context::LogContext;
use crate::error::{LoaderError, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, Client};
use gnaf_common::types::ObjectRef;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub mod archive;

pub use archive::unzip_archive;

/// Capability interface over a blob store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every object whose key starts with `prefix`, across all result pages
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRef>>;

    /// Write the object's bytes to `path`, returning the number of bytes
    async fn download(&self, object: &ObjectRef, path: &Path) -> Result<u64>;

    /// Store the file at `path` as `object`
    async fn upload(&self, path: &Path, object: &ObjectRef) -> Result<()>;
}

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    log: LogContext,
}

impl S3Store {
    pub fn new(sdk_config: &SdkConfig, config: &AwsConfig, log: LogContext) -> Self {
        let mut s3_config_builder =
            aws_sdk_s3::config::Builder::from(sdk_config).force_path_style(config.s3_path_style);

        if let Some(endpoint) = &config.s3_endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        debug!(parent: log.span(), region = %config.region, "S3 client initialized");

        Self { client, log }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRef>> {
        debug!(parent: self.log.span(), "Listing objects in s3://{}/{}", bucket, prefix);

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| {
                    LoaderError::storage(format!(
                        "Failed to list s3://{}/{}: {}",
                        bucket,
                        prefix,
                        DisplayErrorContext(&e)
                    ))
                })?;

            objects.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .map(|key| ObjectRef::new(bucket, key)),
            );

            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(parent: self.log.span(), "Listed {} objects in s3://{}/{}", objects.len(), bucket, prefix);

        Ok(objects)
    }

    async fn download(&self, object: &ObjectRef, path: &Path) -> Result<u64> {
        debug!(parent: self.log.span(), "Downloading s3://{} to {}", object, path.display());

        let response = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| {
                LoaderError::storage(format!(
                    "Failed to download s3://{}: {}",
                    object,
                    DisplayErrorContext(&e)
                ))
            })?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut body = response.body.into_async_read();
        let size = tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;

        debug!(parent: self.log.span(), "Downloaded {} bytes from s3://{}", size, object);

        Ok(size)
    }

    async fn upload(&self, path: &Path, object: &ObjectRef) -> Result<()> {
        debug!(parent: self.log.span(), "Uploading {} to s3://{}", path.display(), object);

        let body = ByteStream::from_path(path).await.map_err(|e| {
            LoaderError::storage(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.client
            .put_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                LoaderError::storage(format!(
                    "Failed to upload s3://{}: {}",
                    object,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!(parent: self.log.span(), "Successfully uploaded to s3://{}", object);

        Ok(())
    }
}
