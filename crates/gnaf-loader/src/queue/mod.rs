//! Message queue (SQS)
//!
//! [`Queue`] is the capability the commands use; [`SqsQueue`] is the
//! production implementation bound to one queue URL.

use crate::config::{AwsConfig, QueueConfig};
use crate::context::LogContext;
use crate::error::{LoaderError, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::{error::DisplayErrorContext, Client};
use tracing::{debug, info};

/// A message handed out by the queue, not yet deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: String,
    /// Token required to delete this delivery of the message
    pub receipt_handle: String,
    pub body: String,
}

/// Capability interface over a message queue
#[async_trait]
pub trait Queue: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, body: &str) -> Result<()>;

    /// Next available message, or `None` when the queue has nothing to hand out
    async fn fetch(&self) -> Result<Option<ReceivedMessage>>;

    async fn remove(&self, message: &ReceivedMessage) -> Result<()>;
}

pub struct SqsQueue {
    client: Client,
    name: String,
    url: String,
    config: QueueConfig,
    log: LogContext,
}

impl SqsQueue {
    /// Resolve the URL of the queue called `name` and bind to it
    pub async fn connect(
        sdk_config: &SdkConfig,
        aws: &AwsConfig,
        config: QueueConfig,
        name: &str,
        log: LogContext,
    ) -> Result<Self> {
        let mut sqs_config_builder = aws_sdk_sqs::config::Builder::from(sdk_config);

        if let Some(endpoint) = &aws.sqs_endpoint {
            sqs_config_builder = sqs_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(sqs_config_builder.build());

        let response = client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| {
                LoaderError::queue(format!(
                    "Failed to resolve queue '{}': {}",
                    name,
                    DisplayErrorContext(&e)
                ))
            })?;

        let url = response
            .queue_url()
            .ok_or_else(|| LoaderError::queue(format!("Queue '{}' has no URL", name)))?
            .to_string();

        debug!(parent: log.span(), "Resolved queue {} to {}", name, url);

        Ok(Self {
            client,
            name: name.to_string(),
            url,
            config,
            log,
        })
    }
}

#[async_trait]
impl Queue for SqsQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, body: &str) -> Result<()> {
        let response = self
            .client
            .send_message()
            .queue_url(&self.url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                LoaderError::queue(format!(
                    "Failed to send message to '{}': {}",
                    self.name,
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(
            parent: self.log.span(),
            message_id = response.message_id().unwrap_or_default(),
            "Message sent to {}",
            self.name
        );

        Ok(())
    }

    async fn fetch(&self) -> Result<Option<ReceivedMessage>> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.url)
            .max_number_of_messages(1)
            .wait_time_seconds(self.config.wait_time_seconds)
            .set_visibility_timeout(self.config.visibility_timeout)
            .send()
            .await
            .map_err(|e| {
                LoaderError::queue(format!(
                    "Failed to receive message from '{}': {}",
                    self.name,
                    DisplayErrorContext(&e)
                ))
            })?;

        let Some(message) = response.messages().first() else {
            return Ok(None);
        };

        let receipt_handle = message
            .receipt_handle()
            .ok_or_else(|| LoaderError::queue("Received message without a receipt handle"))?;

        Ok(Some(ReceivedMessage {
            message_id: message.message_id().unwrap_or_default().to_string(),
            receipt_handle: receipt_handle.to_string(),
            body: message.body().unwrap_or_default().to_string(),
        }))
    }

    async fn remove(&self, message: &ReceivedMessage) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await
            .map_err(|e| {
                LoaderError::queue(format!(
                    "Failed to delete message {} from '{}': {}",
                    message.message_id,
                    self.name,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!(parent: self.log.span(), "Deleted message {} from {}", message.message_id, self.name);

        Ok(())
    }
}
