use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions},
    publisher_confirm::Confirmation,
    BasicProperties, Channel, Connection,
};
use tracing::debug;

use crate::{connection::declare_durable_queue, AmqpError, Result};

const PERSISTENT: u8 = 2;

/// Properties of every published message: given content type, persistent delivery.
pub fn message_properties(content_type: &str) -> BasicProperties {
    BasicProperties::default()
        .with_content_type(content_type.into())
        .with_delivery_mode(PERSISTENT)
}

/// Publishes to one durable queue through the default exchange and waits
/// for the broker's confirmation of each message.
#[derive(Clone)]
pub struct AmqpPublisher {
    channel: Channel,
    queue: String,
    content_type: String,
}

impl AmqpPublisher {
    /// Open a confirm-mode channel and make sure `queue` exists.
    pub async fn open(conn: &Connection, queue: &str, content_type: &str) -> Result<Self> {
        let channel = conn.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        declare_durable_queue(&channel, queue).await?;
        Ok(Self {
            channel,
            queue: queue.to_string(),
            content_type: content_type.to_string(),
        })
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub async fn publish(&self, body: &[u8]) -> Result<()> {
        let confirmation = self
            .channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                body,
                message_properties(&self.content_type),
            )
            .await?
            .await?;

        match confirmation {
            Confirmation::Nack(_) => Err(AmqpError::NotConfirmed {
                queue: self.queue.clone(),
            }),
            _ => {
                debug!(queue = %self.queue, bytes = body.len(), "message confirmed");
                Ok(())
            }
        }
    }
}
