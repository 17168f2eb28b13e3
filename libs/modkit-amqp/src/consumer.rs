use async_trait::async_trait;
use futures::{Stream, StreamExt};
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions},
    types::FieldTable,
    Connection, Consumer,
};
use tracing::info;

use crate::{connection::declare_durable_queue, AmqpError, Result};

/// A received message awaiting settlement.
#[async_trait]
pub trait InboundMessage: Send {
    fn body(&self) -> &[u8];
    fn delivery_tag(&self) -> u64;
    fn redelivered(&self) -> bool;
    /// Positive acknowledgement; the broker drops the message.
    async fn ack(&self) -> Result<()>;
    /// Negative acknowledgement asking the broker to redeliver.
    async fn requeue(&self) -> Result<()>;
}

/// [`InboundMessage`] backed by a lapin delivery.
pub struct AmqpDelivery(pub Delivery);

#[async_trait]
impl InboundMessage for AmqpDelivery {
    fn body(&self) -> &[u8] {
        &self.0.data
    }

    fn delivery_tag(&self) -> u64 {
        self.0.delivery_tag
    }

    fn redelivered(&self) -> bool {
        self.0.redelivered
    }

    async fn ack(&self) -> Result<()> {
        self.0.acker.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn requeue(&self) -> Result<()> {
        self.0
            .acker
            .nack(BasicNackOptions {
                requeue: true,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

/// Declare `queue`, bound the unacknowledged window to `prefetch` and start
/// a manual-ack consumer on a dedicated channel.
pub async fn open_consumer(
    conn: &Connection,
    queue: &str,
    prefetch: u16,
    consumer_tag: &str,
) -> Result<Consumer> {
    let channel = conn.create_channel().await?;
    declare_durable_queue(&channel, queue).await?;
    channel
        .basic_qos(prefetch, BasicQosOptions::default())
        .await?;
    let consumer = channel
        .basic_consume(
            queue,
            consumer_tag,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    info!(queue, prefetch, consumer_tag, "consumer started");
    Ok(consumer)
}

/// Adapt a lapin consumer into a stream of [`InboundMessage`]s.
pub fn deliveries(consumer: Consumer) -> impl Stream<Item = Result<AmqpDelivery>> + Send + Unpin {
    consumer.map(|d| d.map(AmqpDelivery).map_err(AmqpError::from))
}
