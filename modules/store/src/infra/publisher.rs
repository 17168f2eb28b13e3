use anyhow::Context;
use async_trait::async_trait;
use modkit_amqp::AmqpPublisher;

use crate::domain::ports::UserEventPublisher;

/// Publishes user events to their durable queue with broker confirms.
#[derive(Clone)]
pub struct AmqpUserEventPublisher {
    inner: AmqpPublisher,
}

impl AmqpUserEventPublisher {
    pub async fn open(conn: &modkit_amqp::Connection, queue: &str) -> anyhow::Result<Self> {
        let inner = AmqpPublisher::open(conn, queue, user_events::CONTENT_TYPE)
            .await
            .with_context(|| format!("failed to open publisher for '{queue}'"))?;
        Ok(Self { inner })
    }

    pub fn queue(&self) -> &str {
        self.inner.queue()
    }
}

#[async_trait]
impl UserEventPublisher for AmqpUserEventPublisher {
    async fn publish(&self, body: &[u8]) -> anyhow::Result<()> {
        self.inner
            .publish(body)
            .await
            .with_context(|| format!("publish to '{}' failed", self.inner.queue()))
    }
}
