use futures::{Stream, StreamExt};
use modkit_amqp::{AmqpError, InboundMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::processor::{Disposition, EventProcessor};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    pub acked: u64,
    pub requeued: u64,
}

/// Sequential consume loop: one message is processed and settled before the
/// next is pulled. Returns on cancellation (checked between messages); a
/// broken or closed delivery stream is an error.
pub async fn run_consumer<S, M>(
    mut deliveries: S,
    processor: &EventProcessor,
    cancel: CancellationToken,
) -> anyhow::Result<ConsumerStats>
where
    S: Stream<Item = Result<M, AmqpError>> + Unpin,
    M: InboundMessage,
{
    let mut stats = ConsumerStats::default();
    info!("consuming user events");

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = deliveries.next() => next,
        };
        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => return Err(anyhow::Error::new(e).context("delivery stream failed")),
            None => anyhow::bail!("delivery stream closed by the broker"),
        };

        let result = processor.process(msg.body()).await;
        match Disposition::of(&result) {
            Disposition::Ack => {
                msg.ack().await?;
                stats.acked += 1;
                debug!(tag = msg.delivery_tag(), "message acknowledged");
            }
            Disposition::Requeue => {
                if let Err(e) = &result {
                    warn!(
                        tag = msg.delivery_tag(),
                        redelivered = msg.redelivered(),
                        error = %e,
                        "message returned to queue"
                    );
                }
                msg.requeue().await?;
                stats.requeued += 1;
            }
        }
    }

    info!(acked = stats.acked, requeued = stats.requeued, "consumer stopped");
    Ok(stats)
}
