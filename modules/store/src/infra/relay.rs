use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::OutboxConfig;
use crate::domain::ports::{OutboxStore, UserEventPublisher};

/// Result of one pass over the outbox.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub fetched: usize,
    pub published: usize,
    pub failed: usize,
}

impl RelayReport {
    /// The batch was full and fully published, so more records may be waiting.
    fn saturated(&self, batch_size: usize) -> bool {
        self.failed == 0 && self.fetched >= batch_size && self.fetched > 0
    }
}

/// Drains the user outbox into the broker, oldest record first.
///
/// A failed publish stops the pass so later events never overtake it; the
/// failed record is retried on the next pass.
pub struct OutboxRelay {
    store: Arc<dyn OutboxStore>,
    publisher: Arc<dyn UserEventPublisher>,
    batch_size: usize,
    poll_interval: Duration,
}

impl OutboxRelay {
    pub fn new(store: Arc<dyn OutboxStore>, publisher: Arc<dyn UserEventPublisher>) -> Self {
        let defaults = OutboxConfig::default();
        Self {
            store,
            publisher,
            batch_size: defaults.batch_size,
            poll_interval: defaults.poll_interval,
        }
    }

    pub fn from_config(
        store: Arc<dyn OutboxStore>,
        publisher: Arc<dyn UserEventPublisher>,
        cfg: &OutboxConfig,
    ) -> Self {
        Self::new(store, publisher)
            .with_batch_size(cfg.batch_size)
            .with_poll_interval(cfg.poll_interval)
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Publish up to one batch of pending records.
    pub async fn relay_once(&self) -> anyhow::Result<RelayReport> {
        let records = self.store.pending(self.batch_size).await?;
        let mut report = RelayReport {
            fetched: records.len(),
            ..Default::default()
        };

        for record in records {
            let body = serde_json::to_vec(&record.payload)?;
            match self.publisher.publish(&body).await {
                Ok(()) => {
                    self.store.mark_published(record.id).await?;
                    report.published += 1;
                    debug!(id = record.id, "outbox record published");
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    warn!(id = record.id, attempts = record.attempts + 1, error = %error, "outbox publish failed");
                    self.store.mark_failed(record.id, &error).await?;
                    report.failed += 1;
                    break;
                }
            }
        }
        Ok(report)
    }

    /// Poll until `cancel` fires. Saturated passes are followed immediately
    /// by another pass; otherwise the relay sleeps for the poll interval.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "outbox relay started"
        );
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let pause = match self.relay_once().await {
                Ok(report) => {
                    if report.published > 0 || report.failed > 0 {
                        info!(
                            published = report.published,
                            failed = report.failed,
                            "outbox pass finished"
                        );
                    }
                    if report.saturated(self.batch_size) {
                        continue;
                    }
                    self.poll_interval
                }
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "outbox pass aborted");
                    self.poll_interval
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
        info!("outbox relay stopped");
    }
}
