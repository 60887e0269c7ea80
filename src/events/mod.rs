use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::app::BrowserController;

pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSaved {
    pub record_id: String,
    pub saved_at: OffsetDateTime,
}

impl RecordSaved {
    pub fn now(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            saved_at: OffsetDateTime::now_utc(),
        }
    }
}

pub struct RecordEvents {
    tx: broadcast::Sender<RecordSaved>,
}

impl RecordEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Dropped silently when nobody is listening.
    pub fn publish(&self, event: RecordSaved) {
        tracing::debug!(
            record_id = %event.record_id,
            subscribers = self.tx.receiver_count(),
            "record saved"
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordSaved> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RecordEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Subscription task handle; aborts the task on drop.
pub struct RecordListener {
    handle: JoinHandle<()>,
}

impl Drop for RecordListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Feeds every saved-record event into the controller until the bus closes
/// or the listener is dropped.
pub fn listen(
    controller: Arc<BrowserController>,
    mut events: broadcast::Receiver<RecordSaved>,
) -> RecordListener {
    let handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(err) = controller.on_record_saved(event).await {
                        tracing::warn!(error = %err, "record change left the browser blocked");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "record events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    RecordListener { handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let bus = RecordEvents::new(4);
        let mut rx = bus.subscribe();
        bus.publish(RecordSaved::now("rec-9"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.record_id, "rec-9");
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = RecordEvents::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(RecordSaved::now("rec-1"));
    }
}
