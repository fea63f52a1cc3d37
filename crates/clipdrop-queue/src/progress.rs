//! Progress events over a broadcast channel.

use std::path::Path;

use tokio::sync::broadcast;
use tracing::trace;

use clipdrop_models::{Category, PipelineEvent, Stage};

/// Default buffered events per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`PipelineEvent`]s.
///
/// Publishing never blocks and succeeds without subscribers. A subscriber
/// that falls more than `capacity` events behind sees
/// `RecvError::Lagged`; dropping a receiver unsubscribes it.
#[derive(Clone)]
pub struct ProgressChannel {
    tx: broadcast::Sender<PipelineEvent>,
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event; returns how many subscribers received it.
    pub fn publish(&self, event: PipelineEvent) -> usize {
        trace!(path = %event.path().display(), "Publishing pipeline event");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn queued(&self, path: &Path) -> usize {
        self.publish(PipelineEvent::queued(path))
    }

    pub fn progress(&self, path: &Path, stage: Stage, message: impl Into<String>) -> usize {
        self.publish(PipelineEvent::progress(path, stage, message))
    }

    pub fn failed(&self, path: &Path, stage: Option<Stage>, error: impl Into<String>) -> usize {
        self.publish(PipelineEvent::failed(path, stage, error))
    }

    pub fn completed(
        &self,
        path: &Path,
        asset_id: &str,
        video_url: &str,
        thumbnail_url: &str,
        category: Category,
    ) -> usize {
        self.publish(PipelineEvent::completed(path, asset_id, video_url, thumbnail_url, category))
    }
}
