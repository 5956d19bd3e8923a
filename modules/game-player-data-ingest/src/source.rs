//! Where change events come from.

use async_trait::async_trait;
use game_player_data_common::ChangeEvent;
use tokio::sync::mpsc;

use crate::error::IngestError;

/// A stream of change events with at-least-once delivery.
///
/// `next` must be cancel-safe: the ingestor drops a pending `next` when
/// shutdown is signalled. `ack` acknowledges the last event returned by
/// `next` and is only called once that event has been fully handled.
#[async_trait]
pub trait UpdateSource: Send {
    /// The next event, or `None` once the source is closed for good.
    async fn next(&mut self) -> Result<Option<ChangeEvent>, IngestError>;

    async fn ack(&mut self) -> Result<(), IngestError> {
        Ok(())
    }
}

/// In-process source backed by a tokio channel. Closed when every sender is dropped.
pub struct ChannelSource {
    rx: mpsc::Receiver<ChangeEvent>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    pub fn channel(capacity: usize) -> (mpsc::Sender<ChangeEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl UpdateSource for ChannelSource {
    async fn next(&mut self) -> Result<Option<ChangeEvent>, IngestError> {
        Ok(self.rx.recv().await)
    }
}
