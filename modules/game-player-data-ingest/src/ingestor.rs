//! The ingestion state machine and consumption loop.

use std::fmt;
use std::time::Duration;

use game_player_data_common::{ChangeEvent, DefaultPolicy, GameMode, PlayerRecord};
use game_player_data_store::PlayerDataStore;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::IngestError;
use crate::source::UpdateSource;

/// Terminal state of one change event.
#[derive(Debug)]
pub enum Outcome {
    /// Merged and written.
    Persisted { player_id: Uuid, mode: GameMode },
    /// Discriminator this service does not implement. Nothing was touched.
    Ignored { game_mode: String },
    /// Malformed identity or payload. Dropped.
    Rejected(IngestError),
    /// Store read or write failed. Dropped; redelivery is the source's concern.
    Failed(IngestError),
}

/// Running counters for a consumption loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub persisted: u64,
    pub ignored: u64,
    pub rejected: u64,
    pub failed: u64,
}

impl IngestStats {
    pub fn record(&mut self, outcome: &Outcome) {
        self.received += 1;
        match outcome {
            Outcome::Persisted { .. } => self.persisted += 1,
            Outcome::Ignored { .. } => self.ignored += 1,
            Outcome::Rejected(_) => self.rejected += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received={} persisted={} ignored={} rejected={} failed={}",
            self.received, self.persisted, self.ignored, self.rejected, self.failed
        )
    }
}

/// Applies change events to the store.
///
/// Events are handled strictly one at a time, so events for the same
/// (player, mode) are applied in arrival order.
pub struct Ingestor<S> {
    store: S,
    defaults: DefaultPolicy,
    source_retry_delay: Duration,
}

impl<S: PlayerDataStore> Ingestor<S> {
    pub fn new(store: S, defaults: DefaultPolicy) -> Self {
        Self {
            store,
            defaults,
            source_retry_delay: Duration::from_secs(1),
        }
    }

    /// Pause after a failed `next` before asking the source again.
    pub fn with_source_retry_delay(mut self, delay: Duration) -> Self {
        self.source_retry_delay = delay;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one event through decode → resolve → merge → persist.
    pub async fn handle(&self, event: &ChangeEvent) -> Outcome {
        let outcome = self.apply(event).await;

        match &outcome {
            Outcome::Persisted { player_id, mode } => {
                debug!(%player_id, game_mode = %mode, mask = ?event.data_mask.paths(), "Applied update");
            }
            Outcome::Ignored { game_mode } => {
                debug!(game_mode = game_mode.as_str(), "Ignoring update for unsupported game mode");
            }
            Outcome::Rejected(e) => {
                warn!(
                    player_id = event.player_id.as_str(),
                    game_mode = event.game_mode.as_str(),
                    error = %e,
                    "Rejected update"
                );
            }
            Outcome::Failed(e) => {
                warn!(
                    player_id = event.player_id.as_str(),
                    game_mode = event.game_mode.as_str(),
                    error = %e,
                    "Failed to handle update"
                );
            }
        }

        outcome
    }

    async fn apply(&self, event: &ChangeEvent) -> Outcome {
        let player_id = match event.parse_player_id() {
            Ok(id) => id,
            Err(e) => return Outcome::Rejected(e.into()),
        };

        let Some(mode) = event.resolve_game_mode() else {
            return Outcome::Ignored {
                game_mode: event.game_mode.clone(),
            };
        };

        let base = match self.resolve(player_id, mode).await {
            Ok(record) => record,
            Err(e) => return Outcome::Failed(e),
        };

        let partial = match PlayerRecord::decode(mode, player_id, &event.data) {
            Ok(partial) => partial,
            Err(e) => return Outcome::Rejected(e.into()),
        };

        // Both sides were built for `mode`; a mismatch means the store handed
        // back the wrong variant.
        let merged = match base.merge(&partial, &event.data_mask) {
            Ok(merged) => merged,
            Err(e) => return Outcome::Failed(e.into()),
        };

        match self.store.upsert_replace(&merged).await {
            Ok(()) => Outcome::Persisted { player_id, mode },
            Err(e) => Outcome::Failed(e.into()),
        }
    }

    /// The stored record, or the default when the player has none yet.
    async fn resolve(&self, player_id: Uuid, mode: GameMode) -> Result<PlayerRecord, IngestError> {
        match self.store.get(player_id, mode).await {
            Ok(record) => Ok(record),
            Err(e) if e.is_not_found() => Ok(self.defaults.default_for(mode, player_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Consume `source` until it closes or `shutdown` turns true.
    ///
    /// Shutdown is only observed while waiting for the next event. An event
    /// that is already being handled runs to completion and is acknowledged
    /// before the loop exits.
    pub async fn run<Src: UpdateSource>(
        &self,
        mut source: Src,
        mut shutdown: watch::Receiver<bool>,
    ) -> IngestStats {
        let mut stats = IngestStats::default();
        info!("Ingestor started");

        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested, stopping ingestion");
                break;
            }

            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("Shutdown handle dropped, stopping ingestion");
                        break;
                    }
                    continue;
                }
                next = source.next() => next,
            };

            match next {
                Ok(Some(event)) => {
                    let outcome = self.handle(&event).await;
                    stats.record(&outcome);
                    if let Err(e) = source.ack().await {
                        warn!(error = %e, "Failed to acknowledge update");
                    }
                }
                Ok(None) => {
                    info!("Update source closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read from update source");
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(self.source_retry_delay) => {}
                    }
                }
            }
        }

        info!(%stats, "Ingestor stopped");
        stats
    }
}
