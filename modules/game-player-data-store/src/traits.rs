use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use game_player_data_common::{GameMode, PlayerRecord};
use uuid::Uuid;

use crate::error::Result;

/// Keyed record persistence.
///
/// Implemented by `PgPlayerStore` (production) and `MemoryPlayerStore`
/// (tests). Also implemented for `Arc<S>` so a store can be shared between
/// ingestion, queries, and test assertions.
#[async_trait]
pub trait PlayerDataStore: Send + Sync {
    /// Point lookup. `StoreError::NotFound` when the key is absent.
    async fn get(&self, player_id: Uuid, mode: GameMode) -> Result<PlayerRecord>;

    /// Batch lookup. Missing players are omitted from the map.
    async fn get_batch(
        &self,
        player_ids: &[Uuid],
        mode: GameMode,
    ) -> Result<HashMap<Uuid, PlayerRecord>>;

    /// Replace the whole record under (record.player_id, record.game_mode),
    /// creating it if absent.
    async fn upsert_replace(&self, record: &PlayerRecord) -> Result<()>;
}

#[async_trait]
impl<S: PlayerDataStore + ?Sized> PlayerDataStore for Arc<S> {
    async fn get(&self, player_id: Uuid, mode: GameMode) -> Result<PlayerRecord> {
        (**self).get(player_id, mode).await
    }

    async fn get_batch(
        &self,
        player_ids: &[Uuid],
        mode: GameMode,
    ) -> Result<HashMap<Uuid, PlayerRecord>> {
        (**self).get_batch(player_ids, mode).await
    }

    async fn upsert_replace(&self, record: &PlayerRecord) -> Result<()> {
        (**self).upsert_replace(record).await
    }
}
