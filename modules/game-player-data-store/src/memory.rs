//! In-memory store for tests. No database required.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use game_player_data_common::{GameMode, PlayerRecord};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::PlayerDataStore;

/// Map-backed store. Thread-safe.
///
/// `set_unavailable(true)` makes every trait call fail with
/// `StoreError::Unavailable`, standing in for a timed-out or unreachable
/// database.
#[derive(Default)]
pub struct MemoryPlayerStore {
    records: Mutex<HashMap<(GameMode, Uuid), PlayerRecord>>,
    unavailable: AtomicBool,
    writes: AtomicU64,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records directly, bypassing the write counter.
    pub fn with_records(records: impl IntoIterator<Item = PlayerRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.lock();
            for record in records {
                map.insert((record.game_mode(), record.player_id()), record);
            }
        }
        store
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `upsert_replace` calls.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Read a record for assertions. Ignores the availability switch.
    pub fn snapshot(&self, player_id: Uuid, mode: GameMode) -> Option<PlayerRecord> {
        self.lock().get(&(mode, player_id)).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(GameMode, Uuid), PlayerRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerDataStore for MemoryPlayerStore {
    async fn get(&self, player_id: Uuid, mode: GameMode) -> Result<PlayerRecord> {
        self.check_available()?;
        self.lock()
            .get(&(mode, player_id))
            .cloned()
            .ok_or(StoreError::NotFound { player_id, mode })
    }

    async fn get_batch(
        &self,
        player_ids: &[Uuid],
        mode: GameMode,
    ) -> Result<HashMap<Uuid, PlayerRecord>> {
        self.check_available()?;
        let map = self.lock();
        Ok(player_ids
            .iter()
            .filter_map(|id| map.get(&(mode, *id)).map(|r| (*id, r.clone())))
            .collect())
    }

    async fn upsert_replace(&self, record: &PlayerRecord) -> Result<()> {
        self.check_available()?;
        self.lock()
            .insert((record.game_mode(), record.player_id()), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
