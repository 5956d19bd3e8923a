//! One JSONB table per game mode, keyed by a UUID primary key.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use game_player_data_common::{GameMode, PlayerRecord};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::PlayerDataStore;

/// Upper bound on any single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// PgPlayerStore
// ---------------------------------------------------------------------------

/// Postgres-backed record store. Cheap to clone; shares the pool.
///
/// The pool is owned by whoever constructed it. This store never closes it.
#[derive(Clone)]
pub struct PgPlayerStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgPlayerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create the per-mode tables. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running player data schema migrations...");

        for mode in GameMode::ALL {
            let ddl = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    player_id   UUID         PRIMARY KEY,
                    data        JSONB        NOT NULL,
                    updated_at  TIMESTAMPTZ  NOT NULL DEFAULT now()
                )
                "#,
                table = mode.table()
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }

        info!("Player data tables ready");
        Ok(())
    }

    /// Run `op` under the per-call timeout. Expiry and driver errors both
    /// surface as `Unavailable`.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Unavailable(format!(
                "{op} timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl PlayerDataStore for PgPlayerStore {
    async fn get(&self, player_id: Uuid, mode: GameMode) -> Result<PlayerRecord> {
        let sql = format!("SELECT data FROM {} WHERE player_id = $1", mode.table());

        let row = self
            .bounded(
                "get",
                sqlx::query_as::<_, (serde_json::Value,)>(&sql)
                    .bind(player_id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        let Some((data,)) = row else {
            return Err(StoreError::NotFound { player_id, mode });
        };

        PlayerRecord::decode(mode, player_id, &data).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn get_batch(
        &self,
        player_ids: &[Uuid],
        mode: GameMode,
    ) -> Result<HashMap<Uuid, PlayerRecord>> {
        if player_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT player_id, data FROM {} WHERE player_id = ANY($1)",
            mode.table()
        );

        let rows = self
            .bounded(
                "get_batch",
                sqlx::query_as::<_, (Uuid, serde_json::Value)>(&sql)
                    .bind(player_ids)
                    .fetch_all(&self.pool),
            )
            .await?;

        let mut records = HashMap::with_capacity(rows.len());
        for (player_id, data) in rows {
            match PlayerRecord::decode(mode, player_id, &data) {
                Ok(record) => {
                    records.insert(player_id, record);
                }
                // One bad row must not sink the batch.
                Err(e) => warn!(%player_id, game_mode = %mode, error = %e, "Skipping corrupt record"),
            }
        }

        Ok(records)
    }

    async fn upsert_replace(&self, record: &PlayerRecord) -> Result<()> {
        let data = record
            .encode()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let sql = format!(
            r#"
            INSERT INTO {} (player_id, data, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (player_id) DO UPDATE
            SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
            "#,
            record.game_mode().table()
        );

        self.bounded(
            "upsert_replace",
            sqlx::query(&sql)
                .bind(record.player_id())
                .bind(&data)
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }
}
