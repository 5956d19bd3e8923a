//! Read-side dispatch: resolve a player's stored record and shape it for the
//! caller. Reads never substitute defaults; a missing record is `NotFound`.

use std::collections::HashMap;

use game_player_data_common::{
    parse_player_id, BlockSumoData, BlockSumoPlayerData, GameData, GameDataResponse, GameMode,
    MinesweeperData, MinesweeperPlayerData, PlayerDataError, PlayerRecord, TowerDefenceData,
    TowerDefencePlayerData,
};
use game_player_data_store::{PlayerDataStore, StoreError};
use tracing::warn;
use uuid::Uuid;

use crate::error::{QueryError, QueryResult};

/// Largest batch a single call may ask for.
pub const MAX_BATCH_SIZE: usize = 500;

pub struct QueryService<S> {
    store: S,
}

impl<S: PlayerDataStore> QueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Generic lookup: the record for `game_mode`, tagged with its mode.
    pub async fn get_player_data(
        &self,
        player_id: &str,
        game_mode: &str,
    ) -> QueryResult<GameDataResponse> {
        let player_id = parse_player_id(player_id)?;
        let mode = game_mode.parse::<GameMode>()?;

        let record = self.fetch(player_id, mode).await?;
        Ok(record.to_wire())
    }

    pub async fn get_block_sumo_data(&self, player_id: &str) -> QueryResult<BlockSumoPlayerData> {
        let data: BlockSumoData = self.fetch_typed(player_id).await?;
        Ok((&data).into())
    }

    pub async fn get_minesweeper_data(
        &self,
        player_id: &str,
    ) -> QueryResult<MinesweeperPlayerData> {
        let data: MinesweeperData = self.fetch_typed(player_id).await?;
        Ok((&data).into())
    }

    pub async fn get_tower_defence_data(
        &self,
        player_id: &str,
    ) -> QueryResult<TowerDefencePlayerData> {
        let data: TowerDefenceData = self.fetch_typed(player_id).await?;
        Ok((&data).into())
    }

    /// Batch BlockSumo lookup. Players without a record are omitted.
    ///
    /// Any malformed id fails the whole call before the store is touched.
    pub async fn get_block_sumo_data_for_players<I>(
        &self,
        player_ids: I,
    ) -> QueryResult<HashMap<Uuid, BlockSumoPlayerData>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut ids = player_ids
            .into_iter()
            .map(|raw| parse_player_id(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        ids.sort_unstable();
        ids.dedup();

        if ids.len() > MAX_BATCH_SIZE {
            return Err(QueryError::invalid_argument(format!(
                "at most {MAX_BATCH_SIZE} player ids per batch"
            )));
        }

        let records = self
            .store
            .get_batch(&ids, GameMode::BlockSumo)
            .await
            .map_err(|e| store_failure(e, GameMode::BlockSumo))?;

        let mut players = HashMap::with_capacity(records.len());
        for (player_id, record) in records {
            match BlockSumoData::try_from(record) {
                Ok(data) => {
                    players.insert(player_id, (&data).into());
                }
                Err(e) => warn!(%player_id, error = %e, "Skipping mismatched record in batch"),
            }
        }

        Ok(players)
    }

    async fn fetch(&self, player_id: Uuid, mode: GameMode) -> QueryResult<PlayerRecord> {
        self.store
            .get(player_id, mode)
            .await
            .map_err(|e| store_failure(e, mode))
    }

    async fn fetch_typed<T>(&self, player_id: &str) -> QueryResult<T>
    where
        T: GameData + TryFrom<PlayerRecord, Error = PlayerDataError>,
    {
        let player_id = parse_player_id(player_id)?;
        let mode = T::MODE;
        let record = self.fetch(player_id, mode).await?;
        T::try_from(record).map_err(|e| {
            warn!(%player_id, game_mode = %mode, error = %e, "Store returned the wrong record shape");
            QueryError::internal("failed to load player data")
        })
    }
}

fn store_failure(err: StoreError, mode: GameMode) -> QueryError {
    match err {
        StoreError::NotFound { player_id, mode } => {
            QueryError::NotFound(format!("no {mode} data for player {player_id}"))
        }
        other => {
            warn!(game_mode = %mode, error = %other, "Player data lookup failed");
            QueryError::internal("failed to load player data")
        }
    }
}
