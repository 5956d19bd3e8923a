use uuid::Uuid;

use crate::types::{BlockSumoData, GameMode, MinesweeperData, PlayerRecord, TowerDefenceData};

/// Baseline values for a player with no stored record in a mode.
///
/// Values are deployment policy; they never depend on the player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultPolicy {
    pub block_sumo_block_slot: u32,
    pub block_sumo_shears_slot: u32,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            block_sumo_block_slot: 2,
            block_sumo_shears_slot: 1,
        }
    }
}

impl DefaultPolicy {
    pub fn default_for(&self, mode: GameMode, player_id: Uuid) -> PlayerRecord {
        match mode {
            GameMode::BlockSumo => PlayerRecord::BlockSumo(BlockSumoData {
                player_id,
                block_slot: self.block_sumo_block_slot,
                shears_slot: self.block_sumo_shears_slot,
            }),
            GameMode::Minesweeper => PlayerRecord::Minesweeper(MinesweeperData { player_id }),
            GameMode::TowerDefence => PlayerRecord::TowerDefence(TowerDefenceData { player_id }),
        }
    }
}
