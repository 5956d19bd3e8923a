use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlayerDataError;
use crate::mask::Field;

// --- Player identity ---

/// Parse a player id from its wire string form.
pub fn parse_player_id(raw: &str) -> Result<Uuid, PlayerDataError> {
    Uuid::parse_str(raw.trim()).map_err(|_| PlayerDataError::InvalidPlayerId(raw.to_string()))
}

// --- Game modes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    BlockSumo,
    Minesweeper,
    TowerDefence,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [
        GameMode::BlockSumo,
        GameMode::Minesweeper,
        GameMode::TowerDefence,
    ];

    /// Resolve a wire discriminator. `None` means the mode is not implemented
    /// by this service (including the unspecified zero value).
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim() {
            "BLOCK_SUMO" | "block_sumo" => Some(GameMode::BlockSumo),
            "MINESWEEPER" | "minesweeper" => Some(GameMode::Minesweeper),
            "TOWER_DEFENCE" | "tower_defence" => Some(GameMode::TowerDefence),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            GameMode::BlockSumo => "BLOCK_SUMO",
            GameMode::Minesweeper => "MINESWEEPER",
            GameMode::TowerDefence => "TOWER_DEFENCE",
        }
    }

    /// The logical table holding this mode's records.
    pub fn table(&self) -> &'static str {
        match self {
            GameMode::BlockSumo => "block_sumo",
            GameMode::Minesweeper => "minesweeper",
            GameMode::TowerDefence => "tower_defence",
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl std::str::FromStr for GameMode {
    type Err = PlayerDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameMode::from_wire(s).ok_or_else(|| PlayerDataError::UnsupportedGameMode(s.to_string()))
    }
}

// --- Game data capability ---

/// A per-mode player record.
///
/// The player id is the record's storage key. It is never serialized with the
/// payload and never appears in `FIELDS`, so no field mask can touch it.
pub trait GameData: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const MODE: GameMode;

    /// Name → setter table consulted by field-mask merges.
    const FIELDS: &'static [Field<Self>];

    fn player_id(&self) -> Uuid;

    /// Attach the key after decoding a payload.
    fn keyed(self, player_id: Uuid) -> Self;

    fn to_wire(&self) -> GameDataPayload;

    /// Decode a payload object into this record shape. Absent fields take
    /// their zero value; unknown fields are ignored.
    fn decode(player_id: Uuid, payload: &serde_json::Value) -> Result<Self, PlayerDataError> {
        let data: Self =
            serde_json::from_value(payload.clone()).map_err(|e| PlayerDataError::PayloadDecode {
                mode: Self::MODE,
                reason: e.to_string(),
            })?;
        Ok(data.keyed(player_id))
    }

    fn encode(&self) -> Result<serde_json::Value, PlayerDataError> {
        serde_json::to_value(self).map_err(|e| PlayerDataError::PayloadEncode {
            mode: Self::MODE,
            reason: e.to_string(),
        })
    }
}

// --- Records ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSumoData {
    #[serde(skip)]
    pub player_id: Uuid,
    #[serde(default)]
    pub block_slot: u32,
    #[serde(default)]
    pub shears_slot: u32,
}

impl GameData for BlockSumoData {
    const MODE: GameMode = GameMode::BlockSumo;

    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "block_slot",
            apply: |dst, src| dst.block_slot = src.block_slot,
        },
        Field {
            name: "shears_slot",
            apply: |dst, src| dst.shears_slot = src.shears_slot,
        },
    ];

    fn player_id(&self) -> Uuid {
        self.player_id
    }

    fn keyed(self, player_id: Uuid) -> Self {
        Self { player_id, ..self }
    }

    fn to_wire(&self) -> GameDataPayload {
        GameDataPayload::BlockSumo(self.into())
    }
}

/// Minesweeper is declared upstream but carries no fields yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinesweeperData {
    #[serde(skip)]
    pub player_id: Uuid,
}

impl GameData for MinesweeperData {
    const MODE: GameMode = GameMode::Minesweeper;
    const FIELDS: &'static [Field<Self>] = &[];

    fn player_id(&self) -> Uuid {
        self.player_id
    }

    fn keyed(self, player_id: Uuid) -> Self {
        Self { player_id }
    }

    fn to_wire(&self) -> GameDataPayload {
        GameDataPayload::Minesweeper(self.into())
    }
}

/// Tower defence is declared upstream but carries no fields yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerDefenceData {
    #[serde(skip)]
    pub player_id: Uuid,
}

impl GameData for TowerDefenceData {
    const MODE: GameMode = GameMode::TowerDefence;
    const FIELDS: &'static [Field<Self>] = &[];

    fn player_id(&self) -> Uuid {
        self.player_id
    }

    fn keyed(self, player_id: Uuid) -> Self {
        Self { player_id }
    }

    fn to_wire(&self) -> GameDataPayload {
        GameDataPayload::TowerDefence(self.into())
    }
}

/// A stored record of any mode, addressed by (player id, game mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRecord {
    BlockSumo(BlockSumoData),
    Minesweeper(MinesweeperData),
    TowerDefence(TowerDefenceData),
}

impl PlayerRecord {
    pub fn game_mode(&self) -> GameMode {
        match self {
            PlayerRecord::BlockSumo(_) => GameMode::BlockSumo,
            PlayerRecord::Minesweeper(_) => GameMode::Minesweeper,
            PlayerRecord::TowerDefence(_) => GameMode::TowerDefence,
        }
    }

    pub fn player_id(&self) -> Uuid {
        match self {
            PlayerRecord::BlockSumo(d) => d.player_id(),
            PlayerRecord::Minesweeper(d) => d.player_id(),
            PlayerRecord::TowerDefence(d) => d.player_id(),
        }
    }

    /// Decode a payload into the variant selected by `mode`.
    pub fn decode(
        mode: GameMode,
        player_id: Uuid,
        payload: &serde_json::Value,
    ) -> Result<Self, PlayerDataError> {
        Ok(match mode {
            GameMode::BlockSumo => BlockSumoData::decode(player_id, payload)?.into(),
            GameMode::Minesweeper => MinesweeperData::decode(player_id, payload)?.into(),
            GameMode::TowerDefence => TowerDefenceData::decode(player_id, payload)?.into(),
        })
    }

    /// The payload as persisted (no player id; that is the key).
    pub fn encode(&self) -> Result<serde_json::Value, PlayerDataError> {
        match self {
            PlayerRecord::BlockSumo(d) => d.encode(),
            PlayerRecord::Minesweeper(d) => d.encode(),
            PlayerRecord::TowerDefence(d) => d.encode(),
        }
    }

    pub fn to_wire(&self) -> GameDataResponse {
        let data = match self {
            PlayerRecord::BlockSumo(d) => d.to_wire(),
            PlayerRecord::Minesweeper(d) => d.to_wire(),
            PlayerRecord::TowerDefence(d) => d.to_wire(),
        };
        GameDataResponse {
            game_mode: self.game_mode(),
            data,
        }
    }
}

impl From<BlockSumoData> for PlayerRecord {
    fn from(data: BlockSumoData) -> Self {
        PlayerRecord::BlockSumo(data)
    }
}

impl From<MinesweeperData> for PlayerRecord {
    fn from(data: MinesweeperData) -> Self {
        PlayerRecord::Minesweeper(data)
    }
}

impl From<TowerDefenceData> for PlayerRecord {
    fn from(data: TowerDefenceData) -> Self {
        PlayerRecord::TowerDefence(data)
    }
}

macro_rules! record_try_from {
    ($variant:ident, $data:ty) => {
        impl TryFrom<PlayerRecord> for $data {
            type Error = PlayerDataError;

            fn try_from(record: PlayerRecord) -> Result<Self, Self::Error> {
                match record {
                    PlayerRecord::$variant(data) => Ok(data),
                    other => Err(PlayerDataError::VariantMismatch {
                        expected: <$data as GameData>::MODE,
                        actual: other.game_mode(),
                    }),
                }
            }
        }
    };
}

record_try_from!(BlockSumo, BlockSumoData);
record_try_from!(Minesweeper, MinesweeperData);
record_try_from!(TowerDefence, TowerDefenceData);

// --- Wire shapes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSumoPlayerData {
    pub block_slot: u32,
    pub shears_slot: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinesweeperPlayerData {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TowerDefencePlayerData {}

impl From<&BlockSumoData> for BlockSumoPlayerData {
    fn from(data: &BlockSumoData) -> Self {
        Self {
            block_slot: data.block_slot,
            shears_slot: data.shears_slot,
        }
    }
}

impl From<&MinesweeperData> for MinesweeperPlayerData {
    fn from(_: &MinesweeperData) -> Self {
        Self {}
    }
}

impl From<&TowerDefenceData> for TowerDefencePlayerData {
    fn from(_: &TowerDefenceData) -> Self {
        Self {}
    }
}

/// Mode-specific payload carried by the generic response.
///
/// Serialize-only: the field-less shapes are indistinguishable on the wire,
/// so the mode travels beside it in `GameDataResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GameDataPayload {
    BlockSumo(BlockSumoPlayerData),
    Minesweeper(MinesweeperPlayerData),
    TowerDefence(TowerDefencePlayerData),
}

/// Generic query response: the explicit mode plus its typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameDataResponse {
    pub game_mode: GameMode,
    pub data: GameDataPayload,
}
