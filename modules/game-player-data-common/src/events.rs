use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlayerDataError;
use crate::mask::FieldMask;
use crate::types::{parse_player_id, GameMode};

/// An inbound partial update for one (player, game mode) record.
///
/// Identity and mode stay in their raw wire form until ingestion decodes them,
/// so a malformed event can still be logged with what was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub player_id: String,
    pub game_mode: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub data_mask: FieldMask,
}

impl ChangeEvent {
    pub fn new(
        player_id: impl Into<String>,
        game_mode: impl Into<String>,
        data: serde_json::Value,
        data_mask: FieldMask,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            game_mode: game_mode.into(),
            data,
            data_mask,
        }
    }

    /// Build an event for a known player and mode.
    pub fn for_player(player_id: Uuid, mode: GameMode, data: serde_json::Value, data_mask: FieldMask) -> Self {
        Self::new(player_id.to_string(), mode.as_wire(), data, data_mask)
    }

    pub fn parse_player_id(&self) -> Result<Uuid, PlayerDataError> {
        parse_player_id(&self.player_id)
    }

    pub fn resolve_game_mode(&self) -> Option<GameMode> {
        GameMode::from_wire(&self.game_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_wire_event() {
        let event: ChangeEvent = serde_json::from_value(json!({
            "player_id": "8d36737e-1c0a-4a71-87de-9906f577845e",
            "game_mode": "BLOCK_SUMO",
            "data": {"block_slot": 4},
            "data_mask": {"paths": ["block_slot"]},
        }))
        .unwrap();

        assert_eq!(event.resolve_game_mode(), Some(GameMode::BlockSumo));
        assert_eq!(event.data_mask.paths(), ["block_slot"]);
        assert!(event.parse_player_id().is_ok());
    }

    #[test]
    fn missing_mask_and_data_default_to_empty() {
        let event: ChangeEvent = serde_json::from_value(json!({
            "player_id": "x",
            "game_mode": "UNKNOWN",
        }))
        .unwrap();

        assert!(event.data_mask.is_empty());
        assert!(event.data.is_null());
        assert!(event.resolve_game_mode().is_none());
        assert!(event.parse_player_id().is_err());
    }
}
