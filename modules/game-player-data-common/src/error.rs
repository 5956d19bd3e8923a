use thiserror::Error;

use crate::types::GameMode;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerDataError {
    #[error("Invalid player id: {0}")]
    InvalidPlayerId(String),

    #[error("Unsupported game mode: {0}")]
    UnsupportedGameMode(String),

    #[error("Failed to decode {mode} payload: {reason}")]
    PayloadDecode { mode: GameMode, reason: String },

    #[error("Failed to encode {mode} payload: {reason}")]
    PayloadEncode { mode: GameMode, reason: String },

    #[error("Record variant mismatch: expected {expected}, got {actual}")]
    VariantMismatch { expected: GameMode, actual: GameMode },
}
