use game_player_data_common::PlayerDataError;
use game_player_data_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid player id: {0}")]
    InvalidPlayerId(String),

    #[error(transparent)]
    Decode(PlayerDataError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Update source error: {0}")]
    Source(String),
}

impl From<PlayerDataError> for IngestError {
    fn from(e: PlayerDataError) -> Self {
        match e {
            PlayerDataError::InvalidPlayerId(raw) => IngestError::InvalidPlayerId(raw),
            other => IngestError::Decode(other),
        }
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(e: sqlx::Error) -> Self {
        IngestError::Source(e.to_string())
    }
}
