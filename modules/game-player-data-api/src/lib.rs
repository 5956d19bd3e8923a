//! Query surface for per-player game-mode state: the dispatch service, its
//! error mapping, and the REST router over both.

pub mod error;
pub mod query;
pub mod rest;

use std::sync::Arc;

use game_player_data_store::PlayerDataStore;

pub use error::{QueryError, QueryResult};
pub use query::{QueryService, MAX_BATCH_SIZE};
pub use rest::{build_router, BatchResponse};

/// Shared handler state.
pub struct AppState {
    pub query: QueryService<Arc<dyn PlayerDataStore>>,
}

impl AppState {
    pub fn new(store: Arc<dyn PlayerDataStore>) -> Self {
        Self {
            query: QueryService::new(store),
        }
    }
}
