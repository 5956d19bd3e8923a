//! Persistence for per-player, per-game-mode records.
//!
//! One logical table per game mode, keyed by player id. Supports point
//! lookup, batch lookup, and whole-record upsert. Writes replace the record,
//! so re-applying the same record is a no-op in effect.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryPlayerStore;
pub use postgres::{PgPlayerStore, DEFAULT_STORE_TIMEOUT};
pub use traits::PlayerDataStore;
