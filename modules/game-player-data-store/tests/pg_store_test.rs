//! Integration tests for PgPlayerStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::time::Duration;

use game_player_data_common::{BlockSumoData, GameMode, PlayerRecord, TowerDefenceData};
use game_player_data_store::{PgPlayerStore, PlayerDataStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

/// Get a pool with the player tables migrated, or skip if no test DB is available.
// Tests share tables; each uses fresh player ids instead of truncating.
async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    PgPlayerStore::new(pool.clone()).migrate().await.ok()?;
    Some(pool)
}

async fn test_store() -> Option<PgPlayerStore> {
    test_pool().await.map(PgPlayerStore::new)
}

fn sumo(player_id: Uuid, block_slot: u32, shears_slot: u32) -> PlayerRecord {
    PlayerRecord::BlockSumo(BlockSumoData {
        player_id,
        block_slot,
        shears_slot,
    })
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let Some(store) = test_store().await else {
        return;
    };
    store.migrate().await.unwrap();
    store.migrate().await.unwrap();
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let Some(store) = test_store().await else {
        return;
    };

    let err = store.get(Uuid::new_v4(), GameMode::BlockSumo).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn upsert_round_trips_and_replaces() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = Uuid::new_v4();

    store.upsert_replace(&sumo(id, 2, 1)).await.unwrap();
    assert_eq!(store.get(id, GameMode::BlockSumo).await.unwrap(), sumo(id, 2, 1));

    store.upsert_replace(&sumo(id, 5, 1)).await.unwrap();
    store.upsert_replace(&sumo(id, 5, 1)).await.unwrap();
    assert_eq!(store.get(id, GameMode::BlockSumo).await.unwrap(), sumo(id, 5, 1));
}

#[tokio::test]
async fn fieldless_modes_store_empty_payloads() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = Uuid::new_v4();
    let record = PlayerRecord::TowerDefence(TowerDefenceData { player_id: id });

    store.upsert_replace(&record).await.unwrap();
    assert_eq!(store.get(id, GameMode::TowerDefence).await.unwrap(), record);
    assert!(store.get(id, GameMode::BlockSumo).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn batch_returns_only_found_players() {
    let Some(store) = test_store().await else {
        return;
    };
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    store.upsert_replace(&sumo(a, 1, 2)).await.unwrap();
    store.upsert_replace(&sumo(b, 3, 4)).await.unwrap();

    let found = store
        .get_batch(&[a, b, Uuid::new_v4()], GameMode::BlockSumo)
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[&b], sumo(b, 3, 4));
}

#[tokio::test]
async fn write_blocked_past_the_timeout_is_unavailable() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let id = Uuid::new_v4();
    let store = PgPlayerStore::new(pool.clone()).with_timeout(Duration::from_millis(200));
    store.upsert_replace(&sumo(id, 1, 1)).await.unwrap();

    // Hold the row lock from another transaction so the upsert has to wait.
    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT 1 FROM block_sumo WHERE player_id = $1 FOR UPDATE")
        .bind(id)
        .execute(&mut *holder)
        .await
        .unwrap();

    let err = store.upsert_replace(&sumo(id, 9, 9)).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)), "got {err:?}");
    assert!(!err.is_not_found());

    holder.rollback().await.unwrap();

    // A timed-out call leaves the store usable.
    let record = store.get(id, GameMode::BlockSumo).await.unwrap();
    assert_eq!(record.player_id(), id);
}
