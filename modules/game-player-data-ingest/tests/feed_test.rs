//! Integration tests for PgUpdateFeed.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::time::Duration;

use game_player_data_common::{ChangeEvent, FieldMask, GameMode};
use game_player_data_ingest::{feed, publish, PgUpdateFeed, UpdateSource};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    feed::migrate(&pool).await.ok()?;
    Some(pool)
}

fn open_feed(pool: &PgPool, consumer: &str) -> PgUpdateFeed {
    PgUpdateFeed::new(pool.clone(), consumer).with_poll_interval(Duration::from_millis(20))
}

/// Pull from the feed until an event for `player` shows up. The table is
/// shared with other tests, so unrelated events are acked and skipped.
async fn next_for(feed: &mut PgUpdateFeed, player: Uuid) -> ChangeEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = feed.next().await.unwrap().expect("feed never closes");
            if event.player_id == player.to_string() {
                return event;
            }
            feed.ack().await.unwrap();
        }
    })
    .await
    .expect("event should arrive")
}

#[tokio::test]
async fn published_event_round_trips() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let player = Uuid::new_v4();
    let event = ChangeEvent::for_player(
        player,
        GameMode::BlockSumo,
        json!({"block_slot": 3}),
        FieldMask::new(["block_slot", "unknown"]),
    );

    let seq = publish(&pool, &event).await.unwrap();
    assert!(seq > 0);

    let mut feed = open_feed(&pool, &format!("test-{}", Uuid::new_v4()));
    assert_eq!(next_for(&mut feed, player).await, event);
}

#[tokio::test]
async fn acked_offset_survives_reopen() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let consumer = format!("test-{}", Uuid::new_v4());
    let player = Uuid::new_v4();
    let first = ChangeEvent::for_player(player, GameMode::BlockSumo, json!({"block_slot": 1}), FieldMask::new(["block_slot"]));
    let second = ChangeEvent::for_player(player, GameMode::BlockSumo, json!({"block_slot": 2}), FieldMask::new(["block_slot"]));
    publish(&pool, &first).await.unwrap();
    publish(&pool, &second).await.unwrap();

    let mut feed = open_feed(&pool, &consumer);
    assert_eq!(next_for(&mut feed, player).await, first);
    feed.ack().await.unwrap();
    let committed = feed.committed_offset().await.unwrap();
    assert!(committed > 0);

    // Reopened consumer resumes after the acked event.
    let mut reopened = open_feed(&pool, &consumer);
    assert_eq!(reopened.committed_offset().await.unwrap(), committed);
    assert_eq!(next_for(&mut reopened, player).await, second);
}

#[tokio::test]
async fn unacked_event_is_redelivered() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let consumer = format!("test-{}", Uuid::new_v4());
    let player = Uuid::new_v4();
    let event = ChangeEvent::for_player(player, GameMode::Minesweeper, json!({}), FieldMask::empty());
    publish(&pool, &event).await.unwrap();

    let mut feed = open_feed(&pool, &consumer);
    assert_eq!(next_for(&mut feed, player).await, event);
    drop(feed);

    let mut reopened = open_feed(&pool, &consumer);
    assert_eq!(next_for(&mut reopened, player).await, event);
}

// ---------------------------------------------------------------------------
// Sequence gaps
// ---------------------------------------------------------------------------

/// Start `consumer` at the current head of the feed so history is skipped.
async fn start_at_head(pool: &PgPool, consumer: &str) {
    sqlx::query(
        r#"
        INSERT INTO update_feed_offsets (consumer, seq)
        SELECT $1, COALESCE(MAX(seq), 0) FROM game_player_data_updates
        "#,
    )
    .bind(consumer)
    .execute(pool)
    .await
    .unwrap();
}

/// Insert `event` inside `tx`, claiming a sequence number without committing.
async fn insert_in(tx: &mut sqlx::PgConnection, event: &ChangeEvent) {
    sqlx::query(
        "INSERT INTO game_player_data_updates (player_id, game_mode, data, data_mask) VALUES ($1, $2, $3, $4)",
    )
    .bind(&event.player_id)
    .bind(&event.game_mode)
    .bind(&event.data)
    .bind(event.data_mask.paths())
    .execute(tx)
    .await
    .unwrap();
}

/// Like `next_for`, but gives up after `within` instead of panicking.
async fn poll_for(feed: &mut PgUpdateFeed, player: Uuid, within: Duration) -> Option<ChangeEvent> {
    tokio::time::timeout(within, next_for(feed, player)).await.ok()
}

#[tokio::test]
async fn in_flight_insert_holds_back_later_events() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let consumer = format!("test-{}", Uuid::new_v4());
    start_at_head(&pool, &consumer).await;

    let player = Uuid::new_v4();
    let held = ChangeEvent::for_player(player, GameMode::BlockSumo, json!({"block_slot": 1}), FieldMask::new(["block_slot"]));
    let later = ChangeEvent::for_player(player, GameMode::BlockSumo, json!({"block_slot": 2}), FieldMask::new(["block_slot"]));

    let mut tx = pool.begin().await.unwrap();
    insert_in(&mut tx, &held).await;
    publish(&pool, &later).await.unwrap();

    let mut feed = open_feed(&pool, &consumer);
    assert_eq!(poll_for(&mut feed, player, Duration::from_millis(500)).await, None);

    tx.commit().await.unwrap();

    assert_eq!(next_for(&mut feed, player).await, held);
    feed.ack().await.unwrap();
    assert_eq!(next_for(&mut feed, player).await, later);
}

#[tokio::test]
async fn abandoned_gap_is_skipped_after_grace_period() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let consumer = format!("test-{}", Uuid::new_v4());
    start_at_head(&pool, &consumer).await;

    let player = Uuid::new_v4();
    let abandoned = ChangeEvent::for_player(player, GameMode::BlockSumo, json!({"block_slot": 7}), FieldMask::new(["block_slot"]));
    let later = ChangeEvent::for_player(player, GameMode::BlockSumo, json!({"block_slot": 8}), FieldMask::new(["block_slot"]));

    let mut tx = pool.begin().await.unwrap();
    insert_in(&mut tx, &abandoned).await;

    // Backdated past the grace period instead of waiting it out.
    sqlx::query(
        r#"
        INSERT INTO game_player_data_updates (ts, player_id, game_mode, data, data_mask)
        VALUES (now() - interval '10 seconds', $1, $2, $3, $4)
        "#,
    )
    .bind(&later.player_id)
    .bind(&later.game_mode)
    .bind(&later.data)
    .bind(later.data_mask.paths())
    .execute(&pool)
    .await
    .unwrap();

    tx.rollback().await.unwrap();

    let mut feed = open_feed(&pool, &consumer);
    assert_eq!(next_for(&mut feed, player).await, later);
}
