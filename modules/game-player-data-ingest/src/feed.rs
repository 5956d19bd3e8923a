//! Postgres-backed update topic with per-consumer offsets.
//!
//! Producers append rows to `game_player_data_updates`. Each consumer keeps
//! its committed offset in `update_feed_offsets`. Delivery is at-least-once:
//! the offset only moves on `ack`, so a crash between persisting a merge and
//! acknowledging it redelivers the event, which the idempotent merge/upsert
//! path absorbs.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use game_player_data_common::{ChangeEvent, FieldMask};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::IngestError;
use crate::source::UpdateSource;

/// A gap older than this is treated as a rolled-back insert and skipped.
const GAP_GRACE_MS: f64 = 5_000.0;

/// Create the feed tables. Idempotent.
pub async fn migrate(pool: &PgPool) -> Result<(), IngestError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_player_data_updates (
            seq        BIGSERIAL    PRIMARY KEY,
            ts         TIMESTAMPTZ  NOT NULL DEFAULT now(),
            player_id  TEXT         NOT NULL,
            game_mode  TEXT         NOT NULL,
            data       JSONB        NOT NULL,
            data_mask  TEXT[]       NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS update_feed_offsets (
            consumer    TEXT         PRIMARY KEY,
            seq         BIGINT       NOT NULL,
            updated_at  TIMESTAMPTZ  NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Update feed tables ready");
    Ok(())
}

/// Append an event to the feed. Returns its sequence number.
pub async fn publish(pool: &PgPool, event: &ChangeEvent) -> Result<i64, IngestError> {
    let seq = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO game_player_data_updates (player_id, game_mode, data, data_mask)
        VALUES ($1, $2, $3, $4)
        RETURNING seq
        "#,
    )
    .bind(&event.player_id)
    .bind(&event.game_mode)
    .bind(&event.data)
    .bind(event.data_mask.paths())
    .fetch_one(pool)
    .await?;

    Ok(seq)
}

#[derive(Debug, sqlx::FromRow)]
struct FeedRow {
    seq: i64,
    player_id: String,
    game_mode: String,
    data: serde_json::Value,
    data_mask: Vec<String>,
    age_ms: f64,
}

impl FeedRow {
    fn into_event(self) -> ChangeEvent {
        ChangeEvent::new(self.player_id, self.game_mode, self.data, FieldMask::new(self.data_mask))
    }
}

/// Polling consumer over the update feed.
pub struct PgUpdateFeed {
    pool: PgPool,
    consumer: String,
    poll_interval: Duration,
    batch_size: usize,
    timeout: Duration,
    buffer: VecDeque<(i64, ChangeEvent)>,
    /// Highest seq handed out by `next`.
    delivered: Option<i64>,
    /// Highest seq acknowledged, `None` until loaded from the offsets table.
    committed: Option<i64>,
}

impl PgUpdateFeed {
    pub fn new(pool: PgPool, consumer: impl Into<String>) -> Self {
        Self {
            pool,
            consumer: consumer.into(),
            poll_interval: Duration::from_millis(250),
            batch_size: 100,
            timeout: Duration::from_secs(5),
            buffer: VecDeque::new(),
            delivered: None,
            committed: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// The last acknowledged sequence number (0 before anything was acked).
    pub async fn committed_offset(&mut self) -> Result<i64, IngestError> {
        if let Some(seq) = self.committed {
            return Ok(seq);
        }

        let stored = self
            .bounded(
                sqlx::query_scalar::<_, i64>("SELECT seq FROM update_feed_offsets WHERE consumer = $1")
                    .bind(&self.consumer)
                    .fetch_optional(&self.pool),
            )
            .await?;

        let seq = stored.unwrap_or(0);
        self.committed = Some(seq);
        Ok(seq)
    }

    /// Read events after `after_seq`, stopping at a gap left by an in-flight
    /// insert. Gaps older than the grace period are rolled-back inserts and
    /// are skipped.
    async fn read_after(&self, after_seq: i64) -> Result<Vec<FeedRow>, IngestError> {
        let rows = self
            .bounded(
                sqlx::query_as::<_, FeedRow>(
                    r#"
                    SELECT seq, player_id, game_mode, data, data_mask,
                           (EXTRACT(EPOCH FROM (now() - ts)) * 1000)::float8 AS age_ms
                    FROM game_player_data_updates
                    WHERE seq > $1
                    ORDER BY seq ASC
                    LIMIT $2
                    "#,
                )
                .bind(after_seq)
                .bind(self.batch_size as i64)
                .fetch_all(&self.pool),
            )
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        let mut expected = after_seq + 1;

        for row in rows {
            if row.seq != expected {
                if row.age_ms < GAP_GRACE_MS {
                    break;
                }
                debug!(from = expected, to = row.seq - 1, "Skipping abandoned sequence gap");
            }
            expected = row.seq + 1;
            result.push(row);
        }

        Ok(result)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, IngestError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(IngestError::from),
            Err(_) => Err(IngestError::Source(format!(
                "update feed call timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl UpdateSource for PgUpdateFeed {
    async fn next(&mut self) -> Result<Option<ChangeEvent>, IngestError> {
        loop {
            if let Some((seq, event)) = self.buffer.pop_front() {
                self.delivered = Some(seq);
                return Ok(Some(event));
            }

            let committed = self.committed_offset().await?;
            let cursor = self.delivered.map_or(committed, |d| d.max(committed));

            let rows = self.read_after(cursor).await?;
            if rows.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            self.buffer
                .extend(rows.into_iter().map(|row| (row.seq, row.into_event())));
        }
    }

    async fn ack(&mut self) -> Result<(), IngestError> {
        let Some(seq) = self.delivered else {
            return Ok(());
        };
        if self.committed.is_some_and(|c| c >= seq) {
            return Ok(());
        }

        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO update_feed_offsets (consumer, seq, updated_at)
                VALUES ($1, $2, now())
                ON CONFLICT (consumer) DO UPDATE
                SET seq = GREATEST(update_feed_offsets.seq, EXCLUDED.seq),
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&self.consumer)
            .bind(seq)
            .execute(&self.pool),
        )
        .await?;

        self.committed = Some(seq);
        Ok(())
    }
}
