//! Postgres-backed membership store.
//!
//! # Purpose
//! Durable [`MembershipStore`] implementation on sqlx/Postgres. Embedded
//! migrations run at connect time so a fresh database is usable immediately.
//!
//! # Implementation notes
//! Multi-row changes (segment creation with its random sample, segment
//! deletion with its membership cascade) run inside a transaction. Single-row
//! membership writes are single statements and need none. Unique violations
//! on the segment name surface as [`StoreError::Conflict`] so the API can
//! answer 409 instead of 500.
use crate::config::PostgresConfig;
use crate::model::{Expiry, Membership, MembershipKey, Segment};
use crate::sample;
use crate::store::{MembershipStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;

#[derive(FromRow)]
struct DbSegment {
    id: i64,
    name: String,
    percent: i32,
}

#[derive(FromRow)]
struct DbMembership {
    user_id: i64,
    name: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct DbMembershipKey {
    user_id: i64,
    segment_id: i64,
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects, applies pool limits, and runs embedded migrations before the
    /// store is handed to anything that could issue queries.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        #[cfg(any(test, feature = "pg-tests"))]
        let _ = Self::connect_without_migrations;
        Self::connect_internal(pg, true).await
    }

    /// Test hook: connect against an already-migrated database without racing
    /// concurrent migration runs.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        // The URL may carry credentials, so it is never logged.
        let options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(options)
            .await?;

        if run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        Ok(Self { pool })
    }

    async fn segment_id(&self, name: &str) -> StoreResult<i64> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM segments WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        match id {
            Some(id) => Ok(id),
            None => Err(StoreError::NotFound(format!("segment {name}"))),
        }
    }

    async fn refresh_counts(&self) -> StoreResult<()> {
        let segments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM segments")
            .fetch_one(&self.pool)
            .await?;
        let memberships: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memberships")
            .fetch_one(&self.pool)
            .await?;
        metrics::gauge!("segmentd_segments_total").set(segments as f64);
        metrics::gauge!("segmentd_memberships_total").set(memberships as f64);
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for PostgresStore {
    async fn create_segment(&self, name: &str, percent: i32) -> StoreResult<Segment> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO segments (name, percent) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(percent)
        .fetch_one(&mut *tx)
        .await;
        let id = match inserted {
            Ok(id) => id,
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict("segment exists".into()));
            }
            Err(err) => return Err(err.into()),
        };

        if percent > 0 {
            // The population is every user currently holding at least one
            // membership. Sample and enrollment commit together with the
            // segment row or not at all.
            let users = sqlx::query_scalar::<_, i64>(
                "SELECT DISTINCT user_id FROM memberships ORDER BY user_id",
            )
            .fetch_all(&mut *tx)
            .await?;
            for user_id in sample::select_sample(&users, percent) {
                sqlx::query(
                    "INSERT INTO memberships (user_id, segment_id, expires_at) \
                     VALUES ($1, $2, NULL)",
                )
                .bind(user_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        metrics::counter!("segmentd_segment_changes_total", "op" => "created").increment(1);
        self.refresh_counts().await?;
        Ok(Segment {
            id,
            name: name.to_string(),
            percent,
        })
    }

    async fn delete_segment(&self, name: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM segments WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        let id = match id {
            Some(id) => id,
            None => return Err(StoreError::NotFound(format!("segment {name}"))),
        };

        // Membership rows go first so the FK on segment_id never dangles.
        sqlx::query("DELETE FROM memberships WHERE segment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM segments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        metrics::counter!("segmentd_segment_changes_total", "op" => "deleted").increment(1);
        self.refresh_counts().await?;
        Ok(())
    }

    async fn list_segments(&self) -> StoreResult<Vec<Segment>> {
        let rows = sqlx::query_as::<_, DbSegment>(
            "SELECT id, name, percent FROM segments ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Segment {
                id: row.id,
                name: row.name,
                percent: row.percent,
            })
            .collect())
    }

    async fn memberships(&self, user_id: i64) -> StoreResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, DbMembership>(
            "SELECT m.user_id, s.name, m.expires_at \
             FROM memberships m \
             JOIN segments s ON s.id = m.segment_id \
             WHERE m.user_id = $1 \
             ORDER BY s.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Membership {
                user_id: row.user_id,
                segment: row.name,
                expiry: Expiry::from_expires_at(row.expires_at),
            })
            .collect())
    }

    async fn upsert_membership(
        &self,
        user_id: i64,
        segment_name: &str,
        expiry: Expiry,
    ) -> StoreResult<()> {
        // Single statement resolves the segment and writes the row, so a
        // concurrent segment delete cannot leave a half-applied change. Last
        // write wins on the (user_id, segment_id) conflict target.
        let result = sqlx::query(
            "INSERT INTO memberships (user_id, segment_id, expires_at) \
             SELECT $1, s.id, $3 FROM segments s WHERE s.name = $2 \
             ON CONFLICT (user_id, segment_id) DO UPDATE SET expires_at = EXCLUDED.expires_at",
        )
        .bind(user_id)
        .bind(segment_name)
        .bind(expiry.expires_at())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("segment {segment_name}")));
        }
        metrics::counter!("segmentd_membership_changes_total", "op" => "upserted").increment(1);
        Ok(())
    }

    async fn remove_membership(&self, user_id: i64, segment_name: &str) -> StoreResult<()> {
        let segment_id = self.segment_id(segment_name).await?;
        let removed = sqlx::query("DELETE FROM memberships WHERE user_id = $1 AND segment_id = $2")
            .bind(user_id)
            .bind(segment_id)
            .execute(&self.pool)
            .await?;
        if removed.rows_affected() > 0 {
            metrics::counter!("segmentd_membership_changes_total", "op" => "removed").increment(1);
        }
        Ok(())
    }

    async fn expired_memberships(&self, now: DateTime<Utc>) -> StoreResult<Vec<MembershipKey>> {
        let rows = sqlx::query_as::<_, DbMembershipKey>(
            "SELECT user_id, segment_id FROM memberships \
             WHERE expires_at IS NOT NULL AND expires_at < $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| MembershipKey {
                user_id: row.user_id,
                segment_id: row.segment_id,
            })
            .collect())
    }

    async fn delete_membership_row(&self, key: &MembershipKey) -> StoreResult<()> {
        sqlx::query("DELETE FROM memberships WHERE user_id = $1 AND segment_id = $2")
            .bind(key.user_id)
            .bind(key.segment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}
