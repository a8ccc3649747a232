use crate::model::{Expiry, Membership, MembershipKey, Segment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence backend for the segment catalog and membership rows.
///
/// `(user_id, segment_id)` identifies a membership: upserting an existing
/// pair replaces its expiry instead of creating a second row.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Also enrolls a random `percent` sample of all users currently holding
    /// at least one membership.
    async fn create_segment(&self, name: &str, percent: i32) -> StoreResult<Segment>;
    /// Removes the segment and every membership row referencing it.
    async fn delete_segment(&self, name: &str) -> StoreResult<()>;
    async fn list_segments(&self) -> StoreResult<Vec<Segment>>;

    async fn memberships(&self, user_id: i64) -> StoreResult<Vec<Membership>>;
    async fn upsert_membership(
        &self,
        user_id: i64,
        segment_name: &str,
        expiry: Expiry,
    ) -> StoreResult<()>;
    /// Removing an absent row is a no-op; only an unknown segment is an error.
    async fn remove_membership(&self, user_id: i64, segment_name: &str) -> StoreResult<()>;

    /// Keys of every timed membership whose expiry lies strictly before `now`.
    async fn expired_memberships(&self, now: DateTime<Utc>) -> StoreResult<Vec<MembershipKey>>;
    async fn delete_membership_row(&self, key: &MembershipKey) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
