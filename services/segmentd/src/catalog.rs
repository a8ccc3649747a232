//! Segment catalog orchestration.
//!
//! # Purpose
//! Validates every public operation before it reaches the membership store
//! and sequences batched changes. HTTP handlers talk to [`Catalog`]; the
//! store trait stays an implementation detail behind it.
//!
//! # Batched updates
//! `update_memberships` applies adds before removes, one entry at a time.
//! Entries already applied stay applied when a later entry fails; the error
//! names the segment that failed so callers can retry precisely.
use crate::model::{Expiry, Membership, Segment};
use crate::store::{MembershipStore, StoreError, StoreResult};
use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn MembershipStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Shared handle to the underlying store, for wiring the sweeper.
    pub fn store(&self) -> Arc<dyn MembershipStore> {
        Arc::clone(&self.store)
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn is_durable(&self) -> bool {
        self.store.is_durable()
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        self.store.health_check().await
    }

    pub async fn list_segments(&self) -> StoreResult<Vec<Segment>> {
        self.store.list_segments().await
    }

    pub async fn create_segment(&self, name: &str, percent: i32) -> CatalogResult<Segment> {
        validate_segment_name(name)?;
        if !(0..=100).contains(&percent) {
            return Err(CatalogError::Validation(format!(
                "percent must be between 0 and 100, got {percent}"
            )));
        }
        Ok(self.store.create_segment(name, percent).await?)
    }

    pub async fn delete_segment(&self, name: &str) -> CatalogResult<()> {
        validate_segment_name(name)?;
        Ok(self.store.delete_segment(name).await?)
    }

    pub async fn memberships(&self, user_id: i64) -> StoreResult<Vec<Membership>> {
        self.store.memberships(user_id).await
    }

    /// Applies `add` (as permanent memberships) and then `remove`, entry by
    /// entry, and returns the user's refreshed membership list.
    pub async fn update_memberships(
        &self,
        user_id: i64,
        add: &[String],
        remove: &[String],
    ) -> CatalogResult<Vec<Membership>> {
        for name in add.iter().chain(remove.iter()) {
            validate_segment_name(name)?;
        }
        for name in add {
            self.store
                .upsert_membership(user_id, name, Expiry::Permanent)
                .await?;
        }
        for name in remove {
            self.store.remove_membership(user_id, name).await?;
        }
        Ok(self.store.memberships(user_id).await?)
    }

    /// Enrolls `user_id` in `segment_name` for `ttl_days` days from now,
    /// replacing any existing expiry for that pair, and returns the user's
    /// refreshed membership list.
    pub async fn subscribe_with_ttl(
        &self,
        user_id: i64,
        segment_name: &str,
        ttl_days: i64,
    ) -> CatalogResult<Vec<Membership>> {
        validate_segment_name(segment_name)?;
        if ttl_days < 0 {
            return Err(CatalogError::Validation(format!(
                "ttl_days must not be negative, got {ttl_days}"
            )));
        }
        let ttl = Duration::try_days(ttl_days)
            .ok_or_else(|| CatalogError::Validation(format!("ttl_days out of range: {ttl_days}")))?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| CatalogError::Validation(format!("ttl_days out of range: {ttl_days}")))?;
        self.store
            .upsert_membership(user_id, segment_name, Expiry::ExpiresAt(expires_at))
            .await?;
        Ok(self.store.memberships(user_id).await?)
    }
}

fn validate_segment_name(name: &str) -> CatalogResult<()> {
    if name.is_empty() {
        return Err(CatalogError::Validation(
            "segment name must not be empty".to_string(),
        ));
    }
    Ok(())
}
