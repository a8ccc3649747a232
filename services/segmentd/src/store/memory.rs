//! In-memory membership store.
//!
//! # Purpose
//! Non-durable [`MembershipStore`] used for local development and tests. It
//! mirrors the Postgres backend's semantics, including name conflicts,
//! cascading segment deletes, and sampling over the distinct user population.
//!
//! # Notes
//! Locks are held one map at a time, so cross-map operations are not
//! transactional. Sorting happens on read; the maps themselves are unordered.
use crate::model::{Expiry, Membership, MembershipKey, Segment};
use crate::sample;
use crate::store::{MembershipStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

pub struct InMemoryStore {
    segments: RwLock<HashMap<String, Segment>>,
    memberships: RwLock<HashMap<MembershipKey, Expiry>>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            segments: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    async fn segment_id(&self, name: &str) -> StoreResult<i64> {
        let segments = self.segments.read().await;
        segments
            .get(name)
            .map(|segment| segment.id)
            .ok_or_else(|| StoreError::NotFound(format!("segment {name}")))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn create_segment(&self, name: &str, percent: i32) -> StoreResult<Segment> {
        let segment = {
            let mut segments = self.segments.write().await;
            if segments.contains_key(name) {
                return Err(StoreError::Conflict("segment exists".into()));
            }
            let segment = Segment {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                name: name.to_string(),
                percent,
            };
            segments.insert(name.to_string(), segment.clone());
            metrics::gauge!("segmentd_segments_total").set(segments.len() as f64);
            segment
        };

        if percent > 0 {
            let mut memberships = self.memberships.write().await;
            let users: Vec<i64> = memberships
                .keys()
                .map(|key| key.user_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for user_id in sample::select_sample(&users, percent) {
                memberships.insert(
                    MembershipKey {
                        user_id,
                        segment_id: segment.id,
                    },
                    Expiry::Permanent,
                );
            }
            metrics::gauge!("segmentd_memberships_total").set(memberships.len() as f64);
        }

        metrics::counter!("segmentd_segment_changes_total", "op" => "created").increment(1);
        Ok(segment)
    }

    async fn delete_segment(&self, name: &str) -> StoreResult<()> {
        let segment = {
            let mut segments = self.segments.write().await;
            let segment = match segments.remove(name) {
                Some(segment) => segment,
                None => return Err(StoreError::NotFound(format!("segment {name}"))),
            };
            metrics::gauge!("segmentd_segments_total").set(segments.len() as f64);
            segment
        };

        let mut memberships = self.memberships.write().await;
        memberships.retain(|key, _| key.segment_id != segment.id);
        metrics::gauge!("segmentd_memberships_total").set(memberships.len() as f64);
        metrics::counter!("segmentd_segment_changes_total", "op" => "deleted").increment(1);
        Ok(())
    }

    async fn list_segments(&self) -> StoreResult<Vec<Segment>> {
        let segments = self.segments.read().await;
        let mut items: Vec<Segment> = segments.values().cloned().collect();
        items.sort_by_key(|segment| segment.id);
        Ok(items)
    }

    async fn memberships(&self, user_id: i64) -> StoreResult<Vec<Membership>> {
        let names_by_id: HashMap<i64, String> = {
            let segments = self.segments.read().await;
            segments
                .values()
                .map(|segment| (segment.id, segment.name.clone()))
                .collect()
        };

        let memberships = self.memberships.read().await;
        let mut items: Vec<Membership> = memberships
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .filter_map(|(key, expiry)| {
                names_by_id.get(&key.segment_id).map(|name| Membership {
                    user_id,
                    segment: name.clone(),
                    expiry: expiry.clone(),
                })
            })
            .collect();
        items.sort_by(|a, b| a.segment.cmp(&b.segment));
        Ok(items)
    }

    async fn upsert_membership(
        &self,
        user_id: i64,
        segment_name: &str,
        expiry: Expiry,
    ) -> StoreResult<()> {
        let segment_id = self.segment_id(segment_name).await?;
        let mut memberships = self.memberships.write().await;
        memberships.insert(
            MembershipKey {
                user_id,
                segment_id,
            },
            expiry,
        );
        metrics::gauge!("segmentd_memberships_total").set(memberships.len() as f64);
        metrics::counter!("segmentd_membership_changes_total", "op" => "upserted").increment(1);
        Ok(())
    }

    async fn remove_membership(&self, user_id: i64, segment_name: &str) -> StoreResult<()> {
        let segment_id = self.segment_id(segment_name).await?;
        let mut memberships = self.memberships.write().await;
        let removed = memberships.remove(&MembershipKey {
            user_id,
            segment_id,
        });
        if removed.is_some() {
            metrics::gauge!("segmentd_memberships_total").set(memberships.len() as f64);
            metrics::counter!("segmentd_membership_changes_total", "op" => "removed").increment(1);
        }
        Ok(())
    }

    async fn expired_memberships(&self, now: DateTime<Utc>) -> StoreResult<Vec<MembershipKey>> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .iter()
            .filter(|(_, expiry)| expiry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_membership_row(&self, key: &MembershipKey) -> StoreResult<()> {
        let mut memberships = self.memberships.write().await;
        if memberships.remove(key).is_some() {
            metrics::gauge!("segmentd_memberships_total").set(memberships.len() as f64);
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
