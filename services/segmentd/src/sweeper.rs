//! Background removal of expired memberships.
//!
//! # Purpose
//! Periodically scans for timed memberships whose expiry has passed and
//! deletes them row by row. A failed scan or delete is logged and retried on
//! the next tick; only cancellation stops the loop.
use crate::store::{MembershipStore, StoreResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub sweep_interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(20),
        }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Requests the loop to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Requests the loop to stop and waits for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Spawns the sweep loop. Errors are logged and the loop keeps running; only
/// cancellation through the returned handle stops it.
pub fn start(store: Arc<dyn MembershipStore>, config: SweeperConfig) -> SweeperHandle {
    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();
    let interval = config.sweep_interval;
    let task = tokio::spawn(async move {
        info!("membership expiry sweeper started (interval={interval:?})");
        loop {
            tokio::select! {
                _ = loop_cancel.cancelled() => {
                    info!("membership expiry sweeper stopped");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    debug!("expiry sweep scan");
                    match sweep_once(store.as_ref(), Utc::now()).await {
                        Ok(0) => {}
                        Ok(removed) => info!("expiry sweep removed {removed} memberships"),
                        Err(err) => error!("expiry sweep failed: {err}"),
                    }
                }
            }
        }
    });
    SweeperHandle { cancel, task }
}

/// One sweep pass: collect the keys expired as of `now`, then delete each
/// row. A row that fails to delete is logged and left for the next pass; the
/// returned count covers rows actually removed.
pub async fn sweep_once(store: &dyn MembershipStore, now: DateTime<Utc>) -> StoreResult<u64> {
    let expired = store.expired_memberships(now).await?;
    let mut removed = 0u64;
    for key in &expired {
        match store.delete_membership_row(key).await {
            Ok(()) => removed += 1,
            Err(err) => warn!(
                user_id = key.user_id,
                segment_id = key.segment_id,
                "failed to remove expired membership: {err}"
            ),
        }
    }
    if removed > 0 {
        metrics::counter!("segmentd_memberships_expired_total").increment(removed);
    }
    Ok(removed)
}
