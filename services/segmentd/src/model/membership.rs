use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity of one membership row: a user enrolled in a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct MembershipKey {
    pub user_id: i64,
    pub segment_id: i64,
}

/// When a membership stops being valid.
///
/// Permanent memberships never expire and are stored with a NULL expiry
/// column; timed memberships become eligible for the sweeper once their
/// instant has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Expiry {
    Permanent,
    ExpiresAt(DateTime<Utc>),
}

impl Expiry {
    pub fn from_expires_at(expires_at: Option<DateTime<Utc>>) -> Self {
        match expires_at {
            Some(at) => Expiry::ExpiresAt(at),
            None => Expiry::Permanent,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::Permanent => None,
            Expiry::ExpiresAt(at) => Some(*at),
        }
    }

    /// A membership expires strictly after its instant passes; a row whose
    /// expiry equals `now` is still live.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Permanent => false,
            Expiry::ExpiresAt(at) => *at < now,
        }
    }
}

/// A user's enrollment in a segment, as returned by membership reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Membership {
    pub user_id: i64,
    pub segment: String,
    pub expiry: Expiry,
}
