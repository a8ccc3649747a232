//! Request and response bodies for the v1 API.
use crate::model::{Membership, Segment};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error envelope returned by every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
    pub durable: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SegmentCreateRequest {
    pub name: String,
    pub percent: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SegmentListResponse {
    pub items: Vec<Segment>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MembershipListResponse {
    pub items: Vec<Membership>,
}

/// Batched membership change; adds apply before removes.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MembershipUpdateRequest {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TtlSubscribeRequest {
    pub ttl_days: i64,
}
