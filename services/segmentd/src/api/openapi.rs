//! OpenAPI document for the v1 surface, served at `/v1/openapi.json`.
use crate::api::types::{
    ErrorResponse, HealthStatus, MembershipListResponse, MembershipUpdateRequest,
    SegmentCreateRequest, SegmentListResponse, TtlSubscribeRequest,
};
use crate::api::{memberships, segments, system};
use crate::model::{Expiry, Membership, Segment};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "segmentd",
        version = "v1",
        description = "Segment membership and expiry service"
    ),
    paths(
        system::system_health,
        segments::list_segments,
        segments::create_segment,
        segments::delete_segment,
        memberships::get_memberships,
        memberships::update_memberships,
        memberships::subscribe_with_ttl
    ),
    components(schemas(
        ErrorResponse,
        HealthStatus,
        Segment,
        SegmentCreateRequest,
        SegmentListResponse,
        Expiry,
        Membership,
        MembershipListResponse,
        MembershipUpdateRequest,
        TtlSubscribeRequest
    )),
    tags(
        (name = "system", description = "Health and discovery"),
        (name = "segments", description = "Segment catalog management"),
        (name = "memberships", description = "Per-user membership management")
    )
)]
pub struct ApiDoc;

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
