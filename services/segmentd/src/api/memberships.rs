//! Membership endpoints for a single user.
//!
//! # Purpose
//! Implements membership reads, batched add/remove updates, and TTL
//! subscriptions. Every write answers with the user's refreshed membership
//! list so callers never need a follow-up read.
use crate::api::error::{ApiError, api_internal, api_not_found, api_validation_error};
use crate::api::types::{MembershipListResponse, MembershipUpdateRequest, TtlSubscribeRequest};
use crate::app::AppState;
use crate::catalog::CatalogError;
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/memberships",
    tag = "memberships",
    params(("user_id" = i64, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Memberships held by the user, ordered by segment name", body = MembershipListResponse)
    )
)]
pub(crate) async fn get_memberships(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MembershipListResponse>, ApiError> {
    let items = state
        .catalog
        .memberships(user_id)
        .await
        .map_err(|err| api_internal("failed to read memberships", &err))?;
    Ok(Json(MembershipListResponse { items }))
}

#[utoipa::path(
    patch,
    path = "/v1/users/{user_id}/memberships",
    tag = "memberships",
    params(("user_id" = i64, Path, description = "User identifier")),
    request_body = MembershipUpdateRequest,
    responses(
        (status = 200, description = "Updated memberships", body = MembershipListResponse),
        (status = 400, description = "Invalid segment name", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Unknown segment", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_memberships(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<MembershipUpdateRequest>,
) -> Result<Json<MembershipListResponse>, ApiError> {
    match state
        .catalog
        .update_memberships(user_id, &body.add, &body.remove)
        .await
    {
        Ok(items) => Ok(Json(MembershipListResponse { items })),
        Err(CatalogError::Validation(msg)) => Err(api_validation_error(&msg)),
        Err(CatalogError::Store(StoreError::NotFound(msg))) => {
            Err(api_not_found(&format!("{msg} not found")))
        }
        Err(CatalogError::Store(err)) => Err(api_internal("failed to update memberships", &err)),
    }
}

#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/memberships/{segment}",
    tag = "memberships",
    params(
        ("user_id" = i64, Path, description = "User identifier"),
        ("segment" = String, Path, description = "Segment name")
    ),
    request_body = TtlSubscribeRequest,
    responses(
        (status = 200, description = "Membership upserted with a fresh expiry", body = MembershipListResponse),
        (status = 400, description = "Invalid ttl_days", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Unknown segment", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn subscribe_with_ttl(
    Path((user_id, segment)): Path<(i64, String)>,
    State(state): State<AppState>,
    Json(body): Json<TtlSubscribeRequest>,
) -> Result<Json<MembershipListResponse>, ApiError> {
    match state
        .catalog
        .subscribe_with_ttl(user_id, &segment, body.ttl_days)
        .await
    {
        Ok(items) => Ok(Json(MembershipListResponse { items })),
        Err(CatalogError::Validation(msg)) => Err(api_validation_error(&msg)),
        Err(CatalogError::Store(StoreError::NotFound(msg))) => {
            Err(api_not_found(&format!("{msg} not found")))
        }
        Err(CatalogError::Store(err)) => Err(api_internal("failed to subscribe", &err)),
    }
}
