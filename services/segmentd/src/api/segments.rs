//! Segment catalog endpoints.
//!
//! # Purpose
//! Implements segment listing, creation, and deletion with consistent error
//! mapping for validation failures, duplicate names, and missing records.
use crate::api::error::{
    ApiError, api_conflict, api_internal, api_not_found, api_validation_error,
};
use crate::api::types::{SegmentCreateRequest, SegmentListResponse};
use crate::app::AppState;
use crate::catalog::CatalogError;
use crate::model::Segment;
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/v1/segments",
    tag = "segments",
    responses(
        (status = 200, description = "List segments", body = SegmentListResponse)
    )
)]
pub(crate) async fn list_segments(
    State(state): State<AppState>,
) -> Result<Json<SegmentListResponse>, ApiError> {
    let items = state
        .catalog
        .list_segments()
        .await
        .map_err(|err| api_internal("failed to list segments", &err))?;
    Ok(Json(SegmentListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/segments",
    tag = "segments",
    request_body = SegmentCreateRequest,
    responses(
        (status = 201, description = "Segment created", body = Segment),
        (status = 400, description = "Invalid name or percent", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Segment already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_segment(
    State(state): State<AppState>,
    Json(body): Json<SegmentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match state.catalog.create_segment(&body.name, body.percent).await {
        Ok(segment) => Ok((StatusCode::CREATED, Json(segment))),
        Err(CatalogError::Validation(msg)) => Err(api_validation_error(&msg)),
        Err(CatalogError::Store(StoreError::Conflict(_))) => {
            Err(api_conflict("already_exists", "segment already exists"))
        }
        Err(CatalogError::Store(err)) => Err(api_internal("failed to create segment", &err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/segments/{name}",
    tag = "segments",
    params(("name" = String, Path, description = "Segment name")),
    responses(
        (status = 204, description = "Segment and its memberships removed"),
        (status = 404, description = "Unknown segment", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_segment(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    match state.catalog.delete_segment(&name).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(CatalogError::Validation(msg)) => Err(api_validation_error(&msg)),
        Err(CatalogError::Store(StoreError::NotFound(msg))) => {
            Err(api_not_found(&format!("{msg} not found")))
        }
        Err(CatalogError::Store(err)) => Err(api_internal("failed to delete segment", &err)),
    }
}
