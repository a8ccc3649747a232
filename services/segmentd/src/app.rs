//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router and defines the shared state injected into
//! handlers. Route composition lives here so `main` stays small and tests can
//! drive the full surface without a socket.
use crate::api;
use crate::catalog::Catalog;
use axum::Router;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/segments",
            axum::routing::get(api::segments::list_segments)
                .post(api::segments::create_segment),
        )
        .route(
            "/v1/segments/:name",
            axum::routing::delete(api::segments::delete_segment),
        )
        .route(
            "/v1/users/:user_id/memberships",
            axum::routing::get(api::memberships::get_memberships)
                .patch(api::memberships::update_memberships),
        )
        .route(
            "/v1/users/:user_id/memberships/:segment",
            axum::routing::put(api::memberships::subscribe_with_ttl),
        )
        .route(
            "/v1/openapi.json",
            axum::routing::get(api::openapi::openapi_json),
        )
        .layer(trace_layer)
        .with_state(state)
}
