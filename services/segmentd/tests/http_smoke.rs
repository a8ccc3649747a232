mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use common::read_json;
use http_helpers::json_request;
use segmentd::app::{AppState, build_router};
use segmentd::catalog::Catalog;
use segmentd::model::{Expiry, Membership, MembershipKey, Segment};
use segmentd::store::memory::InMemoryStore;
use segmentd::store::{MembershipStore, StoreError, StoreResult};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> axum::Router {
    build_router(AppState {
        catalog: Catalog::new(Arc::new(InMemoryStore::new())),
    })
}

async fn get(app: &axum::Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("response")
}

async fn delete(app: &axum::Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("response")
}

#[tokio::test]
async fn health_reports_backend() {
    let app = app();
    let response = get(&app, "/v1/system/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["durable"], false);
}

#[tokio::test]
async fn segment_crud_flow() {
    let app = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/segments",
            &json!({"name": "beta", "percent": 25}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Segment = read_json(response).await;
    assert_eq!(created.name, "beta");
    assert_eq!(created.percent, 25);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/segments",
            &json!({"name": "beta", "percent": 10}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = read_json(response).await;
    assert_eq!(body["code"], "already_exists");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/segments",
            &json!({"name": "gamma", "percent": 101}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await;
    assert_eq!(body["code"], "validation_error");

    let response = get(&app, "/v1/segments").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["items"].as_array().expect("items").len(), 1);

    let response = delete(&app, "/v1/segments/beta").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(&app, "/v1/segments/beta").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = read_json(response).await;
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn membership_update_flow() {
    let app = app();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/segments",
            &json!({"name": "beta", "percent": 0}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/v1/users/42/memberships",
            &json!({"add": ["beta"]}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["items"][0]["segment"], "beta");
    assert_eq!(body["items"][0]["expiry"], "permanent");

    let response = get(&app, "/v1/users/42/memberships").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["items"].as_array().expect("items").len(), 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/v1/users/42/memberships",
            &json!({"remove": ["beta"]}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert!(body["items"].as_array().expect("items").is_empty());

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/v1/users/42/memberships",
            &json!({"add": ["ghost"]}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = read_json(response).await;
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn ttl_subscription_flow() {
    let app = app();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/segments",
            &json!({"name": "trial", "percent": 0}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/users/7/memberships/trial",
            &json!({"ttl_days": 14}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["items"][0]["segment"], "trial");
    assert!(body["items"][0]["expiry"]["expiresAt"].is_string());

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/users/7/memberships/trial",
            &json!({"ttl_days": -1}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await;
    assert_eq!(body["code"], "validation_error");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/users/7/memberships/ghost",
            &json!({"ttl_days": 3}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_document_served() {
    let app = app();
    let response = get(&app, "/v1/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["info"]["title"], "segmentd");
    assert!(body["paths"]["/v1/segments"].is_object());
    assert!(body["paths"]["/v1/users/{user_id}/memberships/{segment}"].is_object());
}

#[tokio::test]
async fn failing_store_maps_internal_errors() {
    struct FailingStore;

    #[async_trait::async_trait]
    impl MembershipStore for FailingStore {
        async fn create_segment(&self, _name: &str, _percent: i32) -> StoreResult<Segment> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        async fn delete_segment(&self, _name: &str) -> StoreResult<()> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        async fn list_segments(&self) -> StoreResult<Vec<Segment>> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        async fn memberships(&self, _user_id: i64) -> StoreResult<Vec<Membership>> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        async fn upsert_membership(
            &self,
            _user_id: i64,
            _segment_name: &str,
            _expiry: Expiry,
        ) -> StoreResult<()> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        async fn remove_membership(&self, _user_id: i64, _segment_name: &str) -> StoreResult<()> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        async fn expired_memberships(
            &self,
            _now: DateTime<Utc>,
        ) -> StoreResult<Vec<MembershipKey>> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        async fn delete_membership_row(&self, _key: &MembershipKey) -> StoreResult<()> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        async fn health_check(&self) -> StoreResult<()> {
            Err(StoreError::Unexpected(anyhow::anyhow!("store offline")))
        }
        fn is_durable(&self) -> bool {
            false
        }
        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    let app = build_router(AppState {
        catalog: Catalog::new(Arc::new(FailingStore)),
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/segments")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = read_json(response).await;
    assert_eq!(body["code"], "internal");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/system/health")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
