//! End-to-end flow tests over the licensing router, backed by an
//! in-memory SQLite store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tower::util::ServiceExt;

use licensing::application::admin_auth::AdminAuthenticator;
use licensing::middleware::LimiterPools;
use licensing::router::licensing_router_with;
use licensing::{LicensingConfig, SqliteLicenseRepository};
use platform::rate_limit::RateLimitConfig;

const ADMIN_KEY: &str = "test-admin";

/// Router over a fresh in-memory store, with pools too generous to trip
async fn test_router() -> (Router, Arc<LicensingConfig>) {
    let pools = LimiterPools::with_configs(
        RateLimitConfig::new(1000.0, 1000),
        RateLimitConfig::new(1000.0, 1000),
        RateLimitConfig::new(1000.0, 1000),
    );
    router_with_pools(pools).await
}

async fn router_with_pools(pools: LimiterPools) -> (Router, Arc<LicensingConfig>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let repo = SqliteLicenseRepository::new(pool);
    repo.migrate().await.unwrap();

    let config = Arc::new(LicensingConfig::development(ADMIN_KEY));
    let authenticator = Arc::new(AdminAuthenticator::new(config.clone()));
    let router = licensing_router_with(repo, config.clone(), authenticator, Arc::new(pools));
    (router, config)
}

fn post_json(uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_list(bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn issue_license(router: &Router, machine_id: &str) -> Value {
    let request = post_json(
        "/issue",
        json!({
            "customer": "acme",
            "machine_id": machine_id,
            "expires_at": "2099-01-01T00:00:00Z",
            "features": {"seats": 5},
        }),
        Some(ADMIN_KEY),
    );
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

async fn validate(router: &Router, license_key: &str, machine_id: &str) -> Value {
    let request = post_json(
        "/validate",
        json!({"license_key": license_key, "machine_id": machine_id}),
        None,
    );
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn issue_validate_revoke_flow() {
    let (router, _) = test_router().await;

    let file = issue_license(&router, "m1").await;
    let key = file["license_key"].as_str().unwrap().to_string();
    assert!(!file["signature"].as_str().unwrap().is_empty());
    assert!(file["public_key_pem"].as_str().unwrap().contains("PUBLIC KEY"));

    let body = validate(&router, &key, "m1").await;
    assert_eq!(body["valid"], json!(true));
    assert_eq!(body["revoked"], json!(false));

    let body = validate(&router, &key, "m2").await;
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["reason"], json!("machine mismatch"));

    let response = router
        .clone()
        .oneshot(post_json(
            "/revoke",
            json!({"license_key": key}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ok"], json!(true));

    let body = validate(&router, &key, "m1").await;
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["revoked"], json!(true));
    assert_eq!(body["reason"], json!("revoked"));
}

#[tokio::test]
async fn issued_signature_verifies_against_embedded_key() {
    let (router, config) = test_router().await;

    let file = issue_license(&router, "m1").await;

    // rebuild the signed payload exactly as a client would, from the
    // license file fields alone
    let payload = json!({
        "customer": file["customer"],
        "machine_id": file["machine_id"],
        "license_key": file["license_key"],
        "expires_at": file["expires_at"],
        "issued_at": file["issued_at"],
        "features": file["features"],
    });

    let signature = file["signature"].as_str().unwrap();
    assert!(config.verifier().verify(&payload, signature));

    // one flipped payload byte must fail verification
    let mut tampered = payload.clone();
    tampered["customer"] = json!("acmf");
    assert!(!config.verifier().verify(&tampered, signature));
}

#[tokio::test]
async fn validate_unknown_license() {
    let (router, _) = test_router().await;

    let body = validate(&router, "no-such-key", "m1").await;
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["reason"], json!("unknown license"));
}

#[tokio::test]
async fn admin_surface_requires_bearer_key() {
    let (router, _) = test_router().await;

    let issue_body = json!({
        "customer": "acme",
        "machine_id": "m1",
        "expires_at": "2099-01-01T00:00:00Z",
    });

    let response = router
        .clone()
        .oneshot(post_json("/issue", issue_body.clone(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(post_json("/issue", issue_body.clone(), Some("wrong-key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(get_list(None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // client endpoints stay open
    let body = validate(&router, "no-such-key", "m1").await;
    assert_eq!(body["reason"], json!("unknown license"));
}

#[tokio::test]
async fn issue_rejects_missing_fields() {
    let (router, _) = test_router().await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/issue",
            json!({"machine_id": "m1", "expires_at": "2099-01-01T00:00:00Z"}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["detail"], json!("customer required"));

    let response = router
        .clone()
        .oneshot(post_json(
            "/issue",
            json!({"customer": "acme", "machine_id": "m1"}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["detail"], json!("expires_at required"));
}

#[tokio::test]
async fn heartbeat_updates_last_seen() {
    let (router, _) = test_router().await;

    let file = issue_license(&router, "m1").await;
    let key = file["license_key"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(post_json("/heartbeat", json!({"license_key": key}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ok"], json!(true));

    let response = router.clone().oneshot(get_list(Some(ADMIN_KEY))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let entry = &body["licenses"][0];
    assert!(entry["last_seen_at"].is_string());
    assert_eq!(entry["revoked"], json!(false));

    // unknown key is a 404
    let response = router
        .clone()
        .oneshot(post_json(
            "/heartbeat",
            json!({"license_key": "no-such-key"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revoke_twice_succeeds_on_existing_row() {
    let (router, _) = test_router().await;

    let file = issue_license(&router, "m1").await;
    let key = file["license_key"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(post_json(
                "/revoke",
                json!({"license_key": key}),
                Some(ADMIN_KEY),
            ))
            .await
            .unwrap();
        // the row still matches, so the second revoke is a no-op success
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router
        .clone()
        .oneshot(post_json(
            "/revoke",
            json!({"license_key": "no-such-key"}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_applies_partial_changes() {
    let (router, _) = test_router().await;

    let file = issue_license(&router, "m1").await;
    let key = file["license_key"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(post_json(
            "/update",
            json!({"license_key": key, "expires_at": "2001-01-01T00:00:00Z"}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // the shortened expiry is now in the past
    let body = validate(&router, &key, "m1").await;
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["reason"], json!("expired"));

    let response = router
        .clone()
        .oneshot(post_json(
            "/update",
            json!({"license_key": key, "features": {"seats": 10}}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.clone().oneshot(get_list(Some(ADMIN_KEY))).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["licenses"][0]["features"]["seats"], json!(10));
}

#[tokio::test]
async fn update_rejects_bad_requests() {
    let (router, _) = test_router().await;

    let file = issue_license(&router, "m1").await;
    let key = file["license_key"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(post_json(
            "/update",
            json!({"license_key": key}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(post_json(
            "/update",
            json!({"license_key": key, "expires_at": "next tuesday"}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(post_json(
            "/update",
            json!({"license_key": "no-such-key", "expires_at": "2099-01-01T00:00:00Z"}),
            Some(ADMIN_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_orders_most_recent_first() {
    let (router, _) = test_router().await;

    issue_license(&router, "m-first").await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    issue_license(&router, "m-second").await;

    let response = router.clone().oneshot(get_list(Some(ADMIN_KEY))).await.unwrap();
    let body = json_body(response).await;
    let licenses = body["licenses"].as_array().unwrap();
    assert_eq!(licenses.len(), 2);
    assert_eq!(licenses[0]["machine_id"], json!("m-second"));
    assert_eq!(licenses[1]["machine_id"], json!("m-first"));
}

#[tokio::test]
async fn admin_pool_throttles_rapid_requests() {
    let pools = LimiterPools::with_configs(
        RateLimitConfig::new(1000.0, 1000),
        RateLimitConfig::new(1.0, 1),
        RateLimitConfig::new(1000.0, 1000),
    );
    let (router, _) = router_with_pools(pools).await;

    let response = router.clone().oneshot(get_list(Some(ADMIN_KEY))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.clone().oneshot(get_list(Some(ADMIN_KEY))).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert!(response.headers().contains_key("ratelimit-remaining"));
}

#[tokio::test]
async fn rate_limit_keys_are_per_client_address() {
    let pools = LimiterPools::with_configs(
        RateLimitConfig::new(1.0, 1),
        RateLimitConfig::new(1000.0, 1000),
        RateLimitConfig::new(1000.0, 1000),
    );
    let (router, _) = router_with_pools(pools).await;

    let request_from = |ip: &str| {
        Request::builder()
            .method("POST")
            .uri("/validate")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                json!({"license_key": "k", "machine_id": "m"}).to_string(),
            ))
            .unwrap()
    };

    // two different forwarded addresses each get their own bucket
    let response = router.clone().oneshot(request_from("198.51.100.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = router.clone().oneshot(request_from("198.51.100.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // the same address is drained
    let response = router.clone().oneshot(request_from("198.51.100.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
