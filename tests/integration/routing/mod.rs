//! Router-level tests that never reach the database

use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use kelmah_accounts::domain::oauth::OAuthCredentials;
use kelmah_app::VERSION_BANNER;
use kelmah_common::RateLimiter;

use crate::common::{build_request, error_message, parse_body, registration, TestApp};

#[tokio::test]
async fn test_health_and_banner() {
    let app = TestApp::router_only().unwrap();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let (status, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, VERSION_BANNER);

    let (status, body) = app.send(Method::GET, "/api/auth/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::router_only().unwrap();
    let (status, _) = app.send(Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_reports_every_invalid_field() {
    let app = TestApp::router_only().unwrap();
    let body = json!({
        "first_name": "A",
        "last_name": "Boateng",
        "email": "not-an-email",
        "password": "weak",
        "confirm_password": "different",
        "role": "admin",
    });

    let (status, body) = app
        .send(Method::POST, "/api/auth/register", None, Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let message = error_message(&body);
    for field in ["\"email\"", "\"first_name\"", "\"password\"", "\"role\"", "\"confirm_password\""] {
        assert!(message.contains(field), "missing {field} in {message}");
    }
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = TestApp::router_only().unwrap();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = TestApp::router_only().unwrap();

    for (method, uri) in [
        (Method::GET, "/api/auth/me"),
        (Method::GET, "/api/auth/sessions"),
        (Method::POST, "/api/jobs"),
        (Method::GET, "/api/jobs/my-jobs"),
        (Method::GET, "/api/applications/me"),
        (Method::GET, "/api/conversations"),
    ] {
        let (status, body) = app.send(method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert!(body["error"]["code"].is_string());
    }
}

#[tokio::test]
async fn test_invalid_bearer_token_is_401() {
    let app = TestApp::router_only().unwrap();
    let (status, _) = app
        .send(Method::GET, "/api/auth/me", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oauth_unconfigured_is_501() {
    let app = TestApp::router_only().unwrap();

    for provider in ["google", "facebook", "linkedin"] {
        let (status, body) = app
            .send(Method::GET, &format!("/api/auth/{provider}"), None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED, "{provider}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_oauth_configured_redirects_to_provider() {
    let app = TestApp::router_only_with(|services| {
        services.accounts_config.oauth.google = Some(OAuthCredentials {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
        });
    })
    .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(build_request(Method::GET, "/api/auth/google", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.contains("client_id=test-client"));

    let response = app
        .router
        .clone()
        .oneshot(build_request(Method::GET, "/api/auth/google/callback", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_register_is_rate_limited_per_client() {
    let app = TestApp::router_only_with(|services| {
        services.limiter = Arc::new(RateLimiter::new(true).with_trusted_proxy(true));
    })
    .unwrap();

    // Invalid bodies are counted before validation runs
    let mut body = registration("not-an-email", "worker");
    body["role"] = json!("admin");

    for _ in 0..5 {
        let mut request = build_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(body.clone()),
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let mut request = build_request(Method::POST, "/api/auth/register", None, Some(body.clone()));
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body_json = parse_body(response).await;
    assert_eq!(body_json["error"]["code"], "RATE_LIMIT_EXCEEDED");

    // Another client still has its own budget
    let mut request = build_request(Method::POST, "/api/auth/register", None, Some(body));
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.4".parse().unwrap());
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_job_search_rejects_bad_filters_before_querying() {
    let app = TestApp::router_only().unwrap();

    let (status, body) = app
        .send(Method::GET, "/api/jobs?status=draft", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("status"));

    let (status, _) = app
        .send(Method::GET, "/api/jobs?job_type=gig", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
