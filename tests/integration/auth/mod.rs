//! Account flows against a real database

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use kelmah_accounts::domain::totp;

use crate::common::{error_message, registration, TestApp, TEST_PASSWORD};

fn current_code(secret: &str) -> String {
    let key = totp::base32_decode(secret).unwrap();
    totp::code_at(&key, totp::now_secs(), totp::DIGITS).unwrap()
}

/// Six digits guaranteed not to match the current step
fn wrong_code(secret: &str) -> String {
    let code: u32 = current_code(secret).parse().unwrap();
    format!("{:06}", (code + 500_000) % 1_000_000)
}

mod test_registration {
    use super::*;

    #[tokio::test]
    async fn test_unverified_user_cannot_log_in() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let email = format!("unverified_{}@kelmah.test", Uuid::new_v4().simple());

        let (status, body) = app
            .send(Method::POST, "/api/auth/register", None, Some(registration(&email, "worker")))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["is_email_verified"], false);
        assert!(body["user"].get("password_hash").is_none());

        let (status, _) = app.login(&email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("hirer").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(registration(&user.email.to_uppercase(), "worker")),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_verification_token_is_single_use() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let email = format!("verify_{}@kelmah.test", Uuid::new_v4().simple());
        app.send(Method::POST, "/api/auth/register", None, Some(registration(&email, "worker")))
            .await;
        let token = app.email.latest_verification_token(&email).unwrap();

        let uri = format!("/api/auth/verify/{token}");
        let (status, body) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["is_email_verified"], true);

        let (status, _) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod test_sessions {
    use super::*;

    #[tokio::test]
    async fn test_me_returns_profile() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("worker").await;

        let (status, body) = app.send(Method::GET, "/api/auth/me", user.token(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], user.email.as_str());
        assert_eq!(body["user"]["role"], "worker");
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("worker").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/refresh-token",
                None,
                Some(json!({ "refresh_token": user.refresh_token })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let rotated = body["refresh_token"].as_str().unwrap().to_string();
        assert_ne!(rotated, user.refresh_token);
        assert_eq!(body["token_type"], "Bearer");

        // The presented token is spent
        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/refresh-token",
                None,
                Some(json!({ "refresh_token": user.refresh_token })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/refresh-token",
                None,
                Some(json!({ "refresh_token": rotated })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("hirer").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/logout",
                None,
                Some(json!({ "refresh_token": user.refresh_token })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.send(Method::GET, "/api/auth/me", user.token(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Logging out again still succeeds
        let (status, _) = app.send(Method::POST, "/api/auth/logout", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_and_revoke_sessions() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("worker").await;
        let (status, second) = app.login(&user.email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        let second_token = second["access_token"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(Method::GET, "/api/auth/sessions", user.token(), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let sessions = body["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions.iter().filter(|s| s["current"] == true).count(), 1);

        let (status, body) = app
            .send(Method::DELETE, "/api/auth/sessions", user.token(), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revoked"], 1);

        let (status, _) = app
            .send(Method::GET, "/api/auth/me", Some(&second_token), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/api/auth/sessions/{}", Uuid::new_v4()),
                user.token(),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod test_passwords {
    use super::*;

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("worker").await;

        for _ in 0..5 {
            let (status, body) = app.login(&user.email, "Wr0ng!Password").await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(error_message(&body), "Invalid email or password");
        }

        let (status, body) = app.login(&user.email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(error_message(&body).contains("locked"));
    }

    #[tokio::test]
    async fn test_forgot_and_reset_password() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("hirer").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/forgot-password",
                None,
                Some(json!({ "email": user.email })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        // Unknown addresses get the same answer
        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/forgot-password",
                None,
                Some(json!({ "email": "nobody@kelmah.test" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let token = app.email.latest_reset_token(&user.email).unwrap();
        let new_password = "N3w!Passw0rd";
        let (status, _) = app
            .send(
                Method::POST,
                &format!("/api/auth/reset-password/{token}"),
                None,
                Some(json!({ "password": new_password, "confirm_password": new_password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.send(Method::GET, "/api/auth/me", user.token(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.login(&user.email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.login(&user.email, new_password).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_change_password_keeps_current_session() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("worker").await;
        let new_password = "An0ther!Passw0rd";

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/change-password",
                user.token(),
                Some(json!({
                    "current_password": TEST_PASSWORD,
                    "new_password": new_password,
                    "confirm_password": new_password,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let fresh = body["access_token"].as_str().unwrap().to_string();

        // Old access token carries a stale token version
        let (status, _) = app.send(Method::GET, "/api/auth/me", user.token(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&fresh), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}

mod test_mfa {
    use super::*;

    #[tokio::test]
    async fn test_mfa_enrollment_and_login() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("hirer").await;

        let (status, body) = app
            .send(Method::POST, "/api/auth/mfa/setup", user.token(), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let secret = body["secret"].as_str().unwrap().to_string();
        assert!(body["otpauth_url"].as_str().unwrap().starts_with("otpauth://totp/"));

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/mfa/verify",
                user.token(),
                Some(json!({ "code": wrong_code(&secret) })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/mfa/verify",
                user.token(),
                Some(json!({ "code": current_code(&secret) })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mfa_enabled"], true);

        let (status, body) = app.login(&user.email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mfa_required"], true);
        assert!(body.get("access_token").is_none());

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({
                    "email": user.email,
                    "password": TEST_PASSWORD,
                    "mfa_code": current_code(&secret),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].is_string());
    }
}

mod test_account_lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_deactivate_and_reactivate() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let user = app.signed_in_user("worker").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/account/deactivate",
                user.token(),
                Some(json!({ "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.login(&user.email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let reactivate = json!({ "email": user.email, "password": TEST_PASSWORD });
        let (status, body) = app
            .send(Method::POST, "/api/auth/account/reactivate", None, Some(reactivate.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["is_active"], true);

        let (status, _) = app
            .send(Method::POST, "/api/auth/account/reactivate", None, Some(reactivate))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app.login(&user.email, TEST_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
    }
}
