//! Job posting and application flows against a real database

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::{error_message, TestApp, TestUser};

fn job_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "Retile a small bathroom floor and replace the skirting.",
        "category": "Tiling",
        "job_type": "one_time",
        "budget": { "min": 400, "max": 900 },
        "location": "Kumasi",
        "skills": ["tiling", "grouting"],
    })
}

fn cover_letter() -> Value {
    json!({
        "cover_letter": "I have tiled over forty bathrooms in Kumasi and can start Monday.",
        "proposed_rate": "650.00",
        "estimated_duration": "3 days",
    })
}

async fn post_job(app: &TestApp, hirer: &TestUser, body: Value) -> Value {
    let (status, job) = app.send(Method::POST, "/api/jobs", hirer.token(), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create job failed: {job}");
    job
}

async fn apply(app: &TestApp, worker: &TestUser, job_id: &str) -> (StatusCode, Value) {
    app.send(
        Method::POST,
        &format!("/api/jobs/{job_id}/applications"),
        worker.token(),
        Some(cover_letter()),
    )
    .await
}

async fn set_application_status(
    app: &TestApp,
    user: &TestUser,
    application_id: &str,
    status: &str,
) -> (StatusCode, Value) {
    app.send(
        Method::PATCH,
        &format!("/api/applications/{application_id}/status"),
        user.token(),
        Some(json!({ "status": status })),
    )
    .await
}

mod test_job_posting {
    use super::*;

    #[tokio::test]
    async fn test_create_and_fetch_job() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;

        let job = post_job(&app, &hirer, job_body("Bathroom retiling")).await;
        assert_eq!(job["status"], "open");
        assert_eq!(job["hirer_id"], hirer.id.to_string());
        let min: f64 = job["budget"]["min"].as_str().unwrap().parse().unwrap();
        assert_eq!(min, 400.0);
        assert_eq!(job["budget"]["currency"], "GHS");

        let (status, fetched) = app
            .send(Method::GET, &format!("/api/jobs/{}", job["id"].as_str().unwrap()), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["title"], "Bathroom retiling");
    }

    #[tokio::test]
    async fn test_workers_cannot_post_jobs() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let worker = app.signed_in_user("worker").await;

        let (status, _) = app
            .send(Method::POST, "/api/jobs", worker.token(), Some(job_body("Fix my roof")))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_budget_bounds_are_validated() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let mut body = job_body("Paint the fence");
        body["budget"] = json!({ "min": 900, "max": 400 });

        let (status, body) = app.send(Method::POST, "/api/jobs", hirer.token(), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_message(&body).contains("budget"));
    }

    #[tokio::test]
    async fn test_blank_text_fields_are_rejected() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;

        let mut body = job_body("placeholder");
        body["title"] = json!("          ");
        let (status, error) = app.send(Method::POST, "/api/jobs", hirer.token(), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_message(&error).contains("title"));

        let mut body = job_body("Wardrobe assembly");
        body["category"] = json!("   ");
        let (status, error) = app.send(Method::POST, "/api/jobs", hirer.token(), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_message(&error).contains("category"));

        let job = post_job(&app, &hirer, job_body("Wardrobe assembly")).await;
        let uri = format!("/api/jobs/{}", job["id"].as_str().unwrap());
        let (status, _) = app
            .send(Method::PUT, &uri, hirer.token(), Some(json!({ "title": "       " })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, fetched) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(fetched["title"], "Wardrobe assembly");

        let worker = app.signed_in_user("worker").await;
        let (status, _) = app
            .send(
                Method::POST,
                &format!("{uri}/applications"),
                worker.token(),
                Some(json!({ "cover_letter": format!("{}hi{}", " ".repeat(20), " ".repeat(20)) })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_drafts_are_private() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let mut body = job_body("Draft carpentry work");
        body["publish"] = json!(false);
        let job = post_job(&app, &hirer, body).await;
        assert_eq!(job["status"], "draft");
        let uri = format!("/api/jobs/{}", job["id"].as_str().unwrap());

        let (status, _) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.send(Method::GET, &uri, hirer.token(), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, mine) = app
            .send(Method::GET, "/api/jobs/my-jobs?status=draft", hirer.token(), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine["total"], 1);
    }

    #[tokio::test]
    async fn test_search_filters_by_skill_and_text() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let marker = Uuid::new_v4().simple().to_string();
        let mut body = job_body(&format!("Plumbing {}", &marker[..8]));
        body["skills"] = json!([marker.clone()]);
        post_job(&app, &hirer, body).await;

        let (status, found) = app
            .send(Method::GET, &format!("/api/jobs?skills={marker}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["total"], 1);
        assert_eq!(found["page"], 1);

        let (status, found) = app
            .send(Method::GET, &format!("/api/jobs?search={}", &marker[..8]), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["jobs"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_only_owner_edits_and_deletes() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let other = app.signed_in_user("hirer").await;
        let job = post_job(&app, &hirer, job_body("Electrical rewiring")).await;
        let uri = format!("/api/jobs/{}", job["id"].as_str().unwrap());
        let update = json!({ "title": "Full electrical rewiring" });

        let (status, _) = app
            .send(Method::PUT, &uri, other.token(), Some(update.clone()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, updated) = app.send(Method::PUT, &uri, hirer.token(), Some(update)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Full electrical rewiring");

        let (status, _) = app.send(Method::DELETE, &uri, other.token(), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.send(Method::DELETE, &uri, hirer.token(), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.send(Method::GET, &uri, hirer.token(), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod test_applications {
    use super::*;

    #[tokio::test]
    async fn test_accepting_hires_and_rejects_the_rest() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let first = app.signed_in_user("worker").await;
        let second = app.signed_in_user("worker").await;
        let job = post_job(&app, &hirer, job_body("Kitchen cabinet install")).await;
        let job_id = job["id"].as_str().unwrap();

        let (status, accepted) = apply(&app, &first, job_id).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(accepted["status"], "pending");
        let (status, rejected) = apply(&app, &second, job_id).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, listed) = app
            .send(
                Method::GET,
                &format!("/api/jobs/{job_id}/applications"),
                hirer.token(),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["total"], 2);

        let (status, body) =
            set_application_status(&app, &hirer, accepted["id"].as_str().unwrap(), "accepted")
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "accepted");

        let (_, job) = app
            .send(Method::GET, &format!("/api/jobs/{job_id}"), None, None)
            .await;
        assert_eq!(job["status"], "in_progress");
        assert_eq!(job["worker_id"], first.id.to_string());

        let (_, mine) = app
            .send(Method::GET, "/api/applications/me", second.token(), None)
            .await;
        assert_eq!(mine["total"], 1);
        assert_eq!(mine["applications"][0]["id"], rejected["id"]);
        assert_eq!(mine["applications"][0]["status"], "rejected");

        // The job is no longer open
        let late = app.signed_in_user("worker").await;
        let (status, _) = apply(&app, &late, job_id).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reopened_job_can_hire_again() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let first = app.signed_in_user("worker").await;
        let second = app.signed_in_user("worker").await;
        let job = post_job(&app, &hirer, job_body("Ceiling fan installation")).await;
        let job_id = job["id"].as_str().unwrap();
        let status_uri = format!("/api/jobs/{job_id}/status");

        let (_, hired) = apply(&app, &first, job_id).await;
        let (status, _) =
            set_application_status(&app, &hirer, hired["id"].as_str().unwrap(), "accepted").await;
        assert_eq!(status, StatusCode::OK);

        let (status, reopened) = app
            .send(Method::PATCH, &status_uri, hirer.token(), Some(json!({ "status": "open" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reopened["status"], "open");
        assert!(reopened["worker_id"].is_null());

        let (_, mine) = app
            .send(Method::GET, "/api/applications/me", first.token(), None)
            .await;
        assert_eq!(mine["applications"][0]["status"], "rejected");

        let (status, next) = apply(&app, &second, job_id).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) =
            set_application_status(&app, &hirer, next["id"].as_str().unwrap(), "accepted").await;
        assert_eq!(status, StatusCode::OK, "rehire failed: {body}");

        let (_, job) = app
            .send(Method::GET, &format!("/api/jobs/{job_id}"), None, None)
            .await;
        assert_eq!(job["status"], "in_progress");
        assert_eq!(job["worker_id"], second.id.to_string());
    }

    #[tokio::test]
    async fn test_reopened_job_without_hire_can_be_deleted() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let worker = app.signed_in_user("worker").await;
        let job = post_job(&app, &hirer, job_body("Fence post replacement")).await;
        let job_id = job["id"].as_str().unwrap();

        let (_, application) = apply(&app, &worker, job_id).await;
        set_application_status(&app, &hirer, application["id"].as_str().unwrap(), "accepted").await;
        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/jobs/{job_id}/status"),
                hirer.token(),
                Some(json!({ "status": "open" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .send(Method::DELETE, &format!("/api/jobs/{job_id}"), hirer.token(), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_duplicate_application_conflicts() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let worker = app.signed_in_user("worker").await;
        let job = post_job(&app, &hirer, job_body("Garden landscaping")).await;
        let job_id = job["id"].as_str().unwrap();

        let (status, _) = apply(&app, &worker, job_id).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = apply(&app, &worker, job_id).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_status_changes_respect_roles() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let worker = app.signed_in_user("worker").await;
        let stranger = app.signed_in_user("worker").await;
        let job = post_job(&app, &hirer, job_body("Masonry repairs")).await;
        let (_, application) = apply(&app, &worker, job["id"].as_str().unwrap()).await;
        let id = application["id"].as_str().unwrap();

        let (status, _) = set_application_status(&app, &worker, id, "accepted").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = set_application_status(&app, &hirer, id, "withdrawn").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = set_application_status(&app, &stranger, id, "withdrawn").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = set_application_status(&app, &worker, id, "withdrawn").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "withdrawn");

        // Terminal
        let (status, _) = set_application_status(&app, &hirer, id, "accepted").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cancelling_job_rejects_pending_applications() {
        let Some(app) = TestApp::with_database().await else {
            return;
        };
        let hirer = app.signed_in_user("hirer").await;
        let worker = app.signed_in_user("worker").await;
        let job = post_job(&app, &hirer, job_body("Roof gutter cleaning")).await;
        let job_id = job["id"].as_str().unwrap();
        apply(&app, &worker, job_id).await;

        let (status, body) = app
            .send(
                Method::PATCH,
                &format!("/api/jobs/{job_id}/status"),
                hirer.token(),
                Some(json!({ "status": "cancelled" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelled");

        let (_, mine) = app
            .send(Method::GET, "/api/applications/me", worker.token(), None)
            .await;
        assert_eq!(mine["applications"][0]["status"], "rejected");

        // Cancelled is terminal
        let late = app.signed_in_user("worker").await;
        let (status, _) = apply(&app, &late, job_id).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/jobs/{job_id}/status"),
                hirer.token(),
                Some(json!({ "status": "open" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
