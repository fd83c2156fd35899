//! Conversation and message flows against a real database

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::{TestApp, TestUser};

async fn start_conversation(
    app: &TestApp,
    from: &TestUser,
    to: &TestUser,
) -> (StatusCode, Value) {
    app.send(
        Method::POST,
        "/api/conversations",
        from.token(),
        Some(json!({ "participant_id": to.id })),
    )
    .await
}

async fn send_message(app: &TestApp, from: &TestUser, conversation_id: &str, content: &str) -> StatusCode {
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/conversations/{conversation_id}/messages"),
            from.token(),
            Some(json!({ "content": content })),
        )
        .await;
    status
}

#[tokio::test]
async fn test_conversation_is_reused_per_pair() {
    let Some(app) = TestApp::with_database().await else {
        return;
    };
    let hirer = app.signed_in_user("hirer").await;
    let worker = app.signed_in_user("worker").await;

    let (status, created) = start_conversation(&app, &hirer, &worker).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["other_participant"]["id"], worker.id.to_string());
    assert_eq!(created["status"], "active");

    // Either side opening it again lands on the same conversation
    let (status, again) = start_conversation(&app, &worker, &hirer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], created["id"]);
    assert_eq!(again["other_participant"]["id"], hirer.id.to_string());
}

#[tokio::test]
async fn test_cannot_message_self_or_unknown_user() {
    let Some(app) = TestApp::with_database().await else {
        return;
    };
    let user = app.signed_in_user("worker").await;

    let (status, _) = start_conversation(&app, &user, &user).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/conversations",
            user.token(),
            Some(json!({ "participant_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_messages_unread_counts_and_read_receipts() {
    let Some(app) = TestApp::with_database().await else {
        return;
    };
    let hirer = app.signed_in_user("hirer").await;
    let worker = app.signed_in_user("worker").await;
    let (_, conversation) = start_conversation(&app, &hirer, &worker).await;
    let id = conversation["id"].as_str().unwrap();

    assert_eq!(send_message(&app, &hirer, id, "Are you free on Saturday?").await, StatusCode::CREATED);
    assert_eq!(send_message(&app, &hirer, id, "The job is in Adum.").await, StatusCode::CREATED);
    assert_eq!(send_message(&app, &hirer, id, "   ").await, StatusCode::BAD_REQUEST);

    let (status, listed) = app
        .send(Method::GET, "/api/conversations", worker.token(), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entry = listed["conversations"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == id)
        .cloned()
        .unwrap();
    assert_eq!(entry["unread_count"], 2);
    assert_eq!(entry["last_message"]["content"], "The job is in Adum.");

    let (status, messages) = app
        .send(Method::GET, &format!("/api/conversations/{id}/messages"), worker.token(), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages["total"], 2);
    assert_eq!(messages["messages"][0]["content"], "Are you free on Saturday?");

    let (status, read) = app
        .send(Method::POST, &format!("/api/conversations/{id}/read"), worker.token(), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["updated"], 2);

    let (_, fetched) = app
        .send(Method::GET, &format!("/api/conversations/{id}"), worker.token(), None)
        .await;
    assert_eq!(fetched["unread_count"], 0);
}

#[tokio::test]
async fn test_outsiders_cannot_see_conversation() {
    let Some(app) = TestApp::with_database().await else {
        return;
    };
    let hirer = app.signed_in_user("hirer").await;
    let worker = app.signed_in_user("worker").await;
    let outsider = app.signed_in_user("worker").await;
    let (_, conversation) = start_conversation(&app, &hirer, &worker).await;
    let id = conversation["id"].as_str().unwrap();

    let (status, _) = app
        .send(Method::GET, &format!("/api/conversations/{id}"), outsider.token(), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(send_message(&app, &outsider, id, "Hello?").await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_archived_conversation_rejects_messages() {
    let Some(app) = TestApp::with_database().await else {
        return;
    };
    let hirer = app.signed_in_user("hirer").await;
    let worker = app.signed_in_user("worker").await;
    let (_, conversation) = start_conversation(&app, &hirer, &worker).await;
    let id = conversation["id"].as_str().unwrap();
    let uri = format!("/api/conversations/{id}");

    let (status, archived) = app
        .send(Method::PATCH, &uri, worker.token(), Some(json!({ "status": "archived" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived["status"], "archived");

    assert_eq!(send_message(&app, &hirer, id, "Still there?").await, StatusCode::BAD_REQUEST);

    let (_, active) = app
        .send(Method::GET, "/api/conversations", hirer.token(), None)
        .await;
    assert!(active["conversations"]
        .as_array()
        .unwrap()
        .iter()
        .all(|c| c["id"] != id));

    let (_, listed) = app
        .send(Method::GET, "/api/conversations?status=archived", hirer.token(), None)
        .await;
    assert_eq!(listed["total"], 1);

    let (status, _) = app
        .send(Method::PATCH, &uri, hirer.token(), Some(json!({ "status": "active" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(send_message(&app, &hirer, id, "Back again").await, StatusCode::CREATED);
}
