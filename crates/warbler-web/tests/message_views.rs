mod common;

use axum::http::StatusCode;

use common::TestApp;

const UNAUTHORIZED: &str = "Access unauthorized.";

#[tokio::test]
async fn add_message_redirects_to_author_profile() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let mut client = app.logged_in_as(testuser.id);

    let resp = client.post("/messages/new", "text=Hello").await;
    assert!(resp.is_redirect());
    assert_eq!(resp.location.as_deref(), Some(format!("/users/{}", testuser.id).as_str()));

    let messages = app.db().messages_by_user(testuser.id, 100).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "Hello");
}

#[tokio::test]
async fn posted_user_id_is_ignored() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let other = app.user("other");
    let mut client = app.logged_in_as(testuser.id);

    let form = format!("text=test+add+to+other+user&user_id={}", other.id);
    let resp = client.post_following("/messages/new", &form).await;
    assert_eq!(resp.status, StatusCode::OK);

    let mine = app.db().messages_by_user(testuser.id, 100).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].text, "test add to other user");
    assert!(app.db().messages_by_user(other.id, 100).unwrap().is_empty());
}

#[tokio::test]
async fn add_message_logged_out_is_refused() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let mut client = app.anonymous();

    let resp = client.post_following("/messages/new", "text=Hello").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains(UNAUTHORIZED));
    assert!(app.db().messages_by_user(testuser.id, 100).unwrap().is_empty());
}

#[tokio::test]
async fn new_message_form_requires_login() {
    let app = TestApp::new();
    let testuser = app.user("testuser");

    let resp = app.anonymous().get_following("/messages/new").await;
    assert!(resp.body.contains(UNAUTHORIZED));

    let resp = app.logged_in_as(testuser.id).get("/messages/new").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("<textarea"));
}

#[tokio::test]
async fn overlong_message_is_rejected() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let mut client = app.logged_in_as(testuser.id);

    let form = format!("text={}", "a".repeat(141));
    let resp = client.post("/messages/new", &form).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("alert-danger"));
    assert!(app.db().messages_by_user(testuser.id, 100).unwrap().is_empty());

    let resp = client.post("/messages/new", "text=").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(app.db().messages_by_user(testuser.id, 100).unwrap().is_empty());
}

#[tokio::test]
async fn view_message() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let message = app.message(&testuser, "a test message");

    let resp = app
        .logged_in_as(testuser.id)
        .get(&format!("/messages/{}", message.id))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("a test message"));
    assert!(resp.body.contains("@testuser"));
}

#[tokio::test]
async fn view_message_is_public() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let message = app.message(&testuser, "out in the open");

    let resp = app.anonymous().get(&format!("/messages/{}", message.id)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("out in the open"));
}

#[tokio::test]
async fn view_unknown_message_is_404() {
    let app = TestApp::new();
    let testuser = app.user("testuser");

    let resp = app
        .logged_in_as(testuser.id)
        .get(&format!("/messages/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.body.contains("Not Found"));
    assert!(resp.body.contains("Search Warbler"));
}

#[tokio::test]
async fn delete_own_message() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let message = app.message(&testuser, "a test message");
    let mut client = app.logged_in_as(testuser.id);

    let resp = client
        .post_following(&format!("/messages/{}/delete", message.id), "")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Message deleted"));
    assert!(app.db().get_message(message.id).unwrap().is_none());
    assert!(app.db().messages_by_user(testuser.id, 100).unwrap().is_empty());
}

#[tokio::test]
async fn delete_with_get_is_method_not_allowed() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let other = app.user("other");
    let message = app.message(&other, "not yours");

    let resp = app
        .logged_in_as(testuser.id)
        .get(&format!("/messages/{}/delete", message.id))
        .await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(resp.body.contains("Method Not Allowed"));
    assert!(app.db().get_message(message.id).unwrap().is_some());
}

#[tokio::test]
async fn delete_other_users_message_is_refused() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let other = app.user("other");
    let message = app.message(&other, "not yours");

    let resp = app
        .logged_in_as(testuser.id)
        .post_following(&format!("/messages/{}/delete", message.id), "")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains(UNAUTHORIZED));
    assert!(app.db().get_message(message.id).unwrap().is_some());
}

#[tokio::test]
async fn delete_logged_out_is_refused() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let message = app.message(&testuser, "still here");

    let resp = app
        .anonymous()
        .post_following(&format!("/messages/{}/delete", message.id), "")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains(UNAUTHORIZED));
    assert!(app.db().get_message(message.id).unwrap().is_some());
}

#[tokio::test]
async fn like_and_unlike_someone_elses_message() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let other = app.user("other");
    let message = app.message(&other, "likeable");
    let mut client = app.logged_in_as(testuser.id);
    let uri = format!("/messages/{}/like", message.id);

    let resp = client.post(&uri, "").await;
    assert!(resp.is_redirect());
    assert!(app.db().liked_message_ids(testuser.id).unwrap().contains(&message.id));

    let resp = client.get(&format!("/users/{}/likes", testuser.id)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("likeable"));

    client.post(&uri, "").await;
    assert!(app.db().liked_message_ids(testuser.id).unwrap().is_empty());
}

#[tokio::test]
async fn liking_own_message_is_refused() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let message = app.message(&testuser, "mine");

    let resp = app
        .logged_in_as(testuser.id)
        .post_following(&format!("/messages/{}/like", message.id), "")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("like your own message"));
    assert!(app.db().liked_message_ids(testuser.id).unwrap().is_empty());
}

#[tokio::test]
async fn like_logged_out_is_refused() {
    let app = TestApp::new();
    let testuser = app.user("testuser");
    let message = app.message(&testuser, "mine");

    let resp = app
        .anonymous()
        .post_following(&format!("/messages/{}/like", message.id), "")
        .await;
    assert!(resp.body.contains(UNAUTHORIZED));
}
