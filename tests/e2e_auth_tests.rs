//! End-to-end tests for authentication endpoints
//!
//! Tests login, logout, session management, and signup.

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn login_with_valid_credentials_returns_a_token() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, TEST_PASS).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap();
    assert!(!token.is_empty());
}

#[tokio::test]
async fn login_with_wrong_password_is_forbidden() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, "not-the-password").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_with_unknown_email_is_forbidden() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login("nobody@example.com", TEST_PASS).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn session_reports_the_account_and_role() {
    let server = TestServer::spawn().await;

    let client = TestClient::authenticated(server.base_url.clone()).await;
    let session: Value = client.get_session().await.json().await.unwrap();
    assert_eq!(session["email"], TEST_USER);
    assert_eq!(session["role"], "user");

    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let session: Value = admin.get_session().await.json().await.unwrap();
    assert_eq!(session["email"], ADMIN_USER);
    assert_eq!(session["role"], "admin");
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    assert_eq!(client.get_session().await.status(), StatusCode::OK);

    let response = client.logout().await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(client.get_session().await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signup_creates_a_regular_account() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.signup("fresh@example.com", "brandnewpw").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client.login("fresh@example.com", "brandnewpw").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let session: Value = client.get_session().await.json().await.unwrap();
    assert_eq!(session["role"], "user");
}

#[tokio::test]
async fn signup_with_a_taken_email_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.signup(TEST_USER, "whatever123").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_works_via_authorization_header() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let login: Value = client
        .login(TEST_USER, TEST_PASS)
        .await
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap().to_string();

    // plain client without cookies, token in the header
    let bare = reqwest::Client::new();
    let response = bare
        .get(format!("{}/v1/library/artists", server.base_url))
        .header("Authorization", token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
