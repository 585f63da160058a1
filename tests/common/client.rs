//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for the server's endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    ///
    /// Use this for testing authentication flows. For most tests, use
    /// `authenticated()` or `authenticated_admin()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as a regular user.
    pub async fn authenticated(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(TEST_USER, TEST_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as an admin user.
    pub async fn authenticated_admin(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(ADMIN_USER, ADMIN_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Admin authentication failed: {:?}",
            response.text().await
        );

        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/signup
    pub async fn signup(&self, email: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/signup", self.base_url))
            .json(&json!({
                "email": email,
                "password": password,
                "display_name": "Signup Test"
            }))
            .send()
            .await
            .expect("Signup request failed")
    }

    /// POST /v1/auth/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /v1/auth/session
    pub async fn get_session(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/session", self.base_url))
            .send()
            .await
            .expect("Get session request failed")
    }

    // ========================================================================
    // Library Endpoints
    // ========================================================================

    /// GET an arbitrary path under the base URL.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET a path and parse the JSON body.
    pub async fn get_json(&self, path: &str) -> Value {
        let response = self.get(path).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "GET {} failed",
            path
        );
        response.json().await.expect("Invalid JSON body")
    }

    pub async fn get_artists(&self) -> Response {
        self.get("/v1/library/artists").await
    }

    pub async fn get_albums(&self) -> Response {
        self.get("/v1/library/albums").await
    }

    pub async fn get_resolved_album(&self, id: &str) -> Response {
        self.get(&format!("/v1/library/album/{}/resolved", id)).await
    }

    pub async fn get_songs(&self) -> Response {
        self.get("/v1/library/songs").await
    }

    pub async fn get_songs_by_bpm_range(&self, min: u16, max: u16) -> Response {
        self.get(&format!(
            "/v1/library/songs/bpm-range?min={}&max={}",
            min, max
        ))
        .await
    }

    pub async fn search_songs(&self, title: &str) -> Response {
        self.get(&format!("/v1/library/songs/search?title={}", title))
            .await
    }

    pub async fn get_bpm_legend(&self) -> Response {
        self.get("/v1/library/bpm-legend").await
    }

    // ========================================================================
    // Admin Endpoints
    // ========================================================================

    /// POST /v1/admin/artist
    pub async fn create_artist(&self, name: &str) -> Response {
        self.client
            .post(format!("{}/v1/admin/artist", self.base_url))
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("Create artist request failed")
    }

    /// POST /v1/admin/genre
    pub async fn create_genre(&self, name: &str, description: Option<&str>) -> Response {
        self.client
            .post(format!("{}/v1/admin/genre", self.base_url))
            .json(&json!({ "name": name, "description": description }))
            .send()
            .await
            .expect("Create genre request failed")
    }

    /// POST /v1/admin/album with an album draft body
    pub async fn create_album(&self, draft: &Value) -> Response {
        self.client
            .post(format!("{}/v1/admin/album", self.base_url))
            .json(draft)
            .send()
            .await
            .expect("Create album request failed")
    }

    /// PUT /v1/admin/album/{id} with an album draft body
    pub async fn update_album(&self, id: &str, draft: &Value) -> Response {
        self.client
            .put(format!("{}/v1/admin/album/{}", self.base_url, id))
            .json(draft)
            .send()
            .await
            .expect("Update album request failed")
    }

    /// DELETE /v1/admin/album/{id}
    pub async fn delete_album(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/admin/album/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete album request failed")
    }

    /// POST /v1/admin/song with a song draft body
    pub async fn create_song(&self, draft: &Value) -> Response {
        self.client
            .post(format!("{}/v1/admin/song", self.base_url))
            .json(draft)
            .send()
            .await
            .expect("Create song request failed")
    }

    /// PUT /v1/admin/song/{id} with a song draft body
    pub async fn update_song(&self, id: &str, draft: &Value) -> Response {
        self.client
            .put(format!("{}/v1/admin/song/{}", self.base_url, id))
            .json(draft)
            .send()
            .await
            .expect("Update song request failed")
    }

    /// DELETE /v1/admin/song/{id}
    pub async fn delete_song(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/admin/song/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete song request failed")
    }
}
