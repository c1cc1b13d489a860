//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all soundclone-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
///
/// Logging in stores the `access_token` cookie, so every later request of
/// the same client is authenticated without an Authorization header.
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` or `authenticated_admin()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle the access token cookie
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn authenticated_as(base_url: String, email: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(email, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Authentication as {} failed: {:?}",
            email,
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as the regular test user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_EMAIL, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the second regular user
    pub async fn authenticated_other(base_url: String) -> Self {
        Self::authenticated_as(base_url, OTHER_EMAIL, OTHER_PASS).await
    }

    /// Creates a client pre-authenticated as an admin user
    ///
    /// Use this for testing admin-only endpoints.
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated_as(base_url, ADMIN_EMAIL, ADMIN_PASS).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn send_json(&self, method: reqwest::Method, path: &str, body: Value) -> Response {
        self.client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .expect("JSON request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    // ========================================================================
    // Server Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /api/auth/register
    pub async fn register(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::POST, "/api/auth/register", body)
            .await
    }

    /// POST /api/auth/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.send_json(
            reqwest::Method::POST,
            "/api/auth/login",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// GET /api/auth/profile
    pub async fn get_profile(&self) -> Response {
        self.get("/api/auth/profile").await
    }

    /// PATCH /api/auth/update-info
    pub async fn update_info(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::PATCH, "/api/auth/update-info", body)
            .await
    }

    /// POST /api/auth/logout
    pub async fn logout(&self, refresh: &str) -> Response {
        self.send_json(
            reqwest::Method::POST,
            "/api/auth/logout",
            json!({ "refresh": refresh }),
        )
        .await
    }

    /// POST /api/auth/token/refresh
    pub async fn refresh_token(&self, refresh: &str) -> Response {
        self.send_json(
            reqwest::Method::POST,
            "/api/auth/token/refresh",
            json!({ "refresh": refresh }),
        )
        .await
    }

    /// GET /api/auth/usuarios/{id}/nombre
    pub async fn get_user_name(&self, user_id: usize) -> Response {
        self.get(&format!("/api/auth/usuarios/{}/nombre", user_id))
            .await
    }

    // ========================================================================
    // Song Endpoints
    // ========================================================================

    /// GET /api/contenido/canciones
    pub async fn list_songs(&self) -> Response {
        self.get("/api/contenido/canciones").await
    }

    /// POST /api/contenido/canciones
    pub async fn create_song(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::POST, "/api/contenido/canciones", body)
            .await
    }

    /// GET /api/contenido/canciones/{id}
    pub async fn get_song(&self, song_id: usize) -> Response {
        self.get(&format!("/api/contenido/canciones/{}", song_id))
            .await
    }

    /// PUT /api/contenido/canciones/{id}
    pub async fn replace_song(&self, song_id: usize, body: Value) -> Response {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/api/contenido/canciones/{}", song_id),
            body,
        )
        .await
    }

    /// PATCH /api/contenido/canciones/{id}
    pub async fn patch_song(&self, song_id: usize, body: Value) -> Response {
        self.send_json(
            reqwest::Method::PATCH,
            &format!("/api/contenido/canciones/{}", song_id),
            body,
        )
        .await
    }

    /// DELETE /api/contenido/canciones/{id}
    pub async fn delete_song(&self, song_id: usize) -> Response {
        self.delete(&format!("/api/contenido/canciones/{}", song_id))
            .await
    }

    /// POST /api/contenido/canciones/{id}/reproducir
    pub async fn play_song(&self, song_id: usize) -> Response {
        self.send_json(
            reqwest::Method::POST,
            &format!("/api/contenido/canciones/{}/reproducir", song_id),
            json!({}),
        )
        .await
    }

    /// GET /api/contenido/canciones/buscar?q=
    pub async fn search_songs(&self, term: &str) -> Response {
        self.client
            .get(self.url("/api/contenido/canciones/buscar"))
            .query(&[("q", term)])
            .send()
            .await
            .expect("Song search request failed")
    }

    // ========================================================================
    // Album Endpoints
    // ========================================================================

    /// GET /api/contenido/albums
    pub async fn list_albums(&self) -> Response {
        self.get("/api/contenido/albums").await
    }

    /// POST /api/contenido/albums
    pub async fn create_album(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::POST, "/api/contenido/albums", body)
            .await
    }

    /// GET /api/contenido/albums/{id}
    pub async fn get_album(&self, album_id: usize) -> Response {
        self.get(&format!("/api/contenido/albums/{}", album_id))
            .await
    }

    /// PATCH /api/contenido/albums/{id}
    pub async fn patch_album(&self, album_id: usize, body: Value) -> Response {
        self.send_json(
            reqwest::Method::PATCH,
            &format!("/api/contenido/albums/{}", album_id),
            body,
        )
        .await
    }

    /// DELETE /api/contenido/albums/{id}
    pub async fn delete_album(&self, album_id: usize) -> Response {
        self.delete(&format!("/api/contenido/albums/{}", album_id))
            .await
    }

    /// GET /api/contenido/albums/{id}/canciones
    pub async fn get_album_songs(&self, album_id: usize) -> Response {
        self.get(&format!("/api/contenido/albums/{}/canciones", album_id))
            .await
    }

    // ========================================================================
    // Playlist Endpoints
    // ========================================================================

    /// GET /api/contenido/playlists
    pub async fn list_playlists(&self) -> Response {
        self.get("/api/contenido/playlists").await
    }

    /// POST /api/contenido/playlists
    pub async fn create_playlist(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::POST, "/api/contenido/playlists", body)
            .await
    }

    /// GET /api/contenido/playlists/{id}
    pub async fn get_playlist(&self, playlist_id: usize) -> Response {
        self.get(&format!("/api/contenido/playlists/{}", playlist_id))
            .await
    }

    /// PATCH /api/contenido/playlists/{id}
    pub async fn patch_playlist(&self, playlist_id: usize, body: Value) -> Response {
        self.send_json(
            reqwest::Method::PATCH,
            &format!("/api/contenido/playlists/{}", playlist_id),
            body,
        )
        .await
    }

    /// DELETE /api/contenido/playlists/{id}
    pub async fn delete_playlist(&self, playlist_id: usize) -> Response {
        self.delete(&format!("/api/contenido/playlists/{}", playlist_id))
            .await
    }

    /// GET /api/contenido/playlists/{id}/canciones
    pub async fn get_playlist_songs(&self, playlist_id: usize) -> Response {
        self.get(&format!("/api/contenido/playlists/{}/canciones", playlist_id))
            .await
    }

    /// POST /api/contenido/playlists/{id}/agregar-cancion
    pub async fn add_song_to_playlist(
        &self,
        playlist_id: usize,
        song_id: usize,
        position: Option<i64>,
    ) -> Response {
        let mut body = json!({ "cancion_id": song_id });
        if let Some(position) = position {
            body["orden"] = json!(position);
        }
        self.send_json(
            reqwest::Method::POST,
            &format!("/api/contenido/playlists/{}/agregar-cancion", playlist_id),
            body,
        )
        .await
    }

    /// DELETE /api/contenido/playlists/{id}/canciones/{song_id}/eliminar
    pub async fn remove_song_from_playlist(&self, playlist_id: usize, song_id: usize) -> Response {
        self.delete(&format!(
            "/api/contenido/playlists/{}/canciones/{}/eliminar",
            playlist_id, song_id
        ))
        .await
    }

    /// PUT /api/contenido/playlists/{id}/reordenar
    pub async fn reorder_playlist(&self, playlist_id: usize, order: &[(usize, i64)]) -> Response {
        let items: Vec<Value> = order
            .iter()
            .map(|(song_id, position)| json!({ "cancion_id": song_id, "orden": position }))
            .collect();
        self.send_json(
            reqwest::Method::PUT,
            &format!("/api/contenido/playlists/{}/reordenar", playlist_id),
            json!({ "canciones_orden": items }),
        )
        .await
    }

    /// GET /api/contenido/playlist-canciones
    pub async fn list_playlist_entries(&self) -> Response {
        self.get("/api/contenido/playlist-canciones").await
    }

    // ========================================================================
    // Per-user Endpoints
    // ========================================================================

    /// GET /api/contenido/usuarios/{id}/playlists
    pub async fn get_user_playlists(&self, user_id: usize) -> Response {
        self.get(&format!("/api/contenido/usuarios/{}/playlists", user_id))
            .await
    }

    /// GET /api/contenido/usuarios/{id}/canciones
    pub async fn get_user_songs(&self, user_id: usize) -> Response {
        self.get(&format!("/api/contenido/usuarios/{}/canciones", user_id))
            .await
    }

    /// GET /api/contenido/usuarios/{id}/interacciones?tipo=
    pub async fn get_user_interactions(&self, user_id: usize, tipo: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(&format!(
            "/api/contenido/usuarios/{}/interacciones",
            user_id
        )));
        if let Some(tipo) = tipo {
            request = request.query(&[("tipo", tipo)]);
        }
        request
            .send()
            .await
            .expect("User interactions request failed")
    }

    // ========================================================================
    // Interaction Endpoints
    // ========================================================================

    /// POST /api/contenido/interacciones
    pub async fn create_interaction(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::POST, "/api/contenido/interacciones", body)
            .await
    }

    /// POST /api/contenido/interacciones/toggle
    pub async fn toggle_interaction(&self, body: Value) -> Response {
        self.send_json(
            reqwest::Method::POST,
            "/api/contenido/interacciones/toggle",
            body,
        )
        .await
    }

    /// DELETE /api/contenido/interacciones/{id}
    pub async fn delete_interaction(&self, interaction_id: usize) -> Response {
        self.delete(&format!("/api/contenido/interacciones/{}", interaction_id))
            .await
    }

    // ========================================================================
    // Search Endpoints
    // ========================================================================

    /// GET /api/buscar?q=
    pub async fn search(&self, term: &str) -> Response {
        self.client
            .get(self.url("/api/buscar"))
            .query(&[("q", term)])
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /api/buscar/sugerencias
    pub async fn get_suggestions(&self) -> Response {
        self.get("/api/buscar/sugerencias").await
    }

    /// POST /api/buscar/sugerencias
    pub async fn add_suggestion(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::POST, "/api/buscar/sugerencias", body)
            .await
    }

    /// GET /api/buscar/historial
    pub async fn get_search_history(&self) -> Response {
        self.get("/api/buscar/historial").await
    }

    /// GET /api/buscar/populares
    pub async fn get_popular_terms(&self) -> Response {
        self.get("/api/buscar/populares").await
    }
}
