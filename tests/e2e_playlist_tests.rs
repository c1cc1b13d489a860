//! End-to-end tests for playlists, their visibility and song ordering

mod common;

use common::{
    TestClient, TestServer, PRIVATE_PLAYLIST_TITLE, PUBLIC_PLAYLIST_TITLE,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn song_ids(playlist: &Value) -> Vec<u64> {
    playlist["canciones"]
        .as_array()
        .unwrap()
        .iter()
        .map(|song| song["cancion_id"].as_u64().unwrap())
        .collect()
}

fn ids(raw: &[usize]) -> Vec<u64> {
    raw.iter().map(|id| *id as u64).collect()
}

#[tokio::test]
async fn test_anonymous_sees_only_public_playlists() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let playlists: Vec<Value> = client.list_playlists().await.json().await.unwrap();
    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0]["titulo"], PUBLIC_PLAYLIST_TITLE);
    assert_eq!(playlists[0]["es_publica"], true);
    assert_eq!(playlists[0]["total_canciones"], 2);

    let response = client.get_playlist(server.ids.private_playlist_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get_playlist_songs(server.ids.private_playlist_id)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_sees_private_playlists() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let playlists: Vec<Value> = client.list_playlists().await.json().await.unwrap();
    assert_eq!(playlists.len(), 2);

    let response = client.get_playlist(server.ids.private_playlist_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let playlist: Value = response.json().await.unwrap();
    assert_eq!(playlist["titulo"], PRIVATE_PLAYLIST_TITLE);
    assert_eq!(song_ids(&playlist), ids(&[server.ids.ballad_song_id]));

    let response = client
        .get_playlist_songs(server.ids.private_playlist_id)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["playlist"]["es_publica"], false);
    assert_eq!(body["total_canciones"], 1);

    // Other users cannot see it
    let other = TestClient::authenticated_other(server.base_url.clone()).await;
    let playlists: Vec<Value> = other.list_playlists().await.json().await.unwrap();
    assert_eq!(playlists.len(), 1);
}

#[tokio::test]
async fn test_new_playlist_is_empty_and_public_by_default() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_other(server.base_url.clone()).await;

    let response = client
        .create_playlist(json!({ "titulo": "Gym Mix" }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Playlist creada exitosamente");
    assert_eq!(body["playlist"]["es_publica"], true);
    assert_eq!(body["playlist"]["total_canciones"], 0);
    assert_eq!(body["playlist"]["canciones"], json!([]));
    assert_eq!(body["playlist"]["usuario_id"], server.ids.other_user_id);

    let response = client.create_playlist(json!({ "titulo": "" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_owner_can_edit_playlist() {
    let server = TestServer::spawn().await;
    let other = TestClient::authenticated_other(server.base_url.clone()).await;
    let playlist_id = server.ids.public_playlist_id;

    let response = other
        .patch_playlist(playlist_id, json!({ "titulo": "Hijacked" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = other
        .add_song_to_playlist(playlist_id, server.ids.ballad_song_id, None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = other
        .remove_song_from_playlist(playlist_id, server.ids.rock_song_id)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = other.delete_playlist(playlist_id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_patch_can_make_playlist_private() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .patch_playlist(server.ids.public_playlist_id, json!({ "es_publica": false }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let playlist: Value = response.json().await.unwrap();
    assert_eq!(playlist["es_publica"], false);
    assert_eq!(playlist["titulo"], PUBLIC_PLAYLIST_TITLE);

    let anonymous = TestClient::new(server.base_url.clone());
    let playlists: Vec<Value> = anonymous.list_playlists().await.json().await.unwrap();
    assert!(playlists.is_empty());
}

#[tokio::test]
async fn test_add_song_appends_or_inserts() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let playlist_id = server.ids.public_playlist_id;

    let response = client
        .add_song_to_playlist(playlist_id, server.ids.ballad_song_id, Some(0))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["playlist_cancion"]["orden"], 0);
    assert_eq!(body["playlist_cancion"]["cancion"], server.ids.ballad_song_id);
    assert_eq!(body["playlist_cancion"]["playlist_titulo"], PUBLIC_PLAYLIST_TITLE);

    let playlist: Value = client.get_playlist(playlist_id).await.json().await.unwrap();
    assert_eq!(
        song_ids(&playlist),
        ids(&[
            server.ids.ballad_song_id,
            server.ids.rock_song_id,
            server.ids.jazz_song_id
        ])
    );

    // Adding the same song twice is rejected
    let response = client
        .add_song_to_playlist(playlist_id, server.ids.ballad_song_id, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .add_song_to_playlist(playlist_id, 9999, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_song_resequences() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let playlist_id = server.ids.public_playlist_id;

    let response = client
        .remove_song_from_playlist(playlist_id, server.ids.rock_song_id)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Canción eliminada de la playlist exitosamente");

    let response = client
        .remove_song_from_playlist(playlist_id, server.ids.rock_song_id)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The remaining song moved up to the first slot
    let response = client
        .add_song_to_playlist(playlist_id, server.ids.ballad_song_id, None)
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["playlist_cancion"]["orden"], 1);
}

#[tokio::test]
async fn test_reorder_moves_last_song_first() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let playlist_id = server.ids.public_playlist_id;
    let (a, b, c) = (
        server.ids.rock_song_id,
        server.ids.jazz_song_id,
        server.ids.ballad_song_id,
    );

    client.add_song_to_playlist(playlist_id, c, None).await;

    let response = client
        .reorder_playlist(playlist_id, &[(c, 0), (a, 1), (b, 2)])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "3 canciones reordenadas exitosamente");
    assert_eq!(body["canciones_actualizadas"], 3);
    assert!(body.get("errores").is_none());

    let playlist: Value = client.get_playlist(playlist_id).await.json().await.unwrap();
    assert_eq!(song_ids(&playlist), ids(&[c, a, b]));
}

#[tokio::test]
async fn test_reorder_reports_songs_not_in_playlist() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let playlist_id = server.ids.public_playlist_id;

    let response = client
        .reorder_playlist(
            playlist_id,
            &[(server.ids.jazz_song_id, 0), (server.ids.ballad_song_id, 1)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["canciones_actualizadas"], 1);
    assert_eq!(
        body["errores"],
        json!([format!(
            "Canción {} no está en la playlist",
            server.ids.ballad_song_id
        )])
    );

    let playlist: Value = client.get_playlist(playlist_id).await.json().await.unwrap();
    assert_eq!(
        song_ids(&playlist),
        ids(&[server.ids.jazz_song_id, server.ids.rock_song_id])
    );

    let response = client.reorder_playlist(playlist_id, &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_playlists_split_by_visibility() {
    let server = TestServer::spawn().await;

    let owner = TestClient::authenticated(server.base_url.clone()).await;
    let body: Value = owner
        .get_user_playlists(server.ids.user_id)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["total_playlists"], 2);
    assert_eq!(body["playlists_publicas"]["total"], 1);
    assert_eq!(body["playlists_privadas"]["total"], 1);

    let anonymous = TestClient::new(server.base_url.clone());
    let body: Value = anonymous
        .get_user_playlists(server.ids.user_id)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["total_playlists"], 1);
    assert!(body.get("playlists_privadas").is_none());

    let response = anonymous.get_user_playlists(9999).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_playlist_entries_follow_visibility() {
    let server = TestServer::spawn().await;

    let anonymous = TestClient::new(server.base_url.clone());
    let entries: Vec<Value> = anonymous
        .list_playlist_entries()
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|e| e["playlist"] == server.ids.public_playlist_id));

    let owner = TestClient::authenticated(server.base_url.clone()).await;
    let entries: Vec<Value> = owner.list_playlist_entries().await.json().await.unwrap();
    assert_eq!(entries.len(), 3);
}

#[tokio::test]
async fn test_delete_playlist() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.delete_playlist(server.ids.public_playlist_id).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.get_playlist(server.ids.public_playlist_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Songs are untouched
    let response = client.get_song(server.ids.rock_song_id).await;
    assert_eq!(response.status(), StatusCode::OK);
}
