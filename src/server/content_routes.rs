//! Songs, albums, playlists and interactions under `/api/contenido`

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{ApiJson, ApiPath, ApiResult, RowId};
use super::metrics::{record_interaction_toggle, record_song_play};
use super::session::Session;
use super::state::{GuardedContentManager, ServerState};
use crate::content::models::{
    AddSongRequest, AlbumInput, InteractionRequest, Playlist, PlaylistInput, ReorderRequest,
    SongInput, ToggleOutcome,
};
use crate::user::Permission;

#[derive(Deserialize)]
struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Deserialize)]
struct InteractionFilter {
    pub tipo: Option<String>,
}

fn created(body: Value) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

// Songs

async fn list_songs(State(content): State<GuardedContentManager>) -> ApiResult<Response> {
    Ok(Json(content.list_songs()?).into_response())
}

async fn post_song(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiJson(body): ApiJson<SongInput>,
) -> ApiResult<Response> {
    session.require_permission(Permission::PublishContent)?;
    let song = content.create_song(session.user_id, body)?;
    Ok(created(json!({
        "message": "Canción creada exitosamente",
        "cancion": song,
    })))
}

async fn get_song(
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    Ok(Json(content.get_song(id)?).into_response())
}

async fn put_song(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
    ApiJson(body): ApiJson<SongInput>,
) -> ApiResult<Response> {
    Ok(Json(content.update_song(session.user_id, id, body, false)?).into_response())
}

async fn patch_song(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
    ApiJson(body): ApiJson<SongInput>,
) -> ApiResult<Response> {
    Ok(Json(content.update_song(session.user_id, id, body, true)?).into_response())
}

async fn delete_song(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    content.delete_song(session.user_id, id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn play_song(
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    let plays = content.play_song(id)?;
    record_song_play();
    Ok(Json(json!({
        "cancion_id": id,
        "reproducciones": plays,
    }))
    .into_response())
}

async fn search_songs(
    State(content): State<GuardedContentManager>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Response> {
    let (term, songs) = content.search_songs(query.q.as_deref())?;
    Ok(Json(json!({
        "termino_busqueda": term,
        "total_resultados": songs.len(),
        "resultados": songs,
    }))
    .into_response())
}

// Albums

async fn list_albums(State(content): State<GuardedContentManager>) -> ApiResult<Response> {
    Ok(Json(content.list_albums()?).into_response())
}

async fn post_album(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiJson(body): ApiJson<AlbumInput>,
) -> ApiResult<Response> {
    session.require_permission(Permission::PublishContent)?;
    let album = content.create_album(session.user_id, body)?;
    Ok(created(json!({
        "message": "Album creado exitosamente",
        "album": album,
    })))
}

async fn get_album(
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    Ok(Json(content.get_album(id)?).into_response())
}

async fn put_album(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
    ApiJson(body): ApiJson<AlbumInput>,
) -> ApiResult<Response> {
    Ok(Json(content.update_album(session.user_id, id, body, false)?).into_response())
}

async fn patch_album(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
    ApiJson(body): ApiJson<AlbumInput>,
) -> ApiResult<Response> {
    Ok(Json(content.update_album(session.user_id, id, body, true)?).into_response())
}

async fn delete_album(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    content.delete_album(session.user_id, id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn get_album_songs(
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    Ok(Json(content.album_songs(id)?).into_response())
}

// Playlists

async fn list_playlists(
    session: Option<Session>,
    State(content): State<GuardedContentManager>,
) -> ApiResult<Response> {
    let viewer = session.map(|s| s.user_id);
    Ok(Json(content.list_playlists(viewer)?).into_response())
}

async fn post_playlist(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiJson(body): ApiJson<PlaylistInput>,
) -> ApiResult<Response> {
    session.require_permission(Permission::PublishContent)?;
    let playlist = content.create_playlist(session.user_id, body)?;
    Ok(created(json!({
        "message": "Playlist creada exitosamente",
        "playlist": playlist,
    })))
}

async fn get_playlist(
    session: Option<Session>,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    let viewer = session.map(|s| s.user_id);
    Ok(Json(content.get_playlist(viewer, id)?).into_response())
}

async fn put_playlist(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
    ApiJson(body): ApiJson<PlaylistInput>,
) -> ApiResult<Response> {
    Ok(Json(content.update_playlist(session.user_id, id, body, false)?).into_response())
}

async fn patch_playlist(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
    ApiJson(body): ApiJson<PlaylistInput>,
) -> ApiResult<Response> {
    Ok(Json(content.update_playlist(session.user_id, id, body, true)?).into_response())
}

async fn delete_playlist(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    content.delete_playlist(session.user_id, id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn get_playlist_songs(
    session: Option<Session>,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    let viewer = session.map(|s| s.user_id);
    Ok(Json(content.playlist_songs(viewer, id)?).into_response())
}

async fn add_playlist_song(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
    ApiJson(body): ApiJson<AddSongRequest>,
) -> ApiResult<Response> {
    let entry = content.add_song_to_playlist(session.user_id, id, body)?;
    Ok(created(json!({
        "message": "Canción agregada a la playlist exitosamente",
        "playlist_cancion": entry,
    })))
}

async fn remove_playlist_song(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath((RowId(playlist_id), RowId(song_id))): ApiPath<(RowId, RowId)>,
) -> ApiResult<Response> {
    content.remove_song_from_playlist(session.user_id, playlist_id, song_id)?;
    Ok(Json(json!({
        "message": "Canción eliminada de la playlist exitosamente",
    }))
    .into_response())
}

async fn reorder_playlist(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
    ApiJson(body): ApiJson<ReorderRequest>,
) -> ApiResult<Response> {
    let outcome = content.reorder_playlist(session.user_id, id, body)?;
    let mut response = json!({
        "message": format!("{} canciones reordenadas exitosamente", outcome.updated),
        "canciones_actualizadas": outcome.updated,
    });
    if !outcome.missing_song_ids.is_empty() {
        let errors: Vec<String> = outcome
            .missing_song_ids
            .iter()
            .map(|song_id| format!("Canción {} no está en la playlist", song_id))
            .collect();
        response["errores"] = json!(errors);
    }
    Ok(Json(response).into_response())
}

async fn list_playlist_entries(
    session: Option<Session>,
    State(content): State<GuardedContentManager>,
) -> ApiResult<Response> {
    let viewer = session.map(|s| s.user_id);
    Ok(Json(content.playlist_entries(viewer)?).into_response())
}

// Per-user views

fn playlist_group(playlists: Vec<Playlist>) -> Value {
    json!({
        "total": playlists.len(),
        "playlists": playlists,
    })
}

async fn get_user_playlists(
    session: Option<Session>,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(user_id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    let viewer = session.map(|s| s.user_id);
    let playlists = content.user_playlists(viewer, user_id)?;
    let total = playlists.public.len() + playlists.private.len();
    let mut response = json!({
        "usuario_id": user_id,
        "total_playlists": total,
        "playlists_publicas": playlist_group(playlists.public),
    });
    if !playlists.private.is_empty() {
        response["playlists_privadas"] = playlist_group(playlists.private);
    }
    Ok(Json(response).into_response())
}

async fn get_user_songs(
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(user_id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    let (songs, stats) = content.user_songs(user_id)?;
    Ok(Json(json!({
        "usuario_id": user_id,
        "total_canciones": songs.len(),
        "estadisticas": stats,
        "canciones": songs,
    }))
    .into_response())
}

async fn get_user_interactions(
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(user_id)): ApiPath<RowId>,
    Query(filter): Query<InteractionFilter>,
) -> ApiResult<Response> {
    let (interactions, stats) = content.user_interactions(user_id, filter.tipo.as_deref())?;
    Ok(Json(json!({
        "usuario_id": user_id,
        "total_interacciones": interactions.len(),
        "estadisticas": stats,
        "interacciones": interactions,
    }))
    .into_response())
}

// Interactions

async fn post_interaction(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiJson(body): ApiJson<InteractionRequest>,
) -> ApiResult<Response> {
    session.require_permission(Permission::Interact)?;
    let interaction = content.create_interaction(session.user_id, body)?;
    Ok(created(json!({
        "message": format!("{} registrado exitosamente", interaction.kind.display_name()),
        "interaccion": interaction,
    })))
}

async fn delete_interaction(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiPath(RowId(id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    let kind = content.delete_interaction(session.user_id, id)?;
    Ok(Json(json!({
        "message": format!("{} eliminado exitosamente", kind.display_name()),
    }))
    .into_response())
}

async fn toggle_interaction(
    session: Session,
    State(content): State<GuardedContentManager>,
    ApiJson(body): ApiJson<InteractionRequest>,
) -> ApiResult<Response> {
    session.require_permission(Permission::Interact)?;
    let (kind, outcome) = content.toggle_interaction(session.user_id, body)?;
    let response = match outcome {
        ToggleOutcome::Removed => {
            record_interaction_toggle(kind.as_str(), "eliminado");
            Json(json!({
                "message": format!("{} eliminado", kind.display_name()),
                "accion": "eliminado",
                "activo": false,
            }))
            .into_response()
        }
        ToggleOutcome::Created(interaction) => {
            record_interaction_toggle(kind.as_str(), "creado");
            created(json!({
                "message": format!("{} agregado", kind.display_name()),
                "accion": "creado",
                "activo": true,
                "interaccion": interaction,
            }))
        }
    };
    Ok(response)
}

pub fn make_content_routes(state: ServerState) -> Router {
    Router::new()
        .route("/canciones", get(list_songs).post(post_song))
        .route("/canciones/buscar", get(search_songs))
        .route(
            "/canciones/{id}",
            get(get_song)
                .put(put_song)
                .patch(patch_song)
                .delete(delete_song),
        )
        .route("/canciones/{id}/reproducir", post(play_song))
        .route("/albums", get(list_albums).post(post_album))
        .route(
            "/albums/{id}",
            get(get_album)
                .put(put_album)
                .patch(patch_album)
                .delete(delete_album),
        )
        .route("/albums/{id}/canciones", get(get_album_songs))
        .route("/playlists", get(list_playlists).post(post_playlist))
        .route(
            "/playlists/{id}",
            get(get_playlist)
                .put(put_playlist)
                .patch(patch_playlist)
                .delete(delete_playlist),
        )
        .route("/playlists/{id}/canciones", get(get_playlist_songs))
        .route("/playlists/{id}/agregar-cancion", post(add_playlist_song))
        .route(
            "/playlists/{id}/canciones/{song_id}/eliminar",
            delete(remove_playlist_song),
        )
        .route("/playlists/{id}/reordenar", put(reorder_playlist))
        .route("/playlist-canciones", get(list_playlist_entries))
        .route("/usuarios/{id}/playlists", get(get_user_playlists))
        .route("/usuarios/{id}/canciones", get(get_user_songs))
        .route("/usuarios/{id}/interacciones", get(get_user_interactions))
        .route("/interacciones", post(post_interaction))
        .route("/interacciones/toggle", post(toggle_interaction))
        .route("/interacciones/{id}", delete(delete_interaction))
        .with_state(state)
}
