//! Search API routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, ApiJson, ApiResult};
use super::metrics::record_search;
use super::session::Session;
use super::state::{GuardedSearchManager, ServerState};
use crate::search::search_models::SuggestionRequest;
use crate::user::Permission;

const FORBIDDEN_SUGGESTIONS: &str = "No tienes permisos para gestionar sugerencias";

#[derive(Deserialize)]
struct SearchQuery {
    pub q: Option<String>,
}

async fn search(
    session: Option<Session>,
    State(search_manager): State<GuardedSearchManager>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Response> {
    let user_id = session.map(|s| s.user_id);
    let results = search_manager.search(user_id, query.q.as_deref())?;
    record_search(user_id.is_some());
    Ok(Json(results).into_response())
}

async fn get_suggestions(
    State(search_manager): State<GuardedSearchManager>,
) -> ApiResult<Response> {
    let suggestions: Vec<_> = search_manager
        .suggestions()?
        .into_iter()
        .map(|s| json!({ "termino": s.term, "categoria": s.category }))
        .collect();
    Ok(Json(json!({ "sugerencias": suggestions })).into_response())
}

async fn post_suggestion(
    session: Session,
    State(search_manager): State<GuardedSearchManager>,
    ApiJson(body): ApiJson<SuggestionRequest>,
) -> ApiResult<Response> {
    if !session.has_permission(Permission::ManageSuggestions) {
        return Err(ApiError::Forbidden(FORBIDDEN_SUGGESTIONS.to_string()));
    }
    let suggestion = search_manager.add_suggestion(body)?;
    Ok((StatusCode::CREATED, Json(suggestion)).into_response())
}

async fn get_history(
    session: Session,
    State(search_manager): State<GuardedSearchManager>,
) -> ApiResult<Response> {
    let history = search_manager.history(session.user_id)?;
    Ok(Json(json!({
        "total": history.len(),
        "historial": history,
    }))
    .into_response())
}

async fn get_popular_terms(
    State(search_manager): State<GuardedSearchManager>,
) -> ApiResult<Response> {
    let terms: Vec<_> = search_manager
        .popular_terms()?
        .into_iter()
        .map(|entry| json!({ "termino": entry.term, "frecuencia": entry.frequency }))
        .collect();
    Ok(Json(json!({ "populares": terms })).into_response())
}

pub fn make_search_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(search))
        .route("/sugerencias", get(get_suggestions).post(post_suggestion))
        .route("/historial", get(get_history))
        .route("/populares", get(get_popular_terms))
        .with_state(state)
}
