//! Account, login and token endpoints under `/api/auth`

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::error::{ApiError, ApiJson, ApiPath, ApiResult, RowId};
use super::metrics::record_login_attempt;
use super::session::{Session, COOKIE_ACCESS_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::user::{AuthError, RegisterRequest, TokenPair, UserDisplayName, UserUpdate};

const LOGOUT_ERROR_MESSAGE: &str = "Error en logout";

#[derive(Deserialize)]
struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    pub refresh: Option<String>,
}

fn access_token_cookie(token: &str, user_manager: &GuardedUserManager) -> Cookie<'static> {
    let max_age = user_manager.token_issuer().access_lifetime().num_seconds();
    Cookie::build((COOKIE_ACCESS_TOKEN_KEY, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

fn expired_access_token_cookie() -> Cookie<'static> {
    Cookie::build((COOKIE_ACCESS_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build()
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<Response> {
    let (user, tokens) = user_manager.register(body)?;
    let jar = jar.add(access_token_cookie(&tokens.access, &user_manager));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({
            "message": "Usuario registrado exitosamente",
            "user": user,
            "refresh": tokens.refresh,
            "access": tokens.access,
        })),
    )
        .into_response())
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginBody>,
) -> ApiResult<Response> {
    debug!("login() called for {}", body.email);
    let start = Instant::now();
    let (user, tokens) = match user_manager.login(body.email.trim(), &body.password) {
        Ok(result) => {
            record_login_attempt("success", start.elapsed());
            result
        }
        Err(err) => {
            record_login_attempt("failure", start.elapsed());
            return Err(err.into());
        }
    };

    let jar = jar.add(access_token_cookie(&tokens.access, &user_manager));
    Ok((
        jar,
        Json(json!({
            "message": "Login exitoso",
            "user": user,
            "refresh": tokens.refresh,
            "access": tokens.access,
        })),
    )
        .into_response())
}

async fn get_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> ApiResult<Response> {
    let user = user_manager.require_user(session.user_id)?;
    Ok(Json(user).into_response())
}

async fn update_info(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> ApiResult<Response> {
    let user = user_manager.update_info(session.user_id, body)?;
    info!("User {} updated profile", session.user_id);
    Ok(Json(json!({
        "message": "Perfil actualizado exitosamente",
        "user": user,
    }))
    .into_response())
}

async fn logout(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    ApiJson(body): ApiJson<RefreshBody>,
) -> ApiResult<Response> {
    let Some(refresh) = body.refresh.filter(|r| !r.is_empty()) else {
        return Err(ApiError::BadRequest(LOGOUT_ERROR_MESSAGE.to_string()));
    };
    if let Err(err) = user_manager.logout(session.user_id, &refresh) {
        return match err.downcast::<AuthError>() {
            Ok(_) => Err(ApiError::BadRequest(LOGOUT_ERROR_MESSAGE.to_string())),
            Err(err) => Err(ApiError::Internal(err)),
        };
    }

    let jar = jar.add(expired_access_token_cookie());
    Ok((jar, Json(json!({ "message": "Logout exitoso" }))).into_response())
}

async fn refresh_token(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    ApiJson(body): ApiJson<RefreshBody>,
) -> ApiResult<Response> {
    let Some(refresh) = body.refresh.filter(|r| !r.is_empty()) else {
        return Err(ApiError::Unauthorized(AuthError::InvalidToken.to_string()));
    };
    let tokens: TokenPair = match user_manager.refresh(&refresh) {
        Ok(tokens) => tokens,
        Err(err) => {
            return match err.downcast::<AuthError>() {
                Ok(auth_error) => Err(ApiError::Unauthorized(auth_error.to_string())),
                Err(err) => Err(ApiError::Internal(err)),
            }
        }
    };

    let jar = jar.add(access_token_cookie(&tokens.access, &user_manager));
    Ok((jar, Json(tokens)).into_response())
}

async fn get_user_name(
    State(user_manager): State<GuardedUserManager>,
    ApiPath(RowId(user_id)): ApiPath<RowId>,
) -> ApiResult<Response> {
    let user = user_manager.require_user(user_id)?;
    Ok(Json(UserDisplayName {
        user_id: user.user_id,
        nombre: user.display_name,
    })
    .into_response())
}

pub fn make_auth_routes(state: ServerState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(get_profile))
        .route("/update-info", put(update_info).patch(update_info))
        .route("/logout", post(logout))
        .route("/token/refresh", post(refresh_token))
        .route("/usuarios/{id}/nombre", get(get_user_name))
        .with_state(state)
}
