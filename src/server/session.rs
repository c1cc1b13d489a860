use super::error::ApiError;
use super::state::ServerState;
use crate::user::{AuthError, AuthenticatedUser, Permission};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use tracing::debug;

pub const COOKIE_ACCESS_TOKEN_KEY: &str = "access_token";
pub const MISSING_CREDENTIALS_MESSAGE: &str =
    "Las credenciales de autenticación no se proveyeron.";

pub const MISSING_PERMISSION_MESSAGE: &str = "No tienes permiso para realizar esta acción.";

const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: usize,
    pub permissions: &'static [Permission],
}

impl Session {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), ApiError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            debug!("User {} lacks {:?}", self.user_id, permission);
            Err(ApiError::Forbidden(MISSING_PERMISSION_MESSAGE.to_string()))
        }
    }
}

impl From<AuthenticatedUser> for Session {
    fn from(user: AuthenticatedUser) -> Self {
        Session {
            user_id: user.user_id,
            permissions: user.permissions,
        }
    }
}

fn extract_token_from_headers(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn extract_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_ACCESS_TOKEN_KEY)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

fn extract_access_token(parts: &Parts) -> Option<String> {
    extract_token_from_headers(parts).or_else(|| extract_token_from_cookies(parts))
}

fn authenticate(token: &str, ctx: &ServerState) -> Result<Session, ApiError> {
    match ctx.user_manager.authenticate(token) {
        Ok(user) => Ok(user.into()),
        Err(err) => match err.downcast::<AuthError>() {
            Ok(auth_error) => {
                debug!("Rejected access token: {}", auth_error);
                Err(ApiError::Unauthorized(auth_error.to_string()))
            }
            Err(err) => Err(ApiError::Internal(err)),
        },
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_access_token(parts) else {
            debug!("No access token in headers nor cookies.");
            return Err(ApiError::Unauthorized(
                MISSING_CREDENTIALS_MESSAGE.to_string(),
            ));
        };
        authenticate(&token, ctx)
    }
}

/// Anonymous access: a missing or unusable token yields `None`.
impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_access_token(parts).and_then(|token| authenticate(&token, ctx).ok()))
    }
}
