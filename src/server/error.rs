//! JSON error responses

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de, Deserialize, Deserializer};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use super::metrics::record_internal_error;
use crate::content::ContentError;
use crate::user::AuthError;
use crate::validation::FieldErrors;

pub const INVALID_DATA_MESSAGE: &str = "Datos inválidos";
pub const INTERNAL_ERROR_MESSAGE: &str = "Error interno del servidor";
pub const RESOURCE_NOT_FOUND_MESSAGE: &str = "Recurso no encontrado";

/// Every failure a handler can answer with. Rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Datos inválidos")]
    Invalid(FieldErrors),

    #[error("Error interno del servidor")]
    Internal(anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(message) => ApiError::NotFound(message.to_string()),
            ContentError::Forbidden(message) => ApiError::Forbidden(message.to_string()),
            ContentError::BadRequest(message) => ApiError::BadRequest(message),
            ContentError::Invalid(errors) => ApiError::Invalid(errors),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::AccountDisabled => {
                ApiError::BadRequest(err.to_string())
            }
            AuthError::InvalidToken => ApiError::Unauthorized(err.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::Invalid(errors) => ApiError::Invalid(errors),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ContentError>() {
            Ok(content_error) => return content_error.into(),
            Err(err) => err,
        };
        match err.downcast::<AuthError>() {
            Ok(auth_error) => auth_error.into(),
            Err(err) => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "error": message })),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::Invalid(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": INVALID_DATA_MESSAGE, "detalles": errors }),
            ),
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                record_internal_error();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": INTERNAL_ERROR_MESSAGE }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// `Json` with malformed bodies reported through `ApiError`.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// `Path` whose segments cannot name a stored row answers 404.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                debug!("Rejected path {}: {}", parts.uri.path(), rejection.body_text());
                Err(ApiError::NotFound(RESOURCE_NOT_FOUND_MESSAGE.to_string()))
            }
        }
    }
}

/// Row id taken from a URL. SQLite keys are signed 64-bit integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowId(pub usize);

impl<'de> Deserialize<'de> for RowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = u64::deserialize(deserializer)?;
        if id > i64::MAX as u64 {
            return Err(de::Error::custom(format!("id {} out of range", id)));
        }
        usize::try_from(id)
            .map(RowId)
            .map_err(|_| de::Error::custom(format!("id {} out of range", id)))
    }
}
