// Shared HTTP plumbing: error payloads and the acting-user extractor.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use serde::Serialize;

use crate::domain::{ErrorKind, GameError, UserId};

// Header set by the upstream auth layer.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    // Stable machine-readable code, e.g. "room_full".
    pub code: &'static str,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, code: &'static str, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code,
            message: message.to_string(),
        }),
    )
}

pub fn map_game_error(err: GameError) -> ApiError {
    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Dependency => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.code(), &err.to_string())
}

/// The user performing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub UserId);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(|id| ActingUser(UserId(id)))
            .ok_or_else(|| {
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "unauthenticated",
                    "missing or invalid user identity",
                )
            })
    }
}
