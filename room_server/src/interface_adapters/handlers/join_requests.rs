use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use crate::domain::events::RoomSnapshot;
use crate::domain::{JoinRequest, JoinRequestId};
use crate::interface_adapters::handlers::rooms::parse_room_id;
use crate::interface_adapters::http::{ActingUser, ApiError, map_game_error};
use crate::interface_adapters::protocol::{CreateJoinRequestRequest, PendingRequestsResponse};
use crate::interface_adapters::state::AppState;

fn parse_request_id(raw: &str) -> Result<JoinRequestId, ApiError> {
    JoinRequestId::parse(raw).map_err(map_game_error)
}

#[tracing::instrument(name = "list_join_requests", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn list_join_requests(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<PendingRequestsResponse>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let requests = state
        .join_requests
        .pending_requests(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(PendingRequestsResponse { requests }))
}

#[tracing::instrument(name = "create_join_request", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn create_join_request(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
    body: Option<Json<CreateJoinRequestRequest>>,
) -> Result<(StatusCode, Json<JoinRequest>), ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let request = state
        .join_requests
        .create(room_id, user.0, body.message)
        .await
        .map_err(map_game_error)?;

    Ok((StatusCode::CREATED, Json(request)))
}

#[tracing::instrument(name = "cancel_join_request", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn cancel_join_request(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<JoinRequest>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let request = state
        .join_requests
        .cancel(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(request))
}

#[tracing::instrument(name = "accept_join_request", skip_all, fields(request_id = %request_id, user_id = %user.0))]
pub async fn accept_join_request(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(request_id): Path<String>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let request_id = parse_request_id(&request_id)?;
    let room = state
        .join_requests
        .accept(request_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(RoomSnapshot::from(&room)))
}

#[tracing::instrument(name = "reject_join_request", skip_all, fields(request_id = %request_id, user_id = %user.0))]
pub async fn reject_join_request(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(request_id): Path<String>,
) -> Result<Json<JoinRequest>, ApiError> {
    let request_id = parse_request_id(&request_id)?;
    let request = state
        .join_requests
        .reject(request_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(request))
}
