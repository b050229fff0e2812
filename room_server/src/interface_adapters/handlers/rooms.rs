use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use crate::domain::events::RoomSnapshot;
use crate::domain::{Answer, AnswerAction, GameError, Question, QuestionId, RoomId};
use crate::interface_adapters::http::{ActingUser, ApiError, map_game_error};
use crate::interface_adapters::protocol::{
    CreateRoomRequest, DeleteRoomResponse, RoomStateResponse, SetCategoriesRequest,
    SubmitAnswerRequest, TypingResponse,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{CreateRoomInput, SubmitAnswerInput};

pub(crate) fn parse_room_id(raw: &str) -> Result<RoomId, ApiError> {
    RoomId::parse(raw).map_err(map_game_error)
}

#[tracing::instrument(name = "create_room", skip_all, fields(user_id = %user.0))]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    body: Option<Json<CreateRoomRequest>>,
) -> Result<(StatusCode, Json<RoomSnapshot>), ApiError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let room = state
        .rooms
        .create_room(
            user.0,
            CreateRoomInput {
                language: body.language,
                max_questions: body.max_questions,
            },
        )
        .await
        .map_err(map_game_error)?;

    Ok((StatusCode::CREATED, Json(RoomSnapshot::from(&room))))
}

#[tracing::instrument(name = "room_state", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn room_state(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomStateResponse>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let view = state
        .rooms
        .room_state(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(view.into()))
}

#[tracing::instrument(name = "delete_room", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<DeleteRoomResponse>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    state
        .rooms
        .delete_room(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(DeleteRoomResponse { deleted: true }))
}

#[tracing::instrument(name = "join_room", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let room = state
        .rooms
        .join_direct(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(RoomSnapshot::from(&room)))
}

#[tracing::instrument(name = "leave_room", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let room = state
        .rooms
        .leave_as_guest(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(RoomSnapshot::from(&room)))
}

#[tracing::instrument(name = "set_ready", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn set_ready(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let room = state
        .rooms
        .set_guest_ready(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(RoomSnapshot::from(&room)))
}

#[tracing::instrument(name = "start_game", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn start_game(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let room = state
        .rooms
        .start_game(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(RoomSnapshot::from(&room)))
}

#[tracing::instrument(name = "set_categories", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn set_categories(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
    Json(body): Json<SetCategoriesRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let room = state
        .rooms
        .set_selected_categories(room_id, user.0, body.category_ids)
        .await
        .map_err(map_game_error)?;

    Ok(Json(RoomSnapshot::from(&room)))
}

#[tracing::instrument(
    name = "toggle_category",
    skip_all,
    fields(room_id = %room_id, category_id = %category_id, user_id = %user.0)
)]
pub async fn toggle_category(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path((room_id, category_id)): Path<(String, String)>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let category_id = category_id
        .trim()
        .parse::<i64>()
        .map_err(|_| map_game_error(GameError::InvalidCategory))?;
    let room = state
        .rooms
        .toggle_category(room_id, user.0, category_id)
        .await
        .map_err(map_game_error)?;

    Ok(Json(RoomSnapshot::from(&room)))
}

#[tracing::instrument(name = "draw_question", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn draw_question(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<Question>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let question = state
        .rooms
        .draw_question(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(question))
}

#[tracing::instrument(name = "next_question", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn next_question(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<Question>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let question = state
        .rooms
        .advance_to_next_question(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(question))
}

#[tracing::instrument(name = "submit_answer", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
    Json(body): Json<SubmitAnswerRequest>,
) -> Result<(StatusCode, Json<Answer>), ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let action =
        AnswerAction::parse(&body.action).ok_or_else(|| map_game_error(GameError::InvalidAnswer))?;
    let answer = state
        .rooms
        .submit_answer(
            room_id,
            user.0,
            SubmitAnswerInput {
                question_id: QuestionId(body.question_id),
                text: body.text,
                action,
            },
        )
        .await
        .map_err(map_game_error)?;

    Ok((StatusCode::CREATED, Json(answer)))
}

#[tracing::instrument(name = "finish_game", skip_all, fields(room_id = %room_id, user_id = %user.0))]
pub async fn finish_game(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let room = state
        .rooms
        .end_game(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(RoomSnapshot::from(&room)))
}

// Typing hints are high-volume; no span.
pub async fn typing(
    State(state): State<Arc<AppState>>,
    user: ActingUser,
    Path(room_id): Path<String>,
) -> Result<Json<TypingResponse>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    let broadcast = state
        .rooms
        .notify_typing(room_id, user.0)
        .await
        .map_err(map_game_error)?;

    Ok(Json(TypingResponse { broadcast }))
}
