use serde::{Deserialize, Serialize};

use crate::domain::events::RoomSnapshot;
use crate::domain::{Answer, JoinRequest, Question};
use crate::use_cases::RoomStateView;

// Request payload for room creation. Both fields fall back to server defaults.
#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    pub language: Option<String>,
    pub max_questions: Option<u32>,
}

// Request payload replacing the selected categories.
#[derive(Debug, Deserialize)]
pub struct SetCategoriesRequest {
    pub category_ids: Vec<i64>,
}

// Request payload for an answer or a skip.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    #[serde(default)]
    pub text: String,
    // "answered" or "skipped".
    pub action: String,
}

// Request payload for a join request.
#[derive(Debug, Default, Deserialize)]
pub struct CreateJoinRequestRequest {
    pub message: Option<String>,
}

// Full room state for clients resynchronising after missed events.
#[derive(Debug, Serialize)]
pub struct RoomStateResponse {
    pub room: RoomSnapshot,
    pub current_question: Option<Question>,
    pub current_answer: Option<Answer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<Answer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_requests: Option<usize>,
}

impl From<RoomStateView> for RoomStateResponse {
    fn from(view: RoomStateView) -> Self {
        Self {
            room: view.room,
            current_question: view.current_question,
            current_answer: view.current_answer,
            answers: view.answers,
            pending_requests: view.pending_requests,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PendingRequestsResponse {
    pub requests: Vec<JoinRequest>,
}

#[derive(Debug, Serialize)]
pub struct TypingResponse {
    pub broadcast: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteRoomResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
