// Room events: one explicit data struct per event so publishers and
// renderers handle every case exhaustively.

use serde::Serialize;
use std::fmt;

use crate::domain::ids::{CategoryId, JoinRequestId, QuestionId, RoomId, UserId};
use crate::domain::question::AnswerAction;
use crate::domain::room::{Room, RoomStatus};

/// Routing key for a broadcast: everyone watching a room, or one user's
/// personal stream regardless of which room they are looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventScope {
    Room(RoomId),
    User(UserId),
}

impl fmt::Display for EventScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventScope::Room(room_id) => write!(f, "room:{room_id}"),
            EventScope::User(user_id) => write!(f, "user:{user_id}"),
        }
    }
}

/// How a markup consumer should merge a fragment into the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapHint {
    OuterHtml,
    InnerHtml,
    BeforeEnd,
}

impl SwapHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapHint::OuterHtml => "outerHTML",
            SwapHint::InnerHtml => "innerHTML",
            SwapHint::BeforeEnd => "beforeend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub owner_id: UserId,
    pub guest_id: Option<UserId>,
    pub status: RoomStatus,
    pub guest_ready: bool,
    pub selected_categories: Vec<CategoryId>,
    pub current_turn: Option<UserId>,
    pub current_question_id: Option<QuestionId>,
    pub question_ordinal: u32,
    pub max_questions: u32,
    pub language: String,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id,
            owner_id: room.owner_id,
            guest_id: room.guest_id,
            status: room.status,
            guest_ready: room.guest_ready,
            selected_categories: room.selected_categories.iter().copied().collect(),
            current_turn: room.current_turn,
            current_question_id: room.current_question,
            question_ordinal: room.current_question_ordinal,
            max_questions: room.max_questions,
            language: room.language.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadyState {
    pub room_id: RoomId,
    pub guest_id: UserId,
    pub guest_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBadge {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub guest_ready: bool,
    pub guest_id: Option<UserId>,
}

impl From<&Room> for StatusBadge {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id,
            status: room.status,
            guest_ready: room.guest_ready,
            guest_id: room.guest_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinRequestNotice {
    pub request_id: JoinRequestId,
    pub room_id: RoomId,
    pub requester_id: UserId,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestAccepted {
    pub request_id: JoinRequestId,
    pub room_id: RoomId,
    pub guest_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestResolution {
    pub request_id: JoinRequestId,
    pub room_id: RoomId,
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoriesUpdated {
    pub room_id: RoomId,
    pub category_ids: Vec<CategoryId>,
    pub updated_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionDrawn {
    pub room_id: RoomId,
    pub question_id: QuestionId,
    pub category_id: CategoryId,
    pub text: String,
    pub ordinal: u32,
    pub current_turn: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerSubmitted {
    pub room_id: RoomId,
    pub question_id: QuestionId,
    pub author_id: UserId,
    pub text: String,
    pub action: AnswerAction,
    pub current_turn: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStarted {
    pub room_id: RoomId,
    pub current_turn: UserId,
    pub redirect: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameFinished {
    pub room_id: RoomId,
    pub finished_by: UserId,
    pub redirect: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeUpdate {
    pub room_id: RoomId,
    pub pending_requests: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerTyping {
    pub room_id: RoomId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomDeleted {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    RoomUpdated(RoomSnapshot),
    ReadyStateChanged(ReadyState),
    StatusChanged(StatusBadge),
    JoinRequested(JoinRequestNotice),
    GuestAccepted(GuestAccepted),
    RequestAccepted(RequestResolution),
    RequestRejected(RequestResolution),
    CategoriesUpdated(CategoriesUpdated),
    QuestionDrawn(QuestionDrawn),
    AnswerSubmitted(AnswerSubmitted),
    GameStarted(GameStarted),
    GameFinished(GameFinished),
    BadgeUpdated(BadgeUpdate),
    PlayerTyping(PlayerTyping),
    RoomDeleted(RoomDeleted),
}

impl RoomEvent {
    /// Wire event name (the `event:` line of a stream frame).
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::RoomUpdated(_)
            | RoomEvent::ReadyStateChanged(_)
            | RoomEvent::StatusChanged(_) => "room_update",
            RoomEvent::JoinRequested(_) => "join_request",
            RoomEvent::GuestAccepted(_) | RoomEvent::RequestAccepted(_) => "request_accepted",
            RoomEvent::RequestRejected(_) => "request_rejected",
            RoomEvent::CategoriesUpdated(_) => "categories_updated",
            RoomEvent::QuestionDrawn(_) => "question_drawn",
            RoomEvent::AnswerSubmitted(_) => "answer_submitted",
            RoomEvent::GameStarted(_) => "game_started",
            RoomEvent::GameFinished(_) => "finish",
            RoomEvent::BadgeUpdated(_) => "badge_update",
            RoomEvent::PlayerTyping(_) => "player_typing",
            RoomEvent::RoomDeleted(_) => "room_deleted",
        }
    }

    /// Element the payload replaces; navigational events have none.
    pub fn target(&self) -> Option<&'static str> {
        match self {
            RoomEvent::RoomUpdated(_) | RoomEvent::RoomDeleted(_) => Some("#room-panel"),
            RoomEvent::ReadyStateChanged(_) => Some("#ready-button"),
            RoomEvent::StatusChanged(_) => Some("#room-status"),
            RoomEvent::JoinRequested(_) => Some("#join-requests"),
            RoomEvent::GuestAccepted(_) => Some("#guest-info"),
            RoomEvent::CategoriesUpdated(_) => Some("#categories"),
            RoomEvent::QuestionDrawn(_) => Some("#question-card"),
            RoomEvent::AnswerSubmitted(_) => Some("#answer-panel"),
            RoomEvent::BadgeUpdated(_) => Some("#request-badge"),
            RoomEvent::PlayerTyping(_) => Some("#typing-indicator"),
            RoomEvent::RequestAccepted(_)
            | RoomEvent::RequestRejected(_)
            | RoomEvent::GameStarted(_)
            | RoomEvent::GameFinished(_) => None,
        }
    }

    pub fn swap(&self) -> Option<SwapHint> {
        match self {
            RoomEvent::JoinRequested(_) => Some(SwapHint::BeforeEnd),
            RoomEvent::PlayerTyping(_) => Some(SwapHint::InnerHtml),
            RoomEvent::RequestAccepted(_)
            | RoomEvent::RequestRejected(_)
            | RoomEvent::GameStarted(_)
            | RoomEvent::GameFinished(_) => None,
            _ => Some(SwapHint::OuterHtml),
        }
    }

    /// Fragment template used in markup mode.
    pub fn template(&self) -> &'static str {
        match self {
            RoomEvent::RoomUpdated(_) => "room_panel",
            RoomEvent::ReadyStateChanged(_) => "ready_button",
            RoomEvent::StatusChanged(_) => "status_badge",
            RoomEvent::JoinRequested(_) => "join_request_item",
            RoomEvent::GuestAccepted(_) => "guest_info",
            RoomEvent::RequestAccepted(_) | RoomEvent::GameStarted(_) | RoomEvent::GameFinished(_) => {
                "redirect"
            }
            RoomEvent::RequestRejected(_) => "request_rejected",
            RoomEvent::CategoriesUpdated(_) => "category_list",
            RoomEvent::QuestionDrawn(_) => "question_card",
            RoomEvent::AnswerSubmitted(_) => "answer_panel",
            RoomEvent::BadgeUpdated(_) => "request_badge",
            RoomEvent::PlayerTyping(_) => "typing_indicator",
            RoomEvent::RoomDeleted(_) => "room_removed",
        }
    }

    /// Structured form of the event data.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            RoomEvent::RoomUpdated(data) => serde_json::to_value(data),
            RoomEvent::ReadyStateChanged(data) => serde_json::to_value(data),
            RoomEvent::StatusChanged(data) => serde_json::to_value(data),
            RoomEvent::JoinRequested(data) => serde_json::to_value(data),
            RoomEvent::GuestAccepted(data) => serde_json::to_value(data),
            RoomEvent::RequestAccepted(data) => serde_json::to_value(data),
            RoomEvent::RequestRejected(data) => serde_json::to_value(data),
            RoomEvent::CategoriesUpdated(data) => serde_json::to_value(data),
            RoomEvent::QuestionDrawn(data) => serde_json::to_value(data),
            RoomEvent::AnswerSubmitted(data) => serde_json::to_value(data),
            RoomEvent::GameStarted(data) => serde_json::to_value(data),
            RoomEvent::GameFinished(data) => serde_json::to_value(data),
            RoomEvent::BadgeUpdated(data) => serde_json::to_value(data),
            RoomEvent::PlayerTyping(data) => serde_json::to_value(data),
            RoomEvent::RoomDeleted(data) => serde_json::to_value(data),
        }
    }
}

pub fn play_path(room_id: RoomId) -> String {
    format!("/rooms/{room_id}/play")
}

pub fn lobby_path(room_id: RoomId) -> String {
    format!("/rooms/{room_id}")
}

pub fn summary_path(room_id: RoomId) -> String {
    format!("/rooms/{room_id}/summary")
}
