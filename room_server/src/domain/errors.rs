use thiserror::Error;

// Coarse error classes; the HTTP layer maps each class to one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Conflict,
    NotFound,
    Dependency,
}

// Domain-level errors for room and join-request workflows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("malformed room id")]
    InvalidRoomId,
    #[error("malformed join request id")]
    InvalidRequestId,
    #[error("malformed category id")]
    InvalidCategory,
    #[error("answer text is required and must be at most 1000 characters")]
    InvalidAnswer,
    #[error("message must be at most 500 characters")]
    InvalidMessage,
    #[error("language must be 2 to 8 letters")]
    InvalidLanguage,
    #[error("max_questions must be between 1 and 100")]
    InvalidMaxQuestions,

    #[error("only the room owner can do this")]
    NotOwner,
    #[error("only the guest can do this")]
    NotGuest,
    #[error("you are not a player in this room")]
    NotParticipant,
    #[error("it is not your turn")]
    NotYourTurn,

    #[error("room already has a guest")]
    RoomFull,
    #[error("you cannot join your own room")]
    SelfJoin,
    #[error("room is not ready to start")]
    NotReady,
    #[error("game is not in progress")]
    NotPlaying,
    #[error("game has already finished")]
    GameFinished,
    #[error("question is no longer current")]
    QuestionMismatch,
    #[error("question was already answered")]
    AlreadyAnswered,
    #[error("join request is no longer pending")]
    NotPending,
    #[error("you already have a pending join request")]
    DuplicateRequest,
    #[error("no questions left in the selected categories")]
    NoQuestionsAvailable,
    #[error("question limit reached")]
    QuestionLimitReached,

    #[error("room not found")]
    RoomNotFound,
    #[error("join request not found")]
    RequestNotFound,

    #[error("something went wrong, please try again")]
    StorageFailure,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidRoomId
            | GameError::InvalidRequestId
            | GameError::InvalidCategory
            | GameError::InvalidAnswer
            | GameError::InvalidMessage
            | GameError::InvalidLanguage
            | GameError::InvalidMaxQuestions => ErrorKind::Validation,
            GameError::NotOwner
            | GameError::NotGuest
            | GameError::NotParticipant
            | GameError::NotYourTurn => ErrorKind::Authorization,
            GameError::RoomFull
            | GameError::SelfJoin
            | GameError::NotReady
            | GameError::NotPlaying
            | GameError::GameFinished
            | GameError::QuestionMismatch
            | GameError::AlreadyAnswered
            | GameError::NotPending
            | GameError::DuplicateRequest
            | GameError::NoQuestionsAvailable
            | GameError::QuestionLimitReached => ErrorKind::Conflict,
            GameError::RoomNotFound | GameError::RequestNotFound => ErrorKind::NotFound,
            GameError::StorageFailure => ErrorKind::Dependency,
        }
    }

    // Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidRoomId => "invalid_room_id",
            GameError::InvalidRequestId => "invalid_request_id",
            GameError::InvalidCategory => "invalid_category",
            GameError::InvalidAnswer => "invalid_answer",
            GameError::InvalidMessage => "invalid_message",
            GameError::InvalidLanguage => "invalid_language",
            GameError::InvalidMaxQuestions => "invalid_max_questions",
            GameError::NotOwner => "not_owner",
            GameError::NotGuest => "not_guest",
            GameError::NotParticipant => "not_participant",
            GameError::NotYourTurn => "not_your_turn",
            GameError::RoomFull => "room_full",
            GameError::SelfJoin => "self_join",
            GameError::NotReady => "not_ready",
            GameError::NotPlaying => "not_playing",
            GameError::GameFinished => "game_finished",
            GameError::QuestionMismatch => "question_mismatch",
            GameError::AlreadyAnswered => "already_answered",
            GameError::NotPending => "not_pending",
            GameError::DuplicateRequest => "duplicate_request",
            GameError::NoQuestionsAvailable => "no_questions_available",
            GameError::QuestionLimitReached => "question_limit_reached",
            GameError::RoomNotFound => "room_not_found",
            GameError::RequestNotFound => "request_not_found",
            GameError::StorageFailure => "storage_failure",
        }
    }
}

// Failure reported by a storage adapter. The detail is logged, never shown.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

// Failure reported by the fragment renderer.
#[derive(Debug, Error)]
#[error("failed to render {template}: {reason}")]
pub struct RenderError {
    pub template: &'static str,
    pub reason: String,
}
