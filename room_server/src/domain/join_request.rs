use serde::Serialize;

use crate::domain::errors::GameError;
use crate::domain::ids::{JoinRequestId, RoomId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Accepted => "accepted",
            JoinRequestStatus::Rejected => "rejected",
            JoinRequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(JoinRequestStatus::Pending),
            "accepted" => Some(JoinRequestStatus::Accepted),
            "rejected" => Some(JoinRequestStatus::Rejected),
            "cancelled" => Some(JoinRequestStatus::Cancelled),
            _ => None,
        }
    }
}

// A non-owner's ask to take the guest seat of a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinRequest {
    pub id: JoinRequestId,
    pub room_id: RoomId,
    pub requester_id: UserId,
    pub message: Option<String>,
    pub status: JoinRequestStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

impl JoinRequest {
    pub fn new(room_id: RoomId, requester_id: UserId, message: Option<String>, now: u64) -> Self {
        Self {
            id: JoinRequestId::new(),
            room_id,
            requester_id,
            message,
            status: JoinRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves a pending request to `next`; resolved requests stay untouched.
    pub fn resolve(&mut self, next: JoinRequestStatus, now: u64) -> Result<(), GameError> {
        if self.status != JoinRequestStatus::Pending {
            return Err(GameError::NotPending);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

// Trimmed, bounded free-text note attached to a join request.
pub fn normalize_message(message: Option<String>) -> Result<Option<String>, GameError> {
    const MAX_LEN: usize = 500;

    let Some(message) = message else {
        return Ok(None);
    };
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_LEN {
        return Err(GameError::InvalidMessage);
    }
    Ok(Some(trimmed.to_string()))
}
