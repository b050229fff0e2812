use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::errors::GameError;
use crate::domain::ids::{CategoryId, QuestionId, RoomId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Ready,
    Playing,
    Finished,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Ready => "ready",
            RoomStatus::Playing => "playing",
            RoomStatus::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(RoomStatus::Waiting),
            "ready" => Some(RoomStatus::Ready),
            "playing" => Some(RoomStatus::Playing),
            "finished" => Some(RoomStatus::Finished),
            _ => None,
        }
    }
}

/// One two-player game session.
///
/// Transition methods check authorization first, then the state guard, and
/// only mutate once every check has passed, so a rejected call never leaves
/// the room half-updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub owner_id: UserId,
    pub guest_id: Option<UserId>,
    pub status: RoomStatus,
    pub guest_ready: bool,
    pub selected_categories: BTreeSet<CategoryId>,
    pub current_turn: Option<UserId>,
    pub current_question: Option<QuestionId>,
    pub current_question_ordinal: u32,
    pub max_questions: u32,
    pub language: String,
}

impl Room {
    pub fn new(owner_id: UserId, language: String, max_questions: u32) -> Self {
        Self {
            id: RoomId::new(),
            owner_id,
            guest_id: None,
            status: RoomStatus::Waiting,
            guest_ready: false,
            selected_categories: BTreeSet::new(),
            current_turn: None,
            current_question: None,
            current_question_ordinal: 0,
            max_questions,
            language,
        }
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.owner_id == user || self.guest_id == Some(user)
    }

    /// The participant who is not `user`, if both seats are taken.
    pub fn other_player(&self, user: UserId) -> Option<UserId> {
        if user == self.owner_id {
            self.guest_id
        } else if self.guest_id == Some(user) {
            Some(self.owner_id)
        } else {
            None
        }
    }

    pub fn ensure_owner(&self, user: UserId) -> Result<(), GameError> {
        if self.owner_id != user {
            return Err(GameError::NotOwner);
        }
        Ok(())
    }

    pub fn ensure_participant(&self, user: UserId) -> Result<(), GameError> {
        if !self.is_participant(user) {
            return Err(GameError::NotParticipant);
        }
        Ok(())
    }

    pub fn ensure_not_finished(&self) -> Result<(), GameError> {
        if self.status == RoomStatus::Finished {
            return Err(GameError::GameFinished);
        }
        Ok(())
    }

    /// Passes when the game is running and `user` holds the turn.
    pub fn ensure_turn(&self, user: UserId) -> Result<(), GameError> {
        self.ensure_participant(user)?;
        match self.status {
            RoomStatus::Playing => {}
            RoomStatus::Finished => return Err(GameError::GameFinished),
            RoomStatus::Waiting | RoomStatus::Ready => return Err(GameError::NotPlaying),
        }
        if self.current_turn != Some(user) {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    /// Seats `user` as guest. Shared by direct joins and accepted requests.
    pub fn assign_guest(&mut self, user: UserId) -> Result<(), GameError> {
        if user == self.owner_id {
            return Err(GameError::SelfJoin);
        }
        if self.guest_id.is_some() || self.status != RoomStatus::Waiting {
            return Err(GameError::RoomFull);
        }
        self.guest_id = Some(user);
        self.status = RoomStatus::Ready;
        self.guest_ready = false;
        Ok(())
    }

    pub fn remove_guest(&mut self, user: UserId) -> Result<(), GameError> {
        if self.guest_id != Some(user) {
            return Err(GameError::NotGuest);
        }
        self.ensure_not_finished()?;
        self.guest_id = None;
        self.status = RoomStatus::Waiting;
        self.guest_ready = false;
        self.current_turn = None;
        self.current_question = None;
        self.current_question_ordinal = 0;
        Ok(())
    }

    pub fn mark_guest_ready(&mut self, user: UserId) -> Result<(), GameError> {
        if self.guest_id != Some(user) {
            return Err(GameError::NotGuest);
        }
        self.ensure_not_finished()?;
        if self.status != RoomStatus::Ready {
            return Err(GameError::NotReady);
        }
        self.guest_ready = true;
        Ok(())
    }

    /// Owner always takes the first turn.
    pub fn start(&mut self, user: UserId) -> Result<(), GameError> {
        self.ensure_owner(user)?;
        self.ensure_not_finished()?;
        if self.status != RoomStatus::Ready || !self.guest_ready {
            return Err(GameError::NotReady);
        }
        self.status = RoomStatus::Playing;
        self.current_turn = Some(self.owner_id);
        self.current_question = None;
        self.current_question_ordinal = 0;
        Ok(())
    }

    pub fn select_categories(
        &mut self,
        user: UserId,
        categories: impl IntoIterator<Item = CategoryId>,
    ) -> Result<(), GameError> {
        self.ensure_participant(user)?;
        self.ensure_not_finished()?;
        self.selected_categories = categories.into_iter().collect();
        Ok(())
    }

    /// Flips one category and returns whether it is selected afterwards.
    pub fn toggle_category(&mut self, user: UserId, category: CategoryId) -> Result<bool, GameError> {
        self.ensure_participant(user)?;
        self.ensure_not_finished()?;
        if self.selected_categories.remove(&category) {
            return Ok(false);
        }
        self.selected_categories.insert(category);
        Ok(true)
    }

    pub fn has_reached_question_limit(&self) -> bool {
        self.current_question_ordinal >= self.max_questions
    }

    pub fn set_current_question(&mut self, question: QuestionId) {
        self.current_question = Some(question);
        self.current_question_ordinal += 1;
    }

    pub fn clear_current_question(&mut self) {
        self.current_question = None;
    }

    /// Hands the turn to the other participant.
    pub fn pass_turn(&mut self) {
        if let Some(current) = self.current_turn {
            self.current_turn = self.other_player(current).or(Some(current));
        }
    }

    pub fn finish(&mut self, user: UserId) -> Result<(), GameError> {
        self.ensure_participant(user)?;
        match self.status {
            RoomStatus::Playing => {}
            RoomStatus::Finished => return Err(GameError::GameFinished),
            RoomStatus::Waiting | RoomStatus::Ready => return Err(GameError::NotPlaying),
        }
        self.status = RoomStatus::Finished;
        self.current_turn = None;
        self.current_question = None;
        Ok(())
    }
}
