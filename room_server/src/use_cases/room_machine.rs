// Room lifecycle and turn/draw/answer workflow.

use crate::domain::events::{
    AnswerSubmitted, CategoriesUpdated, GameFinished, GameStarted, PlayerTyping, QuestionDrawn,
    ReadyState, RoomDeleted, RoomSnapshot, StatusBadge, play_path, summary_path,
};
use crate::domain::question::{current_answer, normalize_answer_text};
use crate::domain::{
    Answer, AnswerAction, AnswerId, CategoryId, EventPublisher, EventScope, GameError,
    JoinRequestStatus, Question, QuestionId, Room, RoomEvent, RoomId, RoomStatus, RoomStore,
    StoreError, UserId,
};
use crate::use_cases::locks::RoomLocks;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Defaults applied to newly created rooms.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub default_language: String,
    pub default_max_questions: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CreateRoomInput {
    pub language: Option<String>,
    pub max_questions: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SubmitAnswerInput {
    pub question_id: QuestionId,
    pub text: String,
    pub action: AnswerAction,
}

/// Everything a client needs to rebuild its view after missing events.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomStateView {
    pub room: RoomSnapshot,
    pub current_question: Option<Question>,
    pub current_answer: Option<Answer>,
    // Participants only.
    pub answers: Option<Vec<Answer>>,
    // Owner only.
    pub pending_requests: Option<usize>,
}

/// Room state machine. Every mutation re-reads the room under its lock,
/// applies the guard, persists, and only then publishes.
pub struct RoomMachine {
    pub store: Arc<dyn RoomStore>,
    pub events: Arc<dyn EventPublisher>,
    pub locks: RoomLocks,
    pub settings: RoomSettings,
}

impl RoomMachine {
    pub async fn create_room(
        &self,
        owner: UserId,
        input: CreateRoomInput,
    ) -> Result<Room, GameError> {
        let language = match input.language {
            Some(language) => validate_language(&language)?,
            None => self.settings.default_language.clone(),
        };
        let max_questions = input
            .max_questions
            .unwrap_or(self.settings.default_max_questions);
        if !(1..=100).contains(&max_questions) {
            return Err(GameError::InvalidMaxQuestions);
        }

        let room = Room::new(owner, language, max_questions);
        self.store
            .save_room(&room)
            .await
            .map_err(storage_failure("create_room"))?;

        info!(room_id = %room.id, owner_id = %owner, "room created");
        Ok(room)
    }

    pub async fn room(&self, room_id: RoomId) -> Result<Room, GameError> {
        self.load_room(room_id).await
    }

    pub async fn room_state(
        &self,
        room_id: RoomId,
        viewer: UserId,
    ) -> Result<RoomStateView, GameError> {
        let room = self.load_room(room_id).await?;

        let current_question = match room.current_question {
            Some(question_id) => Some(self.question(question_id).await?),
            None => None,
        };

        let (answers, current) = if room.is_participant(viewer) {
            let answers = self
                .store
                .answers_for_room(room_id)
                .await
                .map_err(storage_failure("answers_for_room"))?;
            let current = room
                .current_question
                .and_then(|question_id| current_answer(&answers, question_id).cloned());
            (Some(answers), current)
        } else {
            (None, None)
        };

        let pending_requests = if room.owner_id == viewer {
            let pending = self
                .store
                .list_join_requests(room_id, Some(JoinRequestStatus::Pending))
                .await
                .map_err(storage_failure("list_join_requests"))?;
            Some(pending.len())
        } else {
            None
        };

        Ok(RoomStateView {
            room: RoomSnapshot::from(&room),
            current_question,
            current_answer: current,
            answers,
            pending_requests,
        })
    }

    pub async fn join_direct(&self, room_id: RoomId, user: UserId) -> Result<Room, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.assign_guest(user)?;
        self.save_room(&room).await?;

        info!(%room_id, guest_id = %user, "guest joined");
        self.publish_room(&room, RoomEvent::RoomUpdated(RoomSnapshot::from(&room)));
        Ok(room)
    }

    pub async fn leave_as_guest(&self, room_id: RoomId, user: UserId) -> Result<Room, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.remove_guest(user)?;
        self.save_room(&room).await?;

        info!(%room_id, guest_id = %user, "guest left");
        self.publish_room(&room, RoomEvent::RoomUpdated(RoomSnapshot::from(&room)));
        Ok(room)
    }

    pub async fn set_selected_categories(
        &self,
        room_id: RoomId,
        user: UserId,
        category_ids: Vec<i64>,
    ) -> Result<Room, GameError> {
        let categories = category_ids
            .into_iter()
            .map(CategoryId::checked)
            .collect::<Result<Vec<_>, _>>()?;

        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.select_categories(user, categories)?;
        self.save_room(&room).await?;

        self.publish_categories(&room, user);
        Ok(room)
    }

    pub async fn toggle_category(
        &self,
        room_id: RoomId,
        user: UserId,
        category_id: i64,
    ) -> Result<Room, GameError> {
        let category = CategoryId::checked(category_id)?;

        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        let selected = room.toggle_category(user, category)?;
        self.save_room(&room).await?;

        debug!(%room_id, %category, selected, "category toggled");
        self.publish_categories(&room, user);
        Ok(room)
    }

    pub async fn set_guest_ready(&self, room_id: RoomId, user: UserId) -> Result<Room, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.mark_guest_ready(user)?;
        self.save_room(&room).await?;

        info!(%room_id, guest_id = %user, "guest ready");
        self.publish_room(
            &room,
            RoomEvent::ReadyStateChanged(ReadyState {
                room_id,
                guest_id: user,
                guest_ready: room.guest_ready,
            }),
        );
        self.publish_room(&room, RoomEvent::StatusChanged(StatusBadge::from(&room)));
        Ok(room)
    }

    pub async fn start_game(&self, room_id: RoomId, user: UserId) -> Result<Room, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.start(user)?;
        self.save_room(&room).await?;

        info!(%room_id, "game started");
        self.publish_room(
            &room,
            RoomEvent::GameStarted(GameStarted {
                room_id,
                current_turn: room.owner_id,
                redirect: play_path(room_id),
            }),
        );
        Ok(room)
    }

    /// Returns the room's current question, drawing one only when none is set.
    pub async fn draw_question(
        &self,
        room_id: RoomId,
        user: UserId,
    ) -> Result<Question, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.ensure_participant(user)?;
        ensure_playing(&room)?;
        self.draw_locked(&mut room).await
    }

    pub async fn submit_answer(
        &self,
        room_id: RoomId,
        user: UserId,
        input: SubmitAnswerInput,
    ) -> Result<Answer, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.ensure_turn(user)?;
        if room.current_question != Some(input.question_id) {
            return Err(GameError::QuestionMismatch);
        }
        let text = normalize_answer_text(&input.text, input.action)?;

        let answers = self
            .store
            .answers_for_room(room_id)
            .await
            .map_err(storage_failure("answers_for_room"))?;
        if current_answer(&answers, input.question_id).is_some() {
            return Err(GameError::AlreadyAnswered);
        }

        let answer = Answer {
            id: AnswerId::new(),
            room_id,
            question_id: input.question_id,
            author_id: user,
            text,
            action: input.action,
        };
        // The question stays up so both players see the pair until the next draw.
        if input.action == AnswerAction::Answered {
            room.pass_turn();
        }
        self.store
            .record_answer(&room, &answer)
            .await
            .map_err(storage_failure("record_answer"))?;

        info!(
            %room_id,
            author_id = %user,
            question_id = %input.question_id,
            action = input.action.as_str(),
            "answer submitted"
        );
        self.publish_room(
            &room,
            RoomEvent::AnswerSubmitted(AnswerSubmitted {
                room_id,
                question_id: answer.question_id,
                author_id: user,
                text: answer.text.clone(),
                action: answer.action,
                current_turn: room.current_turn.unwrap_or(user),
            }),
        );
        Ok(answer)
    }

    /// Replaces an answered question with a fresh draw. An unanswered current
    /// question is returned as is, so a doubled advance never skips a card.
    pub async fn advance_to_next_question(
        &self,
        room_id: RoomId,
        user: UserId,
    ) -> Result<Question, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.ensure_turn(user)?;
        if let Some(current) = room.current_question {
            let answers = self
                .store
                .answers_for_room(room_id)
                .await
                .map_err(storage_failure("answers_for_room"))?;
            if current_answer(&answers, current).is_none() {
                debug!(%room_id, question_id = %current, "advance before answer; keeping question");
                return self.question(current).await;
            }
            room.clear_current_question();
        }

        self.draw_locked(&mut room).await
    }

    pub async fn end_game(&self, room_id: RoomId, user: UserId) -> Result<Room, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let mut room = self.load_room(room_id).await?;

        room.finish(user)?;
        self.save_room(&room).await?;

        info!(%room_id, finished_by = %user, "game finished");
        self.publish_room(
            &room,
            RoomEvent::GameFinished(GameFinished {
                room_id,
                finished_by: user,
                redirect: summary_path(room_id),
            }),
        );
        Ok(room)
    }

    pub async fn delete_room(&self, room_id: RoomId, user: UserId) -> Result<(), GameError> {
        let _guard = self.locks.acquire(room_id).await;
        let room = self.load_room(room_id).await?;

        room.ensure_owner(user)?;
        self.store
            .delete_room(room_id)
            .await
            .map_err(storage_failure("delete_room"))?;

        info!(%room_id, "room deleted");
        self.publish_room(&room, RoomEvent::RoomDeleted(RoomDeleted { room_id }));
        Ok(())
    }

    /// Broadcasts a typing hint for the turn holder. Returns false when the
    /// hint was ignored because the sender does not hold the turn.
    pub async fn notify_typing(&self, room_id: RoomId, user: UserId) -> Result<bool, GameError> {
        let room = self.load_room(room_id).await?;
        room.ensure_participant(user)?;

        if room.status != RoomStatus::Playing || room.current_turn != Some(user) {
            return Ok(false);
        }
        self.publish_room(
            &room,
            RoomEvent::PlayerTyping(PlayerTyping {
                room_id,
                user_id: user,
            }),
        );
        Ok(true)
    }

    // Caller holds the room lock.
    async fn draw_locked(&self, room: &mut Room) -> Result<Question, GameError> {
        if let Some(current) = room.current_question {
            return self.question(current).await;
        }
        if room.has_reached_question_limit() {
            return Err(GameError::QuestionLimitReached);
        }

        let categories: Vec<CategoryId> = room.selected_categories.iter().copied().collect();
        if categories.is_empty() {
            return Err(GameError::NoQuestionsAvailable);
        }
        let mut asked: Vec<QuestionId> = self
            .store
            .answers_for_room(room.id)
            .await
            .map_err(storage_failure("answers_for_room"))?
            .into_iter()
            .map(|answer| answer.question_id)
            .collect();
        asked.sort_unstable();
        asked.dedup();

        let question = self
            .store
            .pick_random_question(&categories, &asked)
            .await
            .map_err(storage_failure("pick_random_question"))?
            .ok_or(GameError::NoQuestionsAvailable)?;

        room.set_current_question(question.id);
        self.save_room(room).await?;

        let current_turn = room.current_turn.unwrap_or(room.owner_id);
        info!(
            room_id = %room.id,
            question_id = %question.id,
            ordinal = room.current_question_ordinal,
            "question drawn"
        );
        self.publish_room(
            room,
            RoomEvent::QuestionDrawn(QuestionDrawn {
                room_id: room.id,
                question_id: question.id,
                category_id: question.category_id,
                text: question.text.clone(),
                ordinal: room.current_question_ordinal,
                current_turn,
            }),
        );
        Ok(question)
    }

    async fn load_room(&self, room_id: RoomId) -> Result<Room, GameError> {
        self.store
            .get_room(room_id)
            .await
            .map_err(storage_failure("get_room"))?
            .ok_or(GameError::RoomNotFound)
    }

    async fn save_room(&self, room: &Room) -> Result<(), GameError> {
        self.store
            .save_room(room)
            .await
            .map_err(storage_failure("save_room"))
    }

    async fn question(&self, question_id: QuestionId) -> Result<Question, GameError> {
        self.store
            .get_question(question_id)
            .await
            .map_err(storage_failure("get_question"))?
            .ok_or_else(|| {
                error!(%question_id, "current question missing from question bank");
                GameError::StorageFailure
            })
    }

    fn publish_room(&self, room: &Room, event: RoomEvent) {
        self.events.publish(EventScope::Room(room.id), event);
    }

    fn publish_categories(&self, room: &Room, user: UserId) {
        self.publish_room(
            room,
            RoomEvent::CategoriesUpdated(CategoriesUpdated {
                room_id: room.id,
                category_ids: room.selected_categories.iter().copied().collect(),
                updated_by: user,
            }),
        );
    }
}

fn ensure_playing(room: &Room) -> Result<(), GameError> {
    match room.status {
        RoomStatus::Playing => Ok(()),
        RoomStatus::Finished => Err(GameError::GameFinished),
        RoomStatus::Waiting | RoomStatus::Ready => Err(GameError::NotPlaying),
    }
}

fn validate_language(value: &str) -> Result<String, GameError> {
    let value = value.trim();
    if !(2..=8).contains(&value.len()) || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GameError::InvalidLanguage);
    }
    Ok(value.to_ascii_lowercase())
}

/// Logs the storage cause and collapses it into the generic dependency error.
pub(crate) fn storage_failure(operation: &'static str) -> impl FnOnce(StoreError) -> GameError {
    move |err| {
        error!(operation, error = %err, "storage failure");
        GameError::StorageFailure
    }
}
