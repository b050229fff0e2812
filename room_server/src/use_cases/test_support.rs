use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{
    Answer, CategoryId, Clock, EventPublisher, EventScope, JoinRequest, JoinRequestId,
    JoinRequestStatus, Question, QuestionId, Room, RoomEvent, RoomId, RoomStore, StoreError,
};

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) u64);

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> u64 {
        self.0
    }
}

// Category 1 holds three questions, category 2 exactly one.
pub(crate) fn question_bank() -> Vec<Question> {
    let question = |id: i64, category: i64, text: &str| Question {
        id: QuestionId(id),
        category_id: CategoryId(category),
        text: text.to_string(),
    };
    vec![
        question(1, 1, "What did you want to be as a child?"),
        question(2, 1, "Which trip would you repeat tomorrow?"),
        question(3, 1, "What is your favourite smell?"),
        question(10, 2, "What are you most proud of this year?"),
    ]
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub get_room: bool,
    pub save_room: bool,
    pub save_join_request: bool,
    pub commit_acceptance: bool,
    pub record_answer: bool,
}

#[derive(Default)]
struct Tables {
    rooms: HashMap<RoomId, Room>,
    requests: Vec<JoinRequest>,
    answers: Vec<Answer>,
    room_saves: usize,
}

// Deterministic store: draws always pick the lowest eligible question id.
#[derive(Clone)]
pub(crate) struct RecordingStore {
    tables: Arc<Mutex<Tables>>,
    questions: Arc<Vec<Question>>,
    failures: Arc<Mutex<FailureFlags>>,
}

impl RecordingStore {
    pub(crate) fn new(questions: Vec<Question>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            questions: Arc::new(questions),
            failures: Arc::new(Mutex::new(FailureFlags::default())),
        }
    }

    pub(crate) fn set_failures(&self, failures: FailureFlags) {
        *self.failures.lock().expect("failures mutex poisoned") = failures;
    }

    pub(crate) fn room(&self, id: RoomId) -> Option<Room> {
        let guard = self.tables.lock().expect("tables mutex poisoned");
        guard.rooms.get(&id).cloned()
    }

    pub(crate) fn answers(&self, room_id: RoomId) -> Vec<Answer> {
        let guard = self.tables.lock().expect("tables mutex poisoned");
        guard
            .answers
            .iter()
            .filter(|answer| answer.room_id == room_id)
            .cloned()
            .collect()
    }

    pub(crate) fn request(&self, id: JoinRequestId) -> Option<JoinRequest> {
        let guard = self.tables.lock().expect("tables mutex poisoned");
        guard.requests.iter().find(|request| request.id == id).cloned()
    }

    pub(crate) fn room_saves(&self) -> usize {
        self.tables.lock().expect("tables mutex poisoned").room_saves
    }

    fn failures(&self) -> FailureFlags {
        *self.failures.lock().expect("failures mutex poisoned")
    }
}

fn fail(operation: &str) -> StoreError {
    StoreError::Backend(format!("{operation} failed"))
}

#[async_trait]
impl RoomStore for RecordingStore {
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        if self.failures().get_room {
            return Err(fail("get_room"));
        }
        Ok(self.room(id))
    }

    async fn save_room(&self, room: &Room) -> Result<(), StoreError> {
        if self.failures().save_room {
            return Err(fail("save_room"));
        }
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        guard.rooms.insert(room.id, room.clone());
        guard.room_saves += 1;
        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        guard.requests.retain(|request| request.room_id != id);
        guard.answers.retain(|answer| answer.room_id != id);
        Ok(guard.rooms.remove(&id).is_some())
    }

    async fn list_join_requests(
        &self,
        room_id: RoomId,
        status: Option<JoinRequestStatus>,
    ) -> Result<Vec<JoinRequest>, StoreError> {
        let guard = self.tables.lock().expect("tables mutex poisoned");
        Ok(guard
            .requests
            .iter()
            .filter(|request| request.room_id == room_id)
            .filter(|request| status.is_none_or(|status| request.status == status))
            .cloned()
            .collect())
    }

    async fn get_join_request(&self, id: JoinRequestId) -> Result<Option<JoinRequest>, StoreError> {
        Ok(self.request(id))
    }

    async fn save_join_request(&self, request: &JoinRequest) -> Result<(), StoreError> {
        if self.failures().save_join_request {
            return Err(fail("save_join_request"));
        }
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        match guard.requests.iter_mut().find(|stored| stored.id == request.id) {
            Some(stored) => *stored = request.clone(),
            None => guard.requests.push(request.clone()),
        }
        Ok(())
    }

    async fn commit_acceptance(&self, room: &Room, request: &JoinRequest) -> Result<(), StoreError> {
        if self.failures().commit_acceptance {
            return Err(fail("commit_acceptance"));
        }
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        guard.rooms.insert(room.id, room.clone());
        guard.room_saves += 1;
        if let Some(stored) = guard.requests.iter_mut().find(|stored| stored.id == request.id) {
            *stored = request.clone();
        }
        Ok(())
    }

    async fn record_answer(&self, room: &Room, answer: &Answer) -> Result<(), StoreError> {
        if self.failures().record_answer {
            return Err(fail("record_answer"));
        }
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        guard.rooms.insert(room.id, room.clone());
        guard.room_saves += 1;
        guard.answers.push(answer.clone());
        Ok(())
    }

    async fn answers_for_room(&self, room_id: RoomId) -> Result<Vec<Answer>, StoreError> {
        Ok(self.answers(room_id))
    }

    async fn pick_random_question(
        &self,
        categories: &[CategoryId],
        exclude: &[QuestionId],
    ) -> Result<Option<Question>, StoreError> {
        Ok(self
            .questions
            .iter()
            .filter(|question| categories.contains(&question.category_id))
            .filter(|question| !exclude.contains(&question.id))
            .min_by_key(|question| question.id)
            .cloned())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StoreError> {
        Ok(self.questions.iter().find(|question| question.id == id).cloned())
    }
}

// Captures published events in order for assertions.
#[derive(Clone, Default)]
pub(crate) struct RecordingPublisher {
    events: Arc<Mutex<Vec<(EventScope, RoomEvent)>>>,
}

impl RecordingPublisher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&self) {
        self.events.lock().expect("events mutex poisoned").clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.lock().expect("events mutex poisoned").is_empty()
    }

    pub(crate) fn events_for(&self, scope: EventScope) -> Vec<RoomEvent> {
        let guard = self.events.lock().expect("events mutex poisoned");
        guard
            .iter()
            .filter(|(event_scope, _)| *event_scope == scope)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub(crate) fn types_for(&self, scope: EventScope) -> Vec<&'static str> {
        self.events_for(scope)
            .iter()
            .map(RoomEvent::event_type)
            .collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, scope: EventScope, event: RoomEvent) {
        let mut guard = self.events.lock().expect("events mutex poisoned");
        guard.push((scope, event));
    }
}
