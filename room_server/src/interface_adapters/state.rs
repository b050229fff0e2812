use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::domain::{
    Answer, CategoryId, Clock, JoinRequest, JoinRequestId, JoinRequestStatus, Question, QuestionId,
    Room, RoomId, RoomStore, StoreError,
};
use crate::use_cases::{BroadcastHub, JoinRequestWorkflow, RoomMachine};

// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomMachine>,
    pub join_requests: Arc<JoinRequestWorkflow>,
    pub hub: BroadcastHub,
    // Interval between keepalive pings on open event streams.
    pub keepalive: Duration,
}

#[derive(Default)]
struct Tables {
    rooms: HashMap<RoomId, Room>,
    requests: HashMap<JoinRequestId, JoinRequest>,
    // Append order is creation order.
    answers: Vec<Answer>,
}

// In-memory store adapter used when no database is configured.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    questions: Arc<Vec<Question>>,
}

impl InMemoryStore {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            questions: Arc::new(questions),
        }
    }
}

#[async_trait]
impl RoomStore for InMemoryStore {
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.rooms.get(&id).cloned())
    }

    async fn save_room(&self, room: &Room) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.requests.retain(|_, request| request.room_id != id);
        tables.answers.retain(|answer| answer.room_id != id);
        Ok(tables.rooms.remove(&id).is_some())
    }

    async fn list_join_requests(
        &self,
        room_id: RoomId,
        status: Option<JoinRequestStatus>,
    ) -> Result<Vec<JoinRequest>, StoreError> {
        let tables = self.tables.lock().await;
        let mut requests: Vec<JoinRequest> = tables
            .requests
            .values()
            .filter(|request| request.room_id == room_id)
            .filter(|request| status.is_none_or(|status| request.status == status))
            .cloned()
            .collect();
        requests.sort_by_key(|request| request.created_at);
        Ok(requests)
    }

    async fn get_join_request(&self, id: JoinRequestId) -> Result<Option<JoinRequest>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.requests.get(&id).cloned())
    }

    async fn save_join_request(&self, request: &JoinRequest) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn commit_acceptance(&self, room: &Room, request: &JoinRequest) -> Result<(), StoreError> {
        // One guard covers both writes.
        let mut tables = self.tables.lock().await;
        tables.rooms.insert(room.id, room.clone());
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn record_answer(&self, room: &Room, answer: &Answer) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.rooms.insert(room.id, room.clone());
        tables.answers.push(answer.clone());
        Ok(())
    }

    async fn answers_for_room(&self, room_id: RoomId) -> Result<Vec<Answer>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .answers
            .iter()
            .filter(|answer| answer.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn pick_random_question(
        &self,
        categories: &[CategoryId],
        exclude: &[QuestionId],
    ) -> Result<Option<Question>, StoreError> {
        let candidates: Vec<&Question> = self
            .questions
            .iter()
            .filter(|question| categories.contains(&question.category_id))
            .filter(|question| !exclude.contains(&question.id))
            .collect();
        Ok(candidates
            .choose(&mut rand::thread_rng())
            .map(|question| (*question).clone()))
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StoreError> {
        Ok(self
            .questions
            .iter()
            .find(|question| question.id == id)
            .cloned())
    }
}

// System clock adapter used by the join-request workflow.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnswerAction, AnswerId, UserId};

    fn bank() -> Vec<Question> {
        (1..=4)
            .map(|id| Question {
                id: QuestionId(id),
                category_id: CategoryId(if id <= 3 { 1 } else { 2 }),
                text: format!("question {id}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn when_picking_then_only_selected_unasked_questions_are_returned() {
        let store = InMemoryStore::new(bank());

        for _ in 0..20 {
            let picked = store
                .pick_random_question(&[CategoryId(1)], &[QuestionId(1), QuestionId(3)])
                .await
                .expect("expected pick");
            assert_eq!(picked.map(|question| question.id), Some(QuestionId(2)));
        }
    }

    #[tokio::test]
    async fn when_every_question_was_asked_then_pick_is_empty() {
        let store = InMemoryStore::new(bank());

        let picked = store
            .pick_random_question(&[CategoryId(2)], &[QuestionId(4)])
            .await
            .expect("expected pick");

        assert_eq!(picked, None);
    }

    #[tokio::test]
    async fn when_room_is_deleted_then_its_requests_and_answers_go_too() {
        let store = InMemoryStore::new(bank());
        let room = Room::new(UserId(1), "en".to_string(), 10);
        store.save_room(&room).await.expect("save room");
        let request = JoinRequest::new(room.id, UserId(2), None, 1);
        store.save_join_request(&request).await.expect("save request");

        assert!(store.delete_room(room.id).await.expect("delete"));
        assert_eq!(
            store.get_join_request(request.id).await.expect("get request"),
            None
        );
        assert!(!store.delete_room(room.id).await.expect("second delete"));
    }

    #[tokio::test]
    async fn when_answer_is_recorded_then_room_turn_is_written_with_it() {
        let store = InMemoryStore::new(bank());
        let mut room = Room::new(UserId(1), "en".to_string(), 10);
        store.save_room(&room).await.expect("save room");
        room.current_turn = Some(UserId(2));
        let answer = Answer {
            id: AnswerId::new(),
            room_id: room.id,
            question_id: QuestionId(1),
            author_id: UserId(1),
            text: "sure".to_string(),
            action: AnswerAction::Answered,
        };

        store.record_answer(&room, &answer).await.expect("record");

        let stored = store.get_room(room.id).await.expect("get room").expect("room");
        assert_eq!(stored.current_turn, Some(UserId(2)));
        assert_eq!(
            store.answers_for_room(room.id).await.expect("answers"),
            vec![answer]
        );
    }

    #[tokio::test]
    async fn when_listing_by_status_then_other_statuses_are_filtered_out() {
        let store = InMemoryStore::new(bank());
        let room_id = RoomId::new();
        let pending = JoinRequest::new(room_id, UserId(2), None, 1);
        let mut rejected = JoinRequest::new(room_id, UserId(3), None, 2);
        rejected
            .resolve(JoinRequestStatus::Rejected, 3)
            .expect("resolve");
        store.save_join_request(&pending).await.expect("save");
        store.save_join_request(&rejected).await.expect("save");

        let listed = store
            .list_join_requests(room_id, Some(JoinRequestStatus::Pending))
            .await
            .expect("list");
        let all = store.list_join_requests(room_id, None).await.expect("list");

        assert_eq!(listed, vec![pending]);
        assert_eq!(all.len(), 2);
    }
}
