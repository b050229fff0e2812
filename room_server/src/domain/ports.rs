use async_trait::async_trait;

use crate::domain::errors::{RenderError, StoreError};
use crate::domain::events::{EventScope, RoomEvent};
use crate::domain::ids::{CategoryId, JoinRequestId, QuestionId, RoomId};
use crate::domain::join_request::{JoinRequest, JoinRequestStatus};
use crate::domain::question::{Answer, Question};
use crate::domain::room::Room;

// Port for the keyed record store backing rooms, requests and answers.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, StoreError>;
    // Persists every mutable room field in one write.
    async fn save_room(&self, room: &Room) -> Result<(), StoreError>;
    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError>;

    async fn list_join_requests(
        &self,
        room_id: RoomId,
        status: Option<JoinRequestStatus>,
    ) -> Result<Vec<JoinRequest>, StoreError>;
    async fn get_join_request(&self, id: JoinRequestId) -> Result<Option<JoinRequest>, StoreError>;
    async fn save_join_request(&self, request: &JoinRequest) -> Result<(), StoreError>;
    // Room and request are written together or not at all.
    async fn commit_acceptance(&self, room: &Room, request: &JoinRequest) -> Result<(), StoreError>;

    // Answer and room (with its passed turn) are written together or not at all.
    async fn record_answer(&self, room: &Room, answer: &Answer) -> Result<(), StoreError>;
    // Oldest first.
    async fn answers_for_room(&self, room_id: RoomId) -> Result<Vec<Answer>, StoreError>;

    async fn pick_random_question(
        &self,
        categories: &[CategoryId],
        exclude: &[QuestionId],
    ) -> Result<Option<Question>, StoreError>;
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StoreError>;
}

// Port the workflows use to announce changes after they are persisted.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, scope: EventScope, event: RoomEvent);
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> u64;
}

// Port for turning an event into a markup fragment.
pub trait FragmentRenderer: Send + Sync {
    fn render(&self, event: &RoomEvent) -> Result<String, RenderError>;
}
