// Join-request workflow: pending requests resolved by the room owner.

use crate::domain::events::{
    BadgeUpdate, GuestAccepted, JoinRequestNotice, RequestResolution, StatusBadge, lobby_path,
};
use crate::domain::join_request::normalize_message;
use crate::domain::{
    Clock, EventPublisher, EventScope, GameError, JoinRequest, JoinRequestId, JoinRequestStatus,
    Room, RoomEvent, RoomId, RoomStatus, RoomStore, UserId,
};
use crate::use_cases::locks::RoomLocks;
use crate::use_cases::room_machine::storage_failure;
use std::sync::Arc;
use tracing::{info, warn};

pub struct JoinRequestWorkflow {
    pub store: Arc<dyn RoomStore>,
    pub events: Arc<dyn EventPublisher>,
    pub locks: RoomLocks,
    pub clock: Arc<dyn Clock>,
}

impl JoinRequestWorkflow {
    pub async fn create(
        &self,
        room_id: RoomId,
        requester: UserId,
        message: Option<String>,
    ) -> Result<JoinRequest, GameError> {
        let message = normalize_message(message)?;

        let _guard = self.locks.acquire(room_id).await;
        let room = self.load_room(room_id).await?;

        if room.owner_id == requester {
            return Err(GameError::SelfJoin);
        }
        room.ensure_not_finished()?;
        if room.guest_id.is_some() || room.status != RoomStatus::Waiting {
            return Err(GameError::RoomFull);
        }
        let pending = self.pending(room_id).await?;
        if pending.iter().any(|request| request.requester_id == requester) {
            return Err(GameError::DuplicateRequest);
        }

        let request = JoinRequest::new(room_id, requester, message, self.clock.now_epoch_seconds());
        self.save_request(&request).await?;

        info!(%room_id, request_id = %request.id, requester_id = %requester, "join request created");
        self.events.publish(
            EventScope::Room(room_id),
            RoomEvent::JoinRequested(JoinRequestNotice {
                request_id: request.id,
                room_id,
                requester_id: requester,
                message: request.message.clone(),
            }),
        );
        self.publish_badge(room_id, pending.len() + 1);
        Ok(request)
    }

    /// Marks the request accepted and seats its requester in one commit.
    pub async fn accept(
        &self,
        request_id: JoinRequestId,
        actor: UserId,
    ) -> Result<Room, GameError> {
        let room_id = self.load_request(request_id).await?.room_id;

        let _guard = self.locks.acquire(room_id).await;
        let mut request = self.load_request(request_id).await?;
        let mut room = self.load_room(room_id).await?;

        room.ensure_owner(actor)?;
        request.resolve(JoinRequestStatus::Accepted, self.clock.now_epoch_seconds())?;
        room.assign_guest(request.requester_id)?;

        self.store
            .commit_acceptance(&room, &request)
            .await
            .map_err(storage_failure("commit_acceptance"))?;

        info!(%room_id, %request_id, guest_id = %request.requester_id, "join request accepted");
        let room_scope = EventScope::Room(room_id);
        self.events.publish(
            room_scope,
            RoomEvent::GuestAccepted(GuestAccepted {
                request_id,
                room_id,
                guest_id: request.requester_id,
            }),
        );
        self.events
            .publish(room_scope, RoomEvent::StatusChanged(StatusBadge::from(&room)));
        self.events.publish(
            EventScope::User(request.requester_id),
            RoomEvent::RequestAccepted(RequestResolution {
                request_id,
                room_id,
                redirect: Some(lobby_path(room_id)),
            }),
        );
        self.refresh_badge(room_id).await;
        Ok(room)
    }

    pub async fn reject(
        &self,
        request_id: JoinRequestId,
        actor: UserId,
    ) -> Result<JoinRequest, GameError> {
        let room_id = self.load_request(request_id).await?.room_id;

        let _guard = self.locks.acquire(room_id).await;
        let mut request = self.load_request(request_id).await?;
        let room = self.load_room(room_id).await?;

        room.ensure_owner(actor)?;
        request.resolve(JoinRequestStatus::Rejected, self.clock.now_epoch_seconds())?;
        self.save_request(&request).await?;

        info!(%room_id, %request_id, "join request rejected");
        self.events.publish(
            EventScope::User(request.requester_id),
            RoomEvent::RequestRejected(RequestResolution {
                request_id,
                room_id,
                redirect: None,
            }),
        );
        self.refresh_badge(room_id).await;
        Ok(request)
    }

    /// Withdraws the requester's own pending request for `room_id`.
    pub async fn cancel(
        &self,
        room_id: RoomId,
        requester: UserId,
    ) -> Result<JoinRequest, GameError> {
        let _guard = self.locks.acquire(room_id).await;
        self.load_room(room_id).await?;

        let mut request = self
            .pending(room_id)
            .await?
            .into_iter()
            .find(|request| request.requester_id == requester)
            .ok_or(GameError::RequestNotFound)?;
        request.resolve(JoinRequestStatus::Cancelled, self.clock.now_epoch_seconds())?;
        self.save_request(&request).await?;

        info!(%room_id, request_id = %request.id, "join request cancelled");
        self.refresh_badge(room_id).await;
        Ok(request)
    }

    /// Pending requests of a room, oldest first. Owner only.
    pub async fn pending_requests(
        &self,
        room_id: RoomId,
        actor: UserId,
    ) -> Result<Vec<JoinRequest>, GameError> {
        let room = self.load_room(room_id).await?;
        room.ensure_owner(actor)?;

        let mut pending = self.pending(room_id).await?;
        pending.sort_by_key(|request| request.created_at);
        Ok(pending)
    }

    // Runs after the change is committed, so a failed count only skips the badge.
    async fn refresh_badge(&self, room_id: RoomId) {
        match self.pending(room_id).await {
            Ok(pending) => self.publish_badge(room_id, pending.len()),
            Err(_) => warn!(%room_id, "pending count unavailable; badge not refreshed"),
        }
    }

    fn publish_badge(&self, room_id: RoomId, pending_requests: usize) {
        self.events.publish(
            EventScope::Room(room_id),
            RoomEvent::BadgeUpdated(BadgeUpdate {
                room_id,
                pending_requests,
            }),
        );
    }

    async fn pending(&self, room_id: RoomId) -> Result<Vec<JoinRequest>, GameError> {
        self.store
            .list_join_requests(room_id, Some(JoinRequestStatus::Pending))
            .await
            .map_err(storage_failure("list_join_requests"))
    }

    async fn load_room(&self, room_id: RoomId) -> Result<Room, GameError> {
        self.store
            .get_room(room_id)
            .await
            .map_err(storage_failure("get_room"))?
            .ok_or(GameError::RoomNotFound)
    }

    async fn load_request(&self, request_id: JoinRequestId) -> Result<JoinRequest, GameError> {
        self.store
            .get_join_request(request_id)
            .await
            .map_err(storage_failure("get_join_request"))?
            .ok_or(GameError::RequestNotFound)
    }

    async fn save_request(&self, request: &JoinRequest) -> Result<(), GameError> {
        self.store
            .save_join_request(request)
            .await
            .map_err(storage_failure("save_join_request"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{
        FailureFlags, FixedClock, RecordingPublisher, RecordingStore, question_bank,
    };

    const OWNER: UserId = UserId(1);
    const ALICE: UserId = UserId(2);
    const BOB: UserId = UserId(3);

    struct Fixture {
        workflow: JoinRequestWorkflow,
        store: RecordingStore,
        events: RecordingPublisher,
        room_id: RoomId,
    }

    async fn fixture() -> Fixture {
        let store = RecordingStore::new(question_bank());
        let events = RecordingPublisher::new();
        let room = Room::new(OWNER, "en".to_string(), 20);
        store.save_room(&room).await.expect("seed room");
        let workflow = JoinRequestWorkflow {
            store: Arc::new(store.clone()),
            events: Arc::new(events.clone()),
            locks: RoomLocks::new(),
            clock: Arc::new(FixedClock(1_700_000_000)),
        };
        Fixture {
            workflow,
            store,
            events,
            room_id: room.id,
        }
    }

    #[tokio::test]
    async fn when_request_is_created_then_owner_view_and_badge_are_updated() {
        let fx = fixture().await;

        let request = fx
            .workflow
            .create(fx.room_id, ALICE, Some("  hi there  ".to_string()))
            .await
            .expect("expected request");

        assert_eq!(request.status, JoinRequestStatus::Pending);
        assert_eq!(request.message.as_deref(), Some("hi there"));
        assert_eq!(request.created_at, 1_700_000_000);
        let events = fx.events.events_for(EventScope::Room(fx.room_id));
        assert!(matches!(events[0], RoomEvent::JoinRequested(_)));
        assert!(matches!(
            events[1],
            RoomEvent::BadgeUpdated(BadgeUpdate { pending_requests: 1, .. })
        ));
    }

    #[tokio::test]
    async fn when_owner_requests_own_room_then_self_join() {
        let fx = fixture().await;

        assert_eq!(
            fx.workflow.create(fx.room_id, OWNER, None).await,
            Err(GameError::SelfJoin)
        );
        assert!(fx.events.is_empty());
    }

    #[tokio::test]
    async fn when_requester_already_has_pending_request_then_duplicate() {
        let fx = fixture().await;
        fx.workflow.create(fx.room_id, ALICE, None).await.expect("first");

        assert_eq!(
            fx.workflow.create(fx.room_id, ALICE, None).await,
            Err(GameError::DuplicateRequest)
        );
    }

    #[tokio::test]
    async fn when_message_is_too_long_then_invalid_message() {
        let fx = fixture().await;

        assert_eq!(
            fx.workflow
                .create(fx.room_id, ALICE, Some("x".repeat(501)))
                .await,
            Err(GameError::InvalidMessage)
        );
    }

    #[tokio::test]
    async fn when_owner_accepts_then_guest_is_seated_and_everyone_is_told() {
        let fx = fixture().await;
        let request = fx.workflow.create(fx.room_id, ALICE, None).await.expect("request");
        fx.events.clear();

        let room = fx.workflow.accept(request.id, OWNER).await.expect("accept");

        assert_eq!(room.guest_id, Some(ALICE));
        assert_eq!(room.status, RoomStatus::Ready);
        assert_eq!(
            fx.store.request(request.id).map(|request| request.status),
            Some(JoinRequestStatus::Accepted)
        );
        assert_eq!(
            fx.events.types_for(EventScope::Room(fx.room_id)),
            vec!["request_accepted", "room_update", "badge_update"]
        );
        let personal = fx.events.events_for(EventScope::User(ALICE));
        assert!(matches!(
            &personal[..],
            [RoomEvent::RequestAccepted(RequestResolution { redirect: Some(_), .. })]
        ));
    }

    #[tokio::test]
    async fn when_resolved_request_is_accepted_again_then_not_pending_without_side_effects() {
        let fx = fixture().await;
        let request = fx.workflow.create(fx.room_id, ALICE, None).await.expect("request");
        fx.workflow.accept(request.id, OWNER).await.expect("accept");
        let saves = fx.store.room_saves();
        fx.events.clear();

        assert_eq!(
            fx.workflow.accept(request.id, OWNER).await,
            Err(GameError::NotPending)
        );
        assert_eq!(
            fx.workflow.reject(request.id, OWNER).await,
            Err(GameError::NotPending)
        );
        assert_eq!(fx.store.room_saves(), saves);
        assert!(fx.events.is_empty());
    }

    #[tokio::test]
    async fn when_seat_is_taken_then_later_accept_is_room_full_and_stays_pending() {
        let fx = fixture().await;
        let first = fx.workflow.create(fx.room_id, ALICE, None).await.expect("first");
        let second = fx.workflow.create(fx.room_id, BOB, None).await.expect("second");
        fx.workflow.accept(first.id, OWNER).await.expect("accept first");

        assert_eq!(
            fx.workflow.accept(second.id, OWNER).await,
            Err(GameError::RoomFull)
        );
        assert_eq!(
            fx.store.request(second.id).map(|request| request.status),
            Some(JoinRequestStatus::Pending)
        );
        assert_eq!(
            fx.store.room(fx.room_id).and_then(|room| room.guest_id),
            Some(ALICE)
        );
    }

    #[tokio::test]
    async fn when_two_accepts_race_then_exactly_one_guest_is_seated() {
        let fx = fixture().await;
        let first = fx.workflow.create(fx.room_id, ALICE, None).await.expect("first");
        let second = fx.workflow.create(fx.room_id, BOB, None).await.expect("second");

        let (a, b) = tokio::join!(
            fx.workflow.accept(first.id, OWNER),
            fx.workflow.accept(second.id, OWNER)
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn when_non_owner_accepts_then_not_owner() {
        let fx = fixture().await;
        let request = fx.workflow.create(fx.room_id, ALICE, None).await.expect("request");

        assert_eq!(
            fx.workflow.accept(request.id, BOB).await,
            Err(GameError::NotOwner)
        );
        assert_eq!(
            fx.store.request(request.id).map(|request| request.status),
            Some(JoinRequestStatus::Pending)
        );
    }

    #[tokio::test]
    async fn when_request_is_missing_then_request_not_found() {
        let fx = fixture().await;

        assert_eq!(
            fx.workflow.accept(JoinRequestId::new(), OWNER).await,
            Err(GameError::RequestNotFound)
        );
    }

    #[tokio::test]
    async fn when_owner_rejects_then_requester_is_told_and_badge_drops() {
        let fx = fixture().await;
        let request = fx.workflow.create(fx.room_id, ALICE, None).await.expect("request");
        fx.events.clear();

        let rejected = fx.workflow.reject(request.id, OWNER).await.expect("reject");

        assert_eq!(rejected.status, JoinRequestStatus::Rejected);
        assert_eq!(
            fx.events.types_for(EventScope::User(ALICE)),
            vec!["request_rejected"]
        );
        assert!(matches!(
            fx.events.events_for(EventScope::Room(fx.room_id))[..],
            [RoomEvent::BadgeUpdated(BadgeUpdate { pending_requests: 0, .. })]
        ));
    }

    #[tokio::test]
    async fn when_requester_cancels_then_request_is_cancelled_and_can_be_resent() {
        let fx = fixture().await;
        let request = fx.workflow.create(fx.room_id, ALICE, None).await.expect("request");

        let cancelled = fx.workflow.cancel(fx.room_id, ALICE).await.expect("cancel");

        assert_eq!(cancelled.id, request.id);
        assert_eq!(cancelled.status, JoinRequestStatus::Cancelled);
        assert_eq!(
            fx.workflow.cancel(fx.room_id, ALICE).await,
            Err(GameError::RequestNotFound)
        );
        assert!(fx.workflow.create(fx.room_id, ALICE, None).await.is_ok());
    }

    #[tokio::test]
    async fn when_owner_lists_pending_then_only_pending_are_returned() {
        let fx = fixture().await;
        let first = fx.workflow.create(fx.room_id, ALICE, None).await.expect("first");
        let second = fx.workflow.create(fx.room_id, BOB, None).await.expect("second");
        fx.workflow.reject(first.id, OWNER).await.expect("reject");

        let pending = fx
            .workflow
            .pending_requests(fx.room_id, OWNER)
            .await
            .expect("list");

        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id]);
        assert_eq!(
            fx.workflow.pending_requests(fx.room_id, ALICE).await,
            Err(GameError::NotOwner)
        );
    }

    #[tokio::test]
    async fn when_commit_fails_then_nothing_changes_and_nothing_is_broadcast() {
        let fx = fixture().await;
        let request = fx.workflow.create(fx.room_id, ALICE, None).await.expect("request");
        fx.events.clear();
        fx.store.set_failures(FailureFlags {
            commit_acceptance: true,
            ..FailureFlags::default()
        });

        assert_eq!(
            fx.workflow.accept(request.id, OWNER).await,
            Err(GameError::StorageFailure)
        );
        assert!(fx.events.is_empty());
        assert_eq!(
            fx.store.request(request.id).map(|request| request.status),
            Some(JoinRequestStatus::Pending)
        );
        assert_eq!(fx.store.room(fx.room_id).and_then(|room| room.guest_id), None);
    }
}
