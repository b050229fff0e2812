// Use cases layer: room workflows and the realtime hub.

pub mod hub;
pub mod join_requests;
pub mod locks;
pub mod room_machine;

#[cfg(test)]
pub(crate) mod test_support;

pub use hub::{BroadcastHub, HubEvent, Payload, Subscription, SubscriptionId};
pub use join_requests::JoinRequestWorkflow;
pub use locks::{RoomGuard, RoomLocks};
pub use room_machine::{
    CreateRoomInput, RoomMachine, RoomSettings, RoomStateView, SubmitAnswerInput,
};
