// Domain layer: room entities, state transitions, events and ports.

pub mod errors;
pub mod events;
pub mod ids;
pub mod join_request;
pub mod ports;
pub mod question;
pub mod room;

pub use errors::{ErrorKind, GameError, RenderError, StoreError};
pub use events::{EventScope, RoomEvent, SwapHint};
pub use ids::{AnswerId, CategoryId, JoinRequestId, QuestionId, RoomId, UserId};
pub use join_request::{JoinRequest, JoinRequestStatus};
pub use ports::{Clock, EventPublisher, FragmentRenderer, RoomStore};
pub use question::{Answer, AnswerAction, Question};
pub use room::{Room, RoomStatus};
