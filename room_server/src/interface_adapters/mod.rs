// Interface adapters: HTTP surface, event streams, storage and rendering.

pub mod handlers;
pub mod http;
pub mod postgres;
pub mod protocol;
pub mod publisher;
pub mod question_bank;
pub mod render;
pub mod routes;
pub mod state;
