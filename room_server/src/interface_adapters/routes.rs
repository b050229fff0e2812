use crate::interface_adapters::handlers::health;
use crate::interface_adapters::handlers::join_requests::{
    accept_join_request, cancel_join_request, create_join_request, list_join_requests,
    reject_join_request,
};
use crate::interface_adapters::handlers::rooms::{
    create_room, delete_room, draw_question, finish_game, join_room, leave_room, next_question,
    room_state, set_categories, set_ready, start_game, submit_answer, toggle_category, typing,
};
use crate::interface_adapters::handlers::stream::{room_events, user_events};
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rooms", post(create_room))
        .route("/rooms/{id}", get(room_state).delete(delete_room))
        .route("/rooms/{id}/join", post(join_room))
        .route("/rooms/{id}/leave", post(leave_room))
        .route("/rooms/{id}/ready", post(set_ready))
        .route("/rooms/{id}/start", post(start_game))
        .route("/rooms/{id}/categories", put(set_categories))
        .route(
            "/rooms/{id}/categories/{category_id}/toggle",
            post(toggle_category),
        )
        .route("/rooms/{id}/questions/draw", post(draw_question))
        .route("/rooms/{id}/questions/next", post(next_question))
        .route("/rooms/{id}/answers", post(submit_answer))
        .route("/rooms/{id}/finish", post(finish_game))
        .route("/rooms/{id}/typing", post(typing))
        .route(
            "/rooms/{id}/join-requests",
            get(list_join_requests)
                .post(create_join_request)
                .delete(cancel_join_request),
        )
        .route("/join-requests/{id}/accept", post(accept_join_request))
        .route("/join-requests/{id}/reject", post(reject_join_request))
        .route("/rooms/{id}/events", get(room_events))
        .route("/events", get(user_events))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventPublisher, FragmentRenderer, RoomStore};
    use crate::interface_adapters::publisher::{BroadcastMode, HubPublisher};
    use crate::interface_adapters::render::MaudRenderer;
    use crate::interface_adapters::state::{InMemoryStore, SystemClock};
    use crate::use_cases::test_support::question_bank;
    use crate::use_cases::{BroadcastHub, JoinRequestWorkflow, RoomLocks, RoomMachine, RoomSettings};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn build_test_app() -> Router {
        let store: Arc<dyn RoomStore> = Arc::new(InMemoryStore::new(question_bank()));
        let hub = BroadcastHub::new(16);
        let renderer: Arc<dyn FragmentRenderer> = Arc::new(MaudRenderer);
        let events: Arc<dyn EventPublisher> =
            Arc::new(HubPublisher::new(hub.clone(), BroadcastMode::Json, renderer));
        let locks = RoomLocks::new();

        let rooms = Arc::new(RoomMachine {
            store: store.clone(),
            events: events.clone(),
            locks: locks.clone(),
            settings: RoomSettings {
                default_language: "en".to_string(),
                default_max_questions: 20,
            },
        });
        let join_requests = Arc::new(JoinRequestWorkflow {
            store,
            events,
            locks,
            clock: Arc::new(SystemClock),
        });

        app(Arc::new(AppState {
            rooms,
            join_requests,
            hub,
            keepalive: Duration::from_secs(15),
        }))
    }

    fn request(method: &str, uri: &str, user: Option<i64>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("expected request to build"),
            None => builder.body(Body::empty()).expect("expected request to build"),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("expected response body");
        serde_json::from_slice(&body).expect("expected json body")
    }

    #[tokio::test]
    async fn when_health_is_requested_then_returns_ok_without_identity() {
        let app = build_test_app();

        let response = app
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["status"], "ok");
    }

    #[tokio::test]
    async fn when_user_header_is_missing_then_returns_401() {
        let app = build_test_app();

        let response = app
            .oneshot(request("POST", "/rooms", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let payload = json_body(response).await;
        assert_eq!(payload["code"], "unauthenticated");
    }

    #[tokio::test]
    async fn when_room_id_is_malformed_then_returns_400() {
        let app = build_test_app();

        let response = app
            .oneshot(request("POST", "/rooms/not-a-uuid/join", Some(2), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = json_body(response).await;
        assert_eq!(payload["code"], "invalid_room_id");
    }

    #[tokio::test]
    async fn when_room_is_unknown_then_returns_404() {
        let app = build_test_app();
        let uri = format!("/rooms/{}", uuid::Uuid::new_v4());

        let response = app
            .oneshot(request("GET", &uri, Some(1), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let payload = json_body(response).await;
        assert_eq!(payload["code"], "room_not_found");
    }

    #[tokio::test]
    async fn when_guest_joins_created_room_then_room_is_full_for_a_third_user() {
        let app = build_test_app();

        let created = app
            .clone()
            .oneshot(request("POST", "/rooms", Some(1), Some(r#"{"language":"de"}"#)))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let room = json_body(created).await;
        assert_eq!(room["language"], "de");
        let room_id = room["room_id"].as_str().expect("expected room id").to_string();

        let joined = app
            .clone()
            .oneshot(request("POST", &format!("/rooms/{room_id}/join"), Some(2), None))
            .await
            .unwrap();
        assert_eq!(joined.status(), StatusCode::OK);
        let room = json_body(joined).await;
        assert_eq!(room["guest_id"], 2);

        let third = app
            .oneshot(request("POST", &format!("/rooms/{room_id}/join"), Some(3), None))
            .await
            .unwrap();
        assert_eq!(third.status(), StatusCode::CONFLICT);
        let payload = json_body(third).await;
        assert_eq!(payload["code"], "room_full");
    }

    #[tokio::test]
    async fn when_answer_action_is_unknown_then_returns_400() {
        let app = build_test_app();
        let created = app
            .clone()
            .oneshot(request("POST", "/rooms", Some(1), None))
            .await
            .unwrap();
        let room = json_body(created).await;
        let room_id = room["room_id"].as_str().expect("expected room id").to_string();

        let response = app
            .oneshot(request(
                "POST",
                &format!("/rooms/{room_id}/answers"),
                Some(1),
                Some(r#"{"question_id":1,"text":"x","action":"shrugged"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = json_body(response).await;
        assert_eq!(payload["code"], "invalid_answer");
    }

    #[tokio::test]
    async fn when_route_is_called_with_wrong_method_then_returns_405() {
        let app = build_test_app();

        let response = app
            .oneshot(request("GET", "/rooms", Some(1), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
