mod support;

use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;
use support::{ensure_server, post_empty, post_json, unique_user};

// Reads stream chunks until `event_name` shows up on an `event:` line.
async fn read_until_event(res: &mut reqwest::Response, event_name: &str) -> String {
    let needle = format!("event: {event_name}");
    let mut seen = String::new();
    let read = async {
        while let Some(chunk) = res.chunk().await.expect("stream chunk") {
            seen.push_str(&String::from_utf8_lossy(&chunk));
            if seen.contains(&needle) {
                return;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .unwrap_or_else(|_| panic!("no {event_name} event within timeout; got: {seen}"));
    seen
}

async fn open_stream(client: &reqwest::Client, url: String, user: i64) -> reqwest::Response {
    client
        .get(url)
        .header("x-user-id", user.to_string())
        .send()
        .await
        .expect("stream request should succeed")
}

async fn create_room(client: &reqwest::Client, base_url: &str, owner: i64) -> String {
    let res = post_json(client, format!("{base_url}/rooms"), owner, json!({})).await;
    let room: Value = res.json().await.expect("expected json body");
    room["room_id"].as_str().expect("room id").to_string()
}

#[tokio::test]
async fn when_room_stream_opens_then_connected_arrives_before_room_events() {
    let base_url = ensure_server();
    let client = reqwest::Client::new();
    let owner = unique_user();
    let guest = unique_user();
    let room_id = create_room(&client, base_url, owner).await;

    let mut stream = open_stream(&client, format!("{base_url}/rooms/{room_id}/events"), owner).await;
    assert_eq!(stream.status(), StatusCode::OK);
    let content_type = stream
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let first = read_until_event(&mut stream, "connected").await;
    assert!(!first.contains("event: room_update"));

    let res = post_empty(&client, format!("{base_url}/rooms/{room_id}/join"), guest).await;
    assert_eq!(res.status(), StatusCode::OK);

    read_until_event(&mut stream, "room_update").await;
}

#[tokio::test]
async fn when_owner_accepts_then_requester_stream_gets_request_accepted() {
    let base_url = ensure_server();
    let client = reqwest::Client::new();
    let owner = unique_user();
    let guest = unique_user();
    let room_id = create_room(&client, base_url, owner).await;

    let mut owner_room = open_stream(&client, format!("{base_url}/rooms/{room_id}/events"), owner).await;
    read_until_event(&mut owner_room, "connected").await;
    let mut guest_personal = open_stream(&client, format!("{base_url}/events"), guest).await;
    read_until_event(&mut guest_personal, "connected").await;

    let res = post_json(
        &client,
        format!("{base_url}/rooms/{room_id}/join-requests"),
        guest,
        json!({}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let request: Value = res.json().await.expect("expected json body");
    let request_id = request["id"].as_str().expect("request id").to_string();

    read_until_event(&mut owner_room, "join_request").await;

    let res = post_empty(&client, format!("{base_url}/join-requests/{request_id}/accept"), owner).await;
    assert_eq!(res.status(), StatusCode::OK);

    let frames = read_until_event(&mut guest_personal, "request_accepted").await;
    assert!(frames.contains(&format!("/rooms/{room_id}")));
}

#[tokio::test]
async fn when_room_does_not_exist_then_stream_is_refused() {
    let base_url = ensure_server();
    let client = reqwest::Client::new();
    let url = format!("{base_url}/rooms/{}/events", uuid::Uuid::new_v4());

    let res = open_stream(&client, url, unique_user()).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
