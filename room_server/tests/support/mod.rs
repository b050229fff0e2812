// Integration harness: one live room server per test binary.
use std::net::SocketAddr;
use std::sync::{OnceLock, mpsc};
use std::time::Duration;

static SERVER: OnceLock<String> = OnceLock::new();

/// Base URL of the shared server, starting it on first use.
///
/// The listener is bound before its address is handed back, so connections
/// made after this returns queue in the backlog until the router is up.
pub fn ensure_server() -> &'static str {
    SERVER.get_or_init(|| {
        let (bound_tx, bound_rx) = mpsc::channel::<SocketAddr>();
        // Each #[tokio::test] gets a runtime that dies with the test, so the
        // server lives on a dedicated thread with its own.
        std::thread::Builder::new()
            .name("room-server".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .expect("server runtime");
                runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                        .await
                        .expect("bind ephemeral port");
                    bound_tx
                        .send(listener.local_addr().expect("listener address"))
                        .expect("test thread waiting for address");
                    room_server::run(listener).await.expect("room server exited");
                });
            })
            .expect("spawn server thread");

        let addr = bound_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("server did not bind in time");
        format!("http://{addr}")
    })
}

// User ids are per-test so concurrently running tests never share a room seat.
pub fn unique_user() -> i64 {
    use std::sync::atomic::{AtomicI64, Ordering};
    static NEXT: AtomicI64 = AtomicI64::new(1000);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

pub async fn post_json(
    client: &reqwest::Client,
    url: String,
    user: i64,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(url)
        .header("x-user-id", user.to_string())
        .json(&body)
        .send()
        .await
        .expect("request should succeed")
}

pub async fn post_empty(client: &reqwest::Client, url: String, user: i64) -> reqwest::Response {
    client
        .post(url)
        .header("x-user-id", user.to_string())
        .send()
        .await
        .expect("request should succeed")
}
