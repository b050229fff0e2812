// Framework bootstrap for the room server runtime.

use crate::domain::{EventPublisher, FragmentRenderer, Question, RoomStore};
use crate::frameworks::{config, db};
use crate::interface_adapters::postgres::PostgresStore;
use crate::interface_adapters::publisher::HubPublisher;
use crate::interface_adapters::question_bank::QuestionBank;
use crate::interface_adapters::render::MaudRenderer;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::{AppState, InMemoryStore, SystemClock};
use crate::use_cases::{BroadcastHub, JoinRequestWorkflow, RoomLocks, RoomMachine, RoomSettings};

use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;
    let hub = state.hub.clone();
    let app = app(state);

    tracing::info!(%address, "listening");

    // Open event streams never finish on their own, so the hub is closed
    // before the server waits for in-flight connections.
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
            hub.close_all();
        })
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn load_question_bank() -> Result<QuestionBank> {
    let bank = match config::question_bank_path() {
        Some(path) => QuestionBank::load(&path).map_err(|e| {
            std::io::Error::other(format!(
                "failed to load question bank {}: {e}",
                path.display()
            ))
        })?,
        None => QuestionBank::parse(config::BUNDLED_QUESTION_BANK)
            .map_err(|e| std::io::Error::other(format!("bundled question bank invalid: {e}")))?,
    };
    tracing::debug!(categories = bank.categories.len(), "question bank loaded");
    Ok(bank)
}

async fn build_store(bank: &QuestionBank) -> Result<Arc<dyn RoomStore>> {
    let Some(database_url) = config::database_url() else {
        let questions: Vec<Question> = bank.questions();
        tracing::info!(questions = questions.len(), "using in-memory store");
        return Ok(Arc::new(InMemoryStore::new(questions)));
    };

    let pool = db::connect_pool(&database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to connect to database: {e}")))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to run migrations: {e}")))?;

    let store = PostgresStore { db: pool };
    store
        .seed_questions(bank)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to seed question bank: {e}")))?;
    tracing::info!("using postgres store");
    Ok(Arc::new(store))
}

async fn build_state() -> Result<Arc<AppState>> {
    let bank = load_question_bank()?;
    let store = build_store(&bank).await?;

    // One hub per process; every stream and publisher shares it.
    let hub = BroadcastHub::new(config::subscriber_buffer());
    let mode = config::broadcast_mode();
    let renderer: Arc<dyn FragmentRenderer> = Arc::new(MaudRenderer);
    let events: Arc<dyn EventPublisher> = Arc::new(HubPublisher::new(hub.clone(), mode, renderer));
    tracing::debug!(?mode, "broadcast mode configured");

    // Rooms and join requests serialize on the same per-room locks.
    let locks = RoomLocks::new();

    let rooms = Arc::new(RoomMachine {
        store: store.clone(),
        events: events.clone(),
        locks: locks.clone(),
        settings: RoomSettings {
            default_language: config::default_language(),
            default_max_questions: config::default_max_questions(),
        },
    });
    let join_requests = Arc::new(JoinRequestWorkflow {
        store,
        events,
        locks,
        clock: Arc::new(SystemClock),
    });

    Ok(Arc::new(AppState {
        rooms,
        join_requests,
        hub,
        keepalive: config::keepalive_interval(),
    }))
}
