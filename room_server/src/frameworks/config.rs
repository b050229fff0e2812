use std::{env, path::PathBuf, time::Duration};

use crate::interface_adapters::publisher::BroadcastMode;

// Runtime/server settings, read from the environment with defaults.

pub fn http_port() -> u16 {
    env::var("ROOM_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3004)
}

pub fn broadcast_mode() -> BroadcastMode {
    env::var("BROADCAST_MODE")
        .ok()
        .and_then(|value| BroadcastMode::parse(&value))
        .unwrap_or(BroadcastMode::Markup)
}

// Per-subscriber queue length before events are dropped for that stream.
pub fn subscriber_buffer() -> usize {
    env::var("SUBSCRIBER_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(64)
}

pub fn keepalive_interval() -> Duration {
    let secs = env::var("KEEPALIVE_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(15);
    Duration::from_secs(secs)
}

pub fn default_max_questions() -> u32 {
    env::var("DEFAULT_MAX_QUESTIONS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| (1..=100).contains(value))
        .unwrap_or(20)
}

pub fn default_language() -> String {
    env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "en".to_string())
}

// Postgres is used only when this is set.
pub fn database_url() -> Option<String> {
    env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())
}

pub fn question_bank_path() -> Option<PathBuf> {
    env::var("QUESTION_BANK_PATH")
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

pub const BUNDLED_QUESTION_BANK: &str = include_str!("../../questions.toml");
