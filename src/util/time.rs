//! Process uptime tracking

use std::time::Instant;

static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Record the server start instant (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Seconds since `init_server_time`, zero if it was never called
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}
