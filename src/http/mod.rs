//! HTTP surface: health, statistics, and the WebSocket upgrade

pub mod routes;

pub use routes::build_router;
