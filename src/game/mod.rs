//! Duel rules: ballistics, rounds, and the session that ties them together

pub mod ballistics;
pub mod constants;
pub mod coordinator;
pub mod service;
pub mod session;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use coordinator::RoundCoordinator;
pub use service::GameService;
pub use session::GameSession;

/// Opaque connection id, unique for the connection's lifetime
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
