//! Score persistence: the in-memory ledger and its backing store

pub mod file;
pub mod ledger;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use file::JsonFileStore;
pub use ledger::ScoreLedger;
pub use writer::SnapshotWriter;

/// One row of the score table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub nickname: String,
    pub score: i64,
}

impl ScoreRecord {
    pub fn new(nickname: impl Into<String>, score: i64) -> Self {
        Self {
            nickname: nickname.into(),
            score,
        }
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access score file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Score file is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Score file lists nickname {0:?} more than once")]
    DuplicateNickname(String),
}

/// Load/store of the full score table
pub trait ScoreStore: Send + Sync + 'static {
    /// Read the stored snapshot. Fails if it does not validate.
    fn load(&self) -> Result<Vec<ScoreRecord>, StoreError>;

    /// Overwrite the stored snapshot
    fn save(&self, records: &[ScoreRecord]) -> Result<(), StoreError>;
}
