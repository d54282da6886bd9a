//! In-memory score table with write-through persistence

use tracing::{debug, info};

use super::{ScoreRecord, SnapshotWriter};

/// Ledger errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("No score record for nickname {0:?}")]
    UnknownNickname(String),
}

/// Ordered (nickname, score) records with unique nicknames.
///
/// Every successful mutation queues a full snapshot on the writer.
pub struct ScoreLedger {
    records: Vec<ScoreRecord>,
    writer: SnapshotWriter,
}

impl ScoreLedger {
    /// Wrap records already loaded (and validated) from the store
    pub fn new(records: Vec<ScoreRecord>, writer: SnapshotWriter) -> Self {
        Self { records, writer }
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    #[cfg(test)]
    pub fn score(&self, nickname: &str) -> Option<i64> {
        self.records
            .iter()
            .find(|r| r.nickname == nickname)
            .map(|r| r.score)
    }

    /// Add a zero-score record if `nickname` is new. Returns true on insert.
    pub fn upsert_nickname(&mut self, nickname: &str) -> bool {
        if self.records.iter().any(|r| r.nickname == nickname) {
            return false;
        }

        self.records.push(ScoreRecord::new(nickname, 0));
        info!(nickname, "New nickname added to score table");
        self.persist();
        true
    }

    /// Apply `delta` to an existing record, returning the new score
    pub fn adjust_score(&mut self, nickname: &str, delta: i64) -> Result<i64, LedgerError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.nickname == nickname)
            .ok_or_else(|| LedgerError::UnknownNickname(nickname.to_string()))?;

        record.score += delta;
        let score = record.score;
        debug!(nickname, delta, score, "Score adjusted");
        self.persist();
        Ok(score)
    }

    fn persist(&self) {
        self.writer.submit(self.records.clone());
    }
}
