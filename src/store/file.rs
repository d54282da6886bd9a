//! JSON file backed score store

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ScoreRecord, ScoreStore, StoreError};

/// On-disk layout: the whole table under a single `data` key
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot<T> {
    data: T,
}

/// Score store persisted as one JSON document, rewritten on every save
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ScoreStore for JsonFileStore {
    fn load(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No score file yet, starting with an empty ledger");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot<Vec<ScoreRecord>> = serde_json::from_slice(&bytes)?;

        check_unique(&snapshot.data)?;

        info!(
            path = %self.path.display(),
            records = snapshot.data.len(),
            "Score file loaded"
        );
        Ok(snapshot.data)
    }

    fn save(&self, records: &[ScoreRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&Snapshot { data: records })?;
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), records = records.len(), "Score file written");
        Ok(())
    }
}

fn check_unique(records: &[ScoreRecord]) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.nickname.as_str()) {
            return Err(StoreError::DuplicateNickname(record.nickname.clone()));
        }
    }
    Ok(())
}
