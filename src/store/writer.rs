//! Background task that persists ledger snapshots off the session lock

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{ScoreRecord, ScoreStore};

/// Work for the writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterCommand {
    /// Persist this full snapshot
    Save(Vec<ScoreRecord>),
    /// Write whatever is queued, then stop
    Shutdown,
}

pub type WriterRx = mpsc::UnboundedReceiver<WriterCommand>;

/// Handle for queueing full-ledger snapshots to be written.
///
/// The writer task is the only thing that touches the store, so snapshots
/// land in the order they were queued.
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl SnapshotWriter {
    /// Spawn the writer task for `store`
    pub fn spawn(store: Arc<dyn ScoreStore>) -> (Self, JoinHandle<()>) {
        let (writer, rx) = Self::channel();
        let handle = tokio::spawn(run_writer(store, rx));
        (writer, handle)
    }

    /// Writer without a task, for callers that drain the receiver themselves
    pub fn channel() -> (Self, WriterRx) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a snapshot. Never blocks.
    pub fn submit(&self, records: Vec<ScoreRecord>) {
        if self.tx.send(WriterCommand::Save(records)).is_err() {
            error!("Score writer is gone, snapshot dropped");
        }
    }

    /// Ask the task to flush and exit, even while other handles are alive
    pub fn shutdown(&self) {
        if self.tx.send(WriterCommand::Shutdown).is_err() {
            debug!("Score writer already stopped");
        }
    }
}

/// Write snapshots until shutdown is requested or every sender is dropped.
///
/// Snapshots that pile up while a write is in flight are collapsed to the
/// newest one, since each snapshot supersedes the previous.
pub async fn run_writer(store: Arc<dyn ScoreStore>, mut rx: WriterRx) {
    let mut stopping = false;

    while !stopping {
        let mut latest = match rx.recv().await {
            Some(WriterCommand::Save(records)) => records,
            Some(WriterCommand::Shutdown) | None => break,
        };

        let mut skipped = 0usize;
        while let Ok(command) = rx.try_recv() {
            match command {
                WriterCommand::Save(newer) => {
                    latest = newer;
                    skipped += 1;
                }
                WriterCommand::Shutdown => {
                    stopping = true;
                    break;
                }
            }
        }
        if skipped > 0 {
            debug!(skipped, "Collapsed queued score snapshots");
        }

        let store = store.clone();
        let result = tokio::task::spawn_blocking(move || store.save(&latest)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Failed to persist scores"),
            Err(e) => error!(error = %e, "Score write task panicked"),
        }
    }
    info!("Score writer stopped");
}
