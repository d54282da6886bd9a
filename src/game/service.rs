//! Async shell around the session: locking, timers, liveness sweep

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::matchmaking::{OutboundRx, Slot};
use crate::store::ScoreRecord;
use crate::util::rng::generate_player_id;
use crate::ws::protocol::ClientMsg;

use super::coordinator::PendingAdvance;
use super::session::{GameSession, SessionStatus};
use super::PlayerId;

/// Timing knobs for the service
#[derive(Debug, Clone, Copy)]
pub struct ServiceTiming {
    /// Delay between an accepted shot and the next round
    pub round_advance_delay: Duration,
    /// Liveness sweep period
    pub heartbeat_interval: Duration,
}

/// Shared handle to the one duel this process hosts.
///
/// The session lock is never held across an await point.
pub struct GameService {
    session: Mutex<GameSession>,
    timing: ServiceTiming,
}

impl GameService {
    pub fn new(session: GameSession, timing: ServiceTiming) -> Self {
        Self {
            session: Mutex::new(session),
            timing,
        }
    }

    /// Admit a new connection. Returns its id, slot, and outbound queue.
    pub fn connect(&self) -> (PlayerId, Slot, OutboundRx) {
        let id = generate_player_id();
        let (tx, rx) = mpsc::unbounded_channel();
        let slot = self.session.lock().connect(id.clone(), tx);
        (id, slot, rx)
    }

    /// Close path for every kind of disconnect
    pub fn disconnect(&self, id: &PlayerId) {
        self.session.lock().disconnect(id);
    }

    pub fn mark_alive(&self, id: &PlayerId) {
        self.session.lock().mark_alive(id);
    }

    /// Route a validated inbound message
    pub fn handle_message(self: &Arc<Self>, id: &PlayerId, msg: ClientMsg) {
        match msg {
            ClientMsg::Nickname { nickname } => {
                self.session.lock().set_nickname(id, &nickname);
            }
            ClientMsg::Shot { angle } => {
                let pending = self.session.lock().shoot(id, angle);
                if let Some(pending) = pending {
                    self.schedule_advance(pending);
                }
            }
        }
    }

    pub fn statistics(&self) -> Vec<ScoreRecord> {
        self.session.lock().statistics()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.lock().status()
    }

    /// Fire the turn advance after the fixed delay. The session decides on
    /// arrival whether the ticket is still good.
    fn schedule_advance(self: &Arc<Self>, pending: PendingAdvance) {
        let service = Arc::clone(self);
        let delay = self.timing.round_advance_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            service.session.lock().advance_round(&pending);
        });
    }

    /// Periodic liveness sweep, runs for the life of the process
    pub async fn run_liveness(self: Arc<Self>) {
        info!(
            interval_secs = self.timing.heartbeat_interval.as_secs(),
            "Liveness sweep started"
        );
        let mut ticker = interval(self.timing.heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let reclaimed = self.session.lock().sweep_liveness();
            let status = self.status();
            debug!(
                reclaimed = reclaimed.len(),
                active = status.active_players,
                waiting = status.waiting_players,
                "Liveness sweep"
            );
        }
    }
}
