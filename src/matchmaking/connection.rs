//! Core-side view of a client connection

use tokio::sync::mpsc;
use tracing::debug;

use crate::game::PlayerId;
use crate::ws::protocol::ServerMsg;

use crate::game::constants::MAX_MISSED_PROBES;

/// Instructions for a connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMsg),
    /// Liveness probe
    Ping,
    /// Close the socket and stop writing
    Close,
}

pub type OutboundTx = mpsc::UnboundedSender<Outbound>;
pub type OutboundRx = mpsc::UnboundedReceiver<Outbound>;

/// Result of a liveness sweep for one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Answered since the last sweep, or still within tolerance
    Alive,
    /// Missed too many consecutive probes
    Unreachable,
}

/// An admitted player. The socket itself stays with the gateway; this only
/// holds the sending half of its outbound queue.
#[derive(Debug)]
pub struct PlayerConnection {
    pub id: PlayerId,
    pub nickname: Option<String>,
    tx: OutboundTx,
    answered_probe: bool,
    missed_probes: u8,
}

impl PlayerConnection {
    pub fn new(id: PlayerId, tx: OutboundTx) -> Self {
        Self {
            id,
            nickname: None,
            tx,
            answered_probe: true,
            missed_probes: 0,
        }
    }

    /// Fire-and-forget send. A closed queue means the gateway is already
    /// tearing the connection down and will report the disconnect itself.
    pub fn send(&self, msg: ServerMsg) {
        if self.tx.send(Outbound::Message(msg)).is_err() {
            debug!(player_id = %self.id, "Outbound queue closed, message dropped");
        }
    }

    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }

    /// The client answered a probe
    pub fn mark_alive(&mut self) {
        self.answered_probe = true;
    }

    /// Account for the previous probe and send a new one
    pub fn probe(&mut self) -> ProbeStatus {
        if self.answered_probe {
            self.missed_probes = 0;
        } else {
            self.missed_probes = self.missed_probes.saturating_add(1);
        }

        if self.missed_probes >= MAX_MISSED_PROBES {
            return ProbeStatus::Unreachable;
        }

        self.answered_probe = false;
        let _ = self.tx.send(Outbound::Ping);
        ProbeStatus::Alive
    }
}
