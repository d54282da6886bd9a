//! Active pair plus FIFO waiting queue

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::game::constants::MAX_ACTIVE_PLAYERS;
use crate::game::PlayerId;
use crate::ws::protocol::ServerMsg;

use super::connection::PlayerConnection;

/// Where a connection sits in the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Active,
    Waiting,
}

/// The duel roster.
///
/// A connection id is in at most one of `active` and `waiting`, and `active`
/// never holds more than `MAX_ACTIVE_PLAYERS` entries.
#[derive(Debug, Default)]
pub struct Roster {
    active: Vec<PlayerConnection>,
    waiting: VecDeque<PlayerConnection>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat the connection if a seat is free, otherwise queue it
    pub fn admit(&mut self, conn: PlayerConnection) -> Slot {
        debug_assert!(!self.contains(&conn.id), "connection admitted twice");

        let id = conn.id.clone();
        let slot = if self.active.len() < MAX_ACTIVE_PLAYERS {
            self.active.push(conn);
            Slot::Active
        } else {
            self.waiting.push_back(conn);
            Slot::Waiting
        };

        info!(
            player_id = %id,
            slot = ?slot,
            active = self.active.len(),
            waiting = self.waiting.len(),
            "Connection admitted"
        );
        slot
    }

    /// Remove the id from whichever set holds it. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &PlayerId) -> Option<(Slot, PlayerConnection)> {
        if let Some(pos) = self.active.iter().position(|c| &c.id == id) {
            return Some((Slot::Active, self.active.remove(pos)));
        }
        if let Some(pos) = self.waiting.iter().position(|c| &c.id == id) {
            return self.waiting.remove(pos).map(|c| (Slot::Waiting, c));
        }
        debug!(player_id = %id, "Remove for unknown connection ignored");
        None
    }

    /// Move the head of the queue into a free seat
    pub fn promote_next(&mut self) -> Option<&PlayerConnection> {
        if self.active.len() >= MAX_ACTIVE_PLAYERS {
            return None;
        }
        let next = self.waiting.pop_front()?;
        info!(player_id = %next.id, "Waiting connection promoted to the duel");
        self.active.push(next);
        self.active.last()
    }

    pub fn is_full(&self) -> bool {
        self.active.len() == MAX_ACTIVE_PLAYERS
    }

    pub fn active(&self) -> &[PlayerConnection] {
        &self.active
    }

    #[cfg(test)]
    pub fn waiting(&self) -> impl Iterator<Item = &PlayerConnection> {
        self.waiting.iter()
    }

    pub fn active_ids(&self) -> Vec<PlayerId> {
        self.active.iter().map(|c| c.id.clone()).collect()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn slot_of(&self, id: &PlayerId) -> Option<Slot> {
        if self.active.iter().any(|c| &c.id == id) {
            Some(Slot::Active)
        } else if self.waiting.iter().any(|c| &c.id == id) {
            Some(Slot::Waiting)
        } else {
            None
        }
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.slot_of(id).is_some()
    }

    /// Active and waiting connections, active first
    pub fn iter(&self) -> impl Iterator<Item = &PlayerConnection> {
        self.active.iter().chain(self.waiting.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlayerConnection> {
        self.active.iter_mut().chain(self.waiting.iter_mut())
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerConnection> {
        self.iter().find(|c| &c.id == id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut PlayerConnection> {
        self.iter_mut().find(|c| &c.id == id)
    }

    /// The active player other than `id`
    pub fn opponent_of(&self, id: &PlayerId) -> Option<&PlayerConnection> {
        if !self.active.iter().any(|c| &c.id == id) {
            return None;
        }
        self.active.iter().find(|c| &c.id != id)
    }

    /// Whether the active pair is exactly `ids`, in any order
    pub fn is_pair(&self, ids: &[PlayerId; 2]) -> bool {
        self.is_full() && ids.iter().all(|id| self.active.iter().any(|c| &c.id == id))
    }

    /// Send to the active pair only
    pub fn send_active(&self, msg: &ServerMsg) {
        for conn in &self.active {
            conn.send(msg.clone());
        }
    }

    /// Send to every connection, active and waiting
    pub fn broadcast(&self, msg: &ServerMsg) {
        for conn in self.iter() {
            conn.send(msg.clone());
        }
    }
}
