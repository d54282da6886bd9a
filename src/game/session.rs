//! All mutable duel state behind one critical section

use tracing::{debug, info, warn};

use crate::matchmaking::{OutboundTx, PlayerConnection, ProbeStatus, Roster, Slot};
use crate::store::{ScoreLedger, ScoreRecord};
use crate::ws::protocol::{ServerMsg, ShotOutcome};

use super::coordinator::{PendingAdvance, RoundCoordinator};
use super::PlayerId;

/// Counts for the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub active_players: usize,
    pub waiting_players: usize,
    pub round_in_progress: bool,
}

/// Roster, round slot, and score ledger.
///
/// Every method runs to completion without awaiting; outbound traffic is
/// queued on per-connection channels.
pub struct GameSession {
    roster: Roster,
    rounds: RoundCoordinator,
    ledger: ScoreLedger,
    /// Outcome display time sent with shot results, in milliseconds
    outcome_timeout_ms: u64,
}

impl GameSession {
    pub fn new(rounds: RoundCoordinator, ledger: ScoreLedger, outcome_timeout_ms: u64) -> Self {
        Self {
            roster: Roster::new(),
            rounds,
            ledger,
            outcome_timeout_ms,
        }
    }

    #[cfg(test)]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn rounds(&self) -> &RoundCoordinator {
        &self.rounds
    }

    pub fn statistics(&self) -> Vec<ScoreRecord> {
        self.ledger.records().to_vec()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            active_players: self.roster.active().len(),
            waiting_players: self.roster.waiting_len(),
            round_in_progress: self.rounds.current().is_some(),
        }
    }

    /// Admit a new connection and tell it its id
    pub fn connect(&mut self, id: PlayerId, tx: OutboundTx) -> Slot {
        let conn = PlayerConnection::new(id.clone(), tx);
        conn.send(ServerMsg::IdNotification { id: id.clone() });

        let slot = self.roster.admit(conn);
        if slot == Slot::Active && self.rounds.current().is_none() {
            self.start_round_if_full(None);
        }
        self.broadcast_statistics();
        slot
    }

    /// Remove a connection. Safe to call more than once for the same id.
    pub fn disconnect(&mut self, id: &PlayerId) -> Option<Slot> {
        let (slot, _conn) = self.roster.remove(id)?;
        info!(player_id = %id, slot = ?slot, "Connection removed");

        if slot == Slot::Active {
            self.rounds.clear();
            self.roster.broadcast(&ServerMsg::Awaiting);

            if self.roster.promote_next().is_some() && self.start_round_if_full(None) {
                self.broadcast_statistics();
            }
        }
        Some(slot)
    }

    /// Record a display name for the connection and make sure it has a score row
    pub fn set_nickname(&mut self, id: &PlayerId, nickname: &str) {
        let nickname = nickname.trim();
        let Some(conn) = self.roster.get_mut(id) else {
            debug!(player_id = %id, "Nickname from unknown connection ignored");
            return;
        };

        info!(player_id = %id, nickname, "Nickname set");
        conn.nickname = Some(nickname.to_string());
        self.ledger.upsert_nickname(nickname);
        self.broadcast_statistics();
    }

    /// Resolve a shot. Returns the turn advance to schedule if it was accepted.
    pub fn shoot(&mut self, id: &PlayerId, angle: f64) -> Option<PendingAdvance> {
        let resolution = match self.rounds.accept_shot(id, angle) {
            Ok(resolution) => resolution,
            Err(reason) => {
                warn!(player_id = %id, angle, %reason, "Shot ignored");
                return None;
            }
        };

        let outcome = ShotOutcome {
            double_timeout: self.outcome_timeout_ms,
        };
        let (shooter_msg, target_msg, delta) = if resolution.hit {
            (ServerMsg::HaveKilled(outcome), ServerMsg::IsKilled(outcome), 1)
        } else {
            (ServerMsg::SlipUp(outcome), ServerMsg::IsNotKilled(outcome), -1)
        };

        if let Some(target) = self.roster.opponent_of(id) {
            target.send(ServerMsg::OpponentShot { angle });
            target.send(target_msg);
        }
        let shooter_nickname = self.roster.get(id).and_then(|shooter| {
            shooter.send(shooter_msg);
            shooter.nickname.clone()
        });

        match shooter_nickname {
            Some(nickname) => {
                if let Err(e) = self.ledger.adjust_score(&nickname, delta) {
                    warn!(player_id = %id, error = %e, "Score not updated");
                }
            }
            None => warn!(player_id = %id, "Shooter has no nickname, score not updated"),
        }
        self.broadcast_statistics();

        Some(resolution.pending)
    }

    /// Start the next round for a pending shot, unless the duel changed since
    pub fn advance_round(&mut self, pending: &PendingAdvance) -> bool {
        if !self.roster.is_pair(&pending.pair) || !self.rounds.is_current(pending) {
            debug!(round = pending.round_serial, "Stale round advance skipped");
            return false;
        }

        self.start_round_if_full(Some(pending.next_shooter.clone()));
        self.broadcast_statistics();
        true
    }

    /// The client answered a liveness probe
    pub fn mark_alive(&mut self, id: &PlayerId) {
        if let Some(conn) = self.roster.get_mut(id) {
            conn.mark_alive();
        }
    }

    /// Probe every connection and reclaim the unreachable ones.
    ///
    /// Reclaimed connections go through the normal disconnect path.
    pub fn sweep_liveness(&mut self) -> Vec<PlayerId> {
        let unreachable: Vec<PlayerId> = self
            .roster
            .iter_mut()
            .filter_map(|conn| match conn.probe() {
                ProbeStatus::Alive => None,
                ProbeStatus::Unreachable => Some(conn.id.clone()),
            })
            .collect();

        for id in &unreachable {
            warn!(player_id = %id, "Connection stopped answering probes, closing");
            if let Some(conn) = self.roster.get(id) {
                conn.close();
            }
            self.disconnect(id);
        }
        unreachable
    }

    fn start_round_if_full(&mut self, shooter: Option<PlayerId>) -> bool {
        let [first, second] = match self.roster.active_ids().as_slice() {
            [a, b] => [a.clone(), b.clone()],
            _ => return false,
        };

        let field = *self.rounds.battlefield();
        let info = self.rounds.start_round([first, second], shooter).info(&field);
        self.roster.send_active(&ServerMsg::RoundStarted(info));
        true
    }

    fn broadcast_statistics(&self) {
        self.roster
            .broadcast(&ServerMsg::Statistics(self.ledger.records().to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::Battlefield;
    use crate::matchmaking::{Outbound, OutboundRx};
    use crate::store::writer::WriterRx;
    use crate::store::SnapshotWriter;
    use crate::ws::protocol::RoundInfo;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tokio::sync::mpsc;

    struct Harness {
        session: GameSession,
        persisted: WriterRx,
    }

    impl Harness {
        fn new(seed: u64) -> Self {
            Self::with_records(seed, Vec::new())
        }

        fn with_records(seed: u64, records: Vec<ScoreRecord>) -> Self {
            let (writer, persisted) = SnapshotWriter::channel();
            let rounds =
                RoundCoordinator::new(Battlefield::default(), ChaCha8Rng::seed_from_u64(seed));
            Self {
                session: GameSession::new(rounds, ScoreLedger::new(records, writer), 4000),
                persisted,
            }
        }

        fn join(&mut self, id: &str) -> (PlayerId, OutboundRx) {
            let (tx, rx) = mpsc::unbounded_channel();
            let id = PlayerId::new(id);
            self.session.connect(id.clone(), tx);
            (id, rx)
        }

        fn shooter(&self) -> PlayerId {
            self.session
                .rounds()
                .current()
                .expect("round in progress")
                .shooting_player_id
                .clone()
        }
    }

    fn drain(rx: &mut OutboundRx) -> Vec<ServerMsg> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|o| match o {
                Outbound::Message(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    fn rounds_in(msgs: &[ServerMsg]) -> Vec<RoundInfo> {
        msgs.iter()
            .filter_map(|m| match m {
                ServerMsg::RoundStarted(info) => Some(info.clone()),
                _ => None,
            })
            .collect()
    }

    fn last_statistics(msgs: &[ServerMsg]) -> Option<Vec<ScoreRecord>> {
        msgs.iter().rev().find_map(|m| match m {
            ServerMsg::Statistics(records) => Some(records.clone()),
            _ => None,
        })
    }

    #[test]
    fn two_connections_start_a_round() {
        let mut h = Harness::new(1);
        let (a, mut rx_a) = h.join("a");
        let first = drain(&mut rx_a);
        assert_eq!(first[0], ServerMsg::IdNotification { id: a.clone() });
        assert!(rounds_in(&first).is_empty());

        let (b, mut rx_b) = h.join("b");
        let to_a = drain(&mut rx_a);
        let to_b = drain(&mut rx_b);
        assert_eq!(to_b[0], ServerMsg::IdNotification { id: b.clone() });

        let round_a = rounds_in(&to_a);
        let round_b = rounds_in(&to_b);
        assert_eq!(round_a.len(), 1);
        assert_eq!(round_a, round_b);

        let info = &round_a[0];
        assert!(info.shooting_player_id == a || info.shooting_player_id == b);
        for id in [&a, &b] {
            let x = info.players_coordinates[id];
            assert!((50..=550).contains(&x));
        }
        assert!(last_statistics(&to_b).is_some());
    }

    #[test]
    fn waiting_connections_get_statistics_but_no_geometry() {
        let mut h = Harness::new(2);
        h.join("a");
        h.join("b");
        let (c, mut rx_c) = h.join("c");

        let msgs = drain(&mut rx_c);
        assert_eq!(msgs[0], ServerMsg::IdNotification { id: c });
        assert!(rounds_in(&msgs).is_empty());
        assert!(last_statistics(&msgs).is_some());
        assert_eq!(h.session.status().waiting_players, 1);
    }

    #[test]
    fn non_shooter_shots_are_ignored() {
        let mut h = Harness::new(3);
        let (_, mut rx_a) = h.join("a");
        let (_, mut rx_b) = h.join("b");
        h.session.set_nickname(&PlayerId::new("a"), "alpha");
        h.session.set_nickname(&PlayerId::new("b"), "bravo");
        drain(&mut rx_a);
        drain(&mut rx_b);
        while h.persisted.try_recv().is_ok() {}

        let shooter = h.shooter();
        let other = if shooter.as_str() == "a" { "b" } else { "a" };
        assert!(h.session.shoot(&PlayerId::new(other), 45.0).is_none());

        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
        assert!(h.persisted.try_recv().is_err());
        assert!(h.session.statistics().iter().all(|r| r.score == 0));
    }

    #[test]
    fn shots_without_a_round_are_ignored() {
        let mut h = Harness::new(4);
        let (a, mut rx_a) = h.join("a");
        drain(&mut rx_a);
        assert!(h.session.shoot(&a, 45.0).is_none());
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn accepted_shot_notifies_both_sides_and_scores_the_shooter() {
        let mut h = Harness::new(5);
        let (a, mut rx_a) = h.join("a");
        let (b, mut rx_b) = h.join("b");
        h.session.set_nickname(&a, "alpha");
        h.session.set_nickname(&b, "bravo");
        drain(&mut rx_a);
        drain(&mut rx_b);

        let shooter = h.shooter();
        let (shooter_rx, target_rx) = if shooter == a {
            (&mut rx_a, &mut rx_b)
        } else {
            (&mut rx_b, &mut rx_a)
        };

        let pending = h.session.shoot(&shooter, 45.0).expect("shot accepted");
        assert_eq!(pending.next_shooter, if shooter == a { b.clone() } else { a.clone() });

        let to_shooter = drain(shooter_rx);
        let to_target = drain(target_rx);
        let outcome = ShotOutcome {
            double_timeout: 4000,
        };

        assert_eq!(to_target[0], ServerMsg::OpponentShot { angle: 45.0 });
        let hit = match (&to_shooter[0], &to_target[1]) {
            (ServerMsg::HaveKilled(o1), ServerMsg::IsKilled(o2)) => {
                assert_eq!((*o1, *o2), (outcome, outcome));
                true
            }
            (ServerMsg::SlipUp(o1), ServerMsg::IsNotKilled(o2)) => {
                assert_eq!((*o1, *o2), (outcome, outcome));
                false
            }
            other => panic!("unexpected outcome pair {other:?}"),
        };

        let shooter_name = if shooter == a { "alpha" } else { "bravo" };
        let target_name = if shooter == a { "bravo" } else { "alpha" };
        let stats = last_statistics(&to_target).expect("statistics broadcast");
        let score_of = |name: &str| stats.iter().find(|r| r.nickname == name).map(|r| r.score);
        assert_eq!(score_of(shooter_name), Some(if hit { 1 } else { -1 }));
        assert_eq!(score_of(target_name), Some(0));

        // one more shot while pending is dropped
        assert!(h.session.shoot(&shooter, 45.0).is_none());
    }

    #[test]
    fn turns_alternate_across_rounds() {
        let mut h = Harness::new(6);
        let (_, mut rx_a) = h.join("a");
        h.join("b");

        let mut previous = h.shooter();
        for _ in 0..10 {
            let pending = h.session.shoot(&previous, 30.0).expect("accepted");
            assert!(h.session.advance_round(&pending));
            let next = h.shooter();
            assert_ne!(next, previous);
            previous = next;
        }

        let rounds = rounds_in(&drain(&mut rx_a));
        assert_eq!(rounds.len(), 11);
        for pair in rounds.windows(2) {
            assert_ne!(pair[0].shooting_player_id, pair[1].shooting_player_id);
        }
    }

    #[test]
    fn disconnect_during_pending_shot_stops_the_advance() {
        let mut h = Harness::new(7);
        let (a, mut rx_a) = h.join("a");
        let (b, _rx_b) = h.join("b");
        let shooter = h.shooter();
        let pending = h.session.shoot(&shooter, 45.0).expect("accepted");
        drain(&mut rx_a);

        assert_eq!(h.session.disconnect(&b), Some(Slot::Active));
        assert!(!h.session.advance_round(&pending));

        let msgs = drain(&mut rx_a);
        assert!(msgs.contains(&ServerMsg::Awaiting));
        assert!(rounds_in(&msgs).is_empty());
        assert!(h.session.rounds().current().is_none());
        assert_eq!(h.session.roster().active_ids(), vec![a]);
    }

    #[test]
    fn stale_advance_after_promotion_does_not_restart_the_round() {
        let mut h = Harness::new(8);
        let (a, mut rx_a) = h.join("a");
        let (b, _rx_b) = h.join("b");
        let (c, mut rx_c) = h.join("c");

        let shooter = h.shooter();
        let pending = h.session.shoot(&shooter, 45.0).expect("accepted");
        h.session.disconnect(&b);

        let promoted_round = h.session.rounds().current().cloned().expect("new pair plays");
        assert!(promoted_round.positions.contains_key(&a));
        assert!(promoted_round.positions.contains_key(&c));
        assert_eq!(rounds_in(&drain(&mut rx_c)).len(), 1);
        drain(&mut rx_a);

        assert!(!h.session.advance_round(&pending));
        assert_eq!(h.session.rounds().current(), Some(&promoted_round));
        assert!(rounds_in(&drain(&mut rx_a)).is_empty());
    }

    #[test]
    fn waiting_player_is_promoted_after_an_active_disconnect() {
        let mut h = Harness::new(9);
        let (a, _rx_a) = h.join("a");
        let (b, mut rx_b) = h.join("b");
        let (c, mut rx_c) = h.join("c");
        let (d, mut rx_d) = h.join("d");
        drain(&mut rx_b);
        drain(&mut rx_c);
        drain(&mut rx_d);

        h.session.disconnect(&a);

        let to_c = drain(&mut rx_c);
        assert_eq!(to_c[0], ServerMsg::Awaiting);
        let round = rounds_in(&to_c);
        assert_eq!(round.len(), 1);
        assert!(round[0].players_coordinates.contains_key(&b));
        assert!(round[0].players_coordinates.contains_key(&c));
        assert!(last_statistics(&to_c).is_some());

        assert_eq!(rounds_in(&drain(&mut rx_b)).len(), 1);

        let to_d = drain(&mut rx_d);
        assert_eq!(to_d[0], ServerMsg::Awaiting);
        assert!(rounds_in(&to_d).is_empty());
        assert_eq!(h.session.roster().slot_of(&d), Some(Slot::Waiting));
    }

    #[test]
    fn waiting_disconnect_leaves_the_round_alone() {
        let mut h = Harness::new(10);
        let (_, mut rx_a) = h.join("a");
        h.join("b");
        let (c, _rx_c) = h.join("c");
        let round = h.session.rounds().current().cloned();
        drain(&mut rx_a);

        assert_eq!(h.session.disconnect(&c), Some(Slot::Waiting));
        assert_eq!(h.session.rounds().current().cloned(), round);
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn repeated_disconnect_is_a_no_op() {
        let mut h = Harness::new(11);
        let (_, mut rx_a) = h.join("a");
        let (b, _rx_b) = h.join("b");

        assert_eq!(h.session.disconnect(&b), Some(Slot::Active));
        let status = h.session.status();
        drain(&mut rx_a);

        assert_eq!(h.session.disconnect(&b), None);
        assert_eq!(h.session.status(), status);
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn nickname_changes_keep_old_records() {
        let mut h = Harness::with_records(12, vec![ScoreRecord::new("veteran", 7)]);
        let (a, mut rx_a) = h.join("a");
        h.session.set_nickname(&a, "  rookie ");
        h.session.set_nickname(&a, "ace");

        let stats = last_statistics(&drain(&mut rx_a)).unwrap();
        let names: Vec<_> = stats.iter().map(|r| r.nickname.as_str()).collect();
        assert_eq!(names, ["veteran", "rookie", "ace"]);
        assert_eq!(
            h.session.roster().get(&a).and_then(|c| c.nickname.clone()),
            Some("ace".to_string())
        );
    }

    #[test]
    fn shooter_without_nickname_still_resolves() {
        let mut h = Harness::new(13);
        h.join("a");
        h.join("b");
        let shooter = h.shooter();
        assert!(h.session.shoot(&shooter, 45.0).is_some());
        assert!(h.session.statistics().is_empty());
        assert!(h.persisted.try_recv().is_err());
    }

    #[test]
    fn liveness_sweep_reclaims_silent_connections() {
        let mut h = Harness::new(14);
        let (a, mut rx_a) = h.join("a");
        let (b, mut rx_b) = h.join("b");

        // first sweep probes both, only a answers
        assert!(h.session.sweep_liveness().is_empty());
        h.session.mark_alive(&a);
        assert!(h.session.sweep_liveness().is_empty());
        h.session.mark_alive(&a);
        assert_eq!(h.session.sweep_liveness(), vec![b.clone()]);

        let to_b: Vec<Outbound> = std::iter::from_fn(|| rx_b.try_recv().ok()).collect();
        assert_eq!(to_b.last(), Some(&Outbound::Close));
        assert!(drain(&mut rx_a).contains(&ServerMsg::Awaiting));
        assert!(!h.session.roster().contains(&b));
        assert!(h.session.rounds().current().is_none());
    }
}
