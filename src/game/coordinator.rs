//! Round slot: geometry, turn order, and shot validation

use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::util::rng::{generate_integer, pick_random_player};
use crate::ws::protocol::RoundInfo;

use super::ballistics::{Ballistics, ShotParams};
use super::constants::Battlefield;
use super::PlayerId;

/// Where the current round is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Waiting for the shooter to fire
    Aiming,
    /// Shot resolved, next round scheduled
    ShotPending,
}

/// One round of the duel
#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    /// Distinguishes this round from earlier ones with the same pair
    pub serial: u64,
    pub shooting_player_id: PlayerId,
    /// Cannon x position per active player
    pub positions: BTreeMap<PlayerId, i64>,
    pub phase: RoundPhase,
}

impl RoundState {
    pub fn info(&self, field: &Battlefield) -> RoundInfo {
        RoundInfo {
            shooting_player_id: self.shooting_player_id.clone(),
            game_field_size: field.field,
            ground_coordinates: field.ground,
            cannon_width: field.cannon_width,
            cannonball_width: field.cannonball_width,
            g: field.g,
            v0: field.v0,
            players_coordinates: self.positions.clone(),
        }
    }
}

/// Ticket for the delayed turn advance scheduled after a shot.
///
/// The timer is never cancelled; whoever redeems the ticket checks it is
/// still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAdvance {
    pub round_serial: u64,
    pub pair: [PlayerId; 2],
    pub next_shooter: PlayerId,
}

/// An accepted shot
#[derive(Debug, Clone, PartialEq)]
pub struct ShotResolution {
    pub hit: bool,
    pub pending: PendingAdvance,
}

/// Why a shot was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShotRejection {
    #[error("no round in progress")]
    NoRound,

    #[error("not this player's turn")]
    NotShooter,

    #[error("shot already fired this round")]
    AlreadyFired,
}

/// Owns the single round slot
pub struct RoundCoordinator {
    battlefield: Battlefield,
    round: Option<RoundState>,
    rng: ChaCha8Rng,
    next_serial: u64,
}

impl RoundCoordinator {
    pub fn new(battlefield: Battlefield, rng: ChaCha8Rng) -> Self {
        Self {
            battlefield,
            round: None,
            rng,
            next_serial: 1,
        }
    }

    pub fn battlefield(&self) -> &Battlefield {
        &self.battlefield
    }

    pub fn current(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    /// Replace the round slot with fresh geometry for `pair`.
    ///
    /// `shooter` must be one of the pair; when absent, one is picked at random.
    pub fn start_round(&mut self, pair: [PlayerId; 2], shooter: Option<PlayerId>) -> &RoundState {
        let shooting_player_id = shooter
            .filter(|s| pair.contains(s))
            .or_else(|| pick_random_player(&mut self.rng, &pair).cloned())
            .unwrap_or_else(|| pair[0].clone());

        let ground = self.battlefield.ground;
        let positions = pair
            .iter()
            .map(|id| (id.clone(), generate_integer(&mut self.rng, ground.x1, ground.x2)))
            .collect();

        let serial = self.next_serial;
        self.next_serial += 1;

        info!(
            round = serial,
            shooter = %shooting_player_id,
            positions = ?positions,
            "Round started"
        );

        self.round.insert(RoundState {
            serial,
            shooting_player_id,
            positions,
            phase: RoundPhase::Aiming,
        })
    }

    /// Drop the current round. Returns true if there was one.
    pub fn clear(&mut self) -> bool {
        let had_round = self.round.take().is_some();
        if had_round {
            info!("Round destroyed");
        }
        had_round
    }

    /// Validate and resolve a shot, moving the round to `ShotPending`
    pub fn accept_shot(
        &mut self,
        shooter: &PlayerId,
        angle: f64,
    ) -> Result<ShotResolution, ShotRejection> {
        let params = ShotParams::from(&self.battlefield);
        let round = self.round.as_mut().ok_or(ShotRejection::NoRound)?;

        if &round.shooting_player_id != shooter {
            return Err(ShotRejection::NotShooter);
        }
        if round.phase != RoundPhase::Aiming {
            return Err(ShotRejection::AlreadyFired);
        }

        let (target, target_x) = round
            .positions
            .iter()
            .find(|(id, _)| *id != shooter)
            .map(|(id, x)| (id.clone(), *x as f64))
            .ok_or(ShotRejection::NoRound)?;
        let shooter_x = round
            .positions
            .get(shooter)
            .map(|x| *x as f64)
            .ok_or(ShotRejection::NoRound)?;

        let hit = Ballistics::is_hit(&params, shooter_x, target_x, angle);
        round.phase = RoundPhase::ShotPending;

        debug!(
            round = round.serial,
            shooter = %shooter,
            angle,
            shooter_x,
            target_x,
            hit,
            "Shot resolved"
        );

        Ok(ShotResolution {
            hit,
            pending: PendingAdvance {
                round_serial: round.serial,
                pair: [shooter.clone(), target.clone()],
                next_shooter: target,
            },
        })
    }

    /// Whether `pending` still refers to the round in the slot
    pub fn is_current(&self, pending: &PendingAdvance) -> bool {
        self.round.as_ref().is_some_and(|r| {
            r.serial == pending.round_serial && r.phase == RoundPhase::ShotPending
        })
    }
}
