//! Fixed battlefield geometry and physics shared by every round

use serde::{Deserialize, Serialize};

/// Players per duel
pub const MAX_ACTIVE_PLAYERS: usize = 2;

pub const FIELD_WIDTH: i64 = 600;
pub const FIELD_HEIGHT: i64 = 300;

/// Ground is a horizontal segment inset by this margin from the field edges
pub const GROUND_MARGIN: i64 = 50;

pub const CANNON_WIDTH: f64 = 40.0;
pub const CANNONBALL_WIDTH: f64 = 15.0;

/// Gravity and muzzle speed, in field units
pub const GRAVITY: f64 = 10.0;
pub const INITIAL_SPEED: f64 = 71.0;

/// Delay after an accepted shot before the next round, also sent to
/// clients as the outcome display duration
pub const ROUND_ADVANCE_MS: u64 = 4_000;

/// Liveness sweep period
pub const HEARTBEAT_INTERVAL_SECS: u64 = 8;

/// Consecutive unanswered probes before a connection is reclaimed
pub const MAX_MISSED_PROBES: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSize {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundLine {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

/// Server-wide round parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Battlefield {
    pub field: FieldSize,
    pub ground: GroundLine,
    pub cannon_width: f64,
    pub cannonball_width: f64,
    pub g: f64,
    pub v0: f64,
}

impl Default for Battlefield {
    fn default() -> Self {
        let ground_y = FIELD_HEIGHT - GROUND_MARGIN;
        Self {
            field: FieldSize {
                width: FIELD_WIDTH,
                height: FIELD_HEIGHT,
            },
            ground: GroundLine {
                x1: GROUND_MARGIN,
                y1: ground_y,
                x2: FIELD_WIDTH - GROUND_MARGIN,
                y2: ground_y,
            },
            cannon_width: CANNON_WIDTH,
            cannonball_width: CANNONBALL_WIDTH,
            g: GRAVITY,
            v0: INITIAL_SPEED,
        }
    }
}
