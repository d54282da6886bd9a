//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::constants::{FieldSize, GroundLine};
use crate::game::PlayerId;
use crate::store::ScoreRecord;

/// Longest accepted nickname, in characters
pub const MAX_NICKNAME_CHARS: usize = 32;

/// Messages sent from client to server.
///
/// The wire format carries no discriminant; the variant is picked by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMsg {
    /// Announce or change the display name
    Nickname { nickname: String },

    /// Fire at the given angle (degrees from horizontal)
    Shot { angle: f64 },
}

impl ClientMsg {
    /// Parse and validate a text frame. `None` for anything malformed.
    pub fn parse(text: &str) -> Option<Self> {
        let msg: ClientMsg = serde_json::from_str(text).ok()?;
        msg.is_valid().then_some(msg)
    }

    /// Shape checks beyond what deserialization enforces
    pub fn is_valid(&self) -> bool {
        match self {
            ClientMsg::Nickname { nickname } => {
                let trimmed = nickname.trim();
                !trimmed.is_empty() && trimmed.chars().count() <= MAX_NICKNAME_CHARS
            }
            ClientMsg::Shot { angle } => angle.is_finite(),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMsg {
    /// Sent once on admission
    IdNotification { id: PlayerId },

    /// New round geometry, active players only
    RoundStarted(RoundInfo),

    /// The duel lost a player and is waiting for an opponent
    Awaiting,

    /// The opponent fired; replay the animation
    OpponentShot { angle: f64 },

    /// Shooter hit the opponent
    HaveKilled(ShotOutcome),

    /// Receiver was hit
    IsKilled(ShotOutcome),

    /// Shooter missed
    SlipUp(ShotOutcome),

    /// Receiver survived the opponent's shot
    IsNotKilled(ShotOutcome),

    /// Full score table
    Statistics(Vec<ScoreRecord>),
}

/// Payload of `RoundStarted`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundInfo {
    pub shooting_player_id: PlayerId,
    pub game_field_size: FieldSize,
    pub ground_coordinates: GroundLine,
    pub cannon_width: f64,
    pub cannonball_width: f64,
    pub g: f64,
    pub v0: f64,
    pub players_coordinates: BTreeMap<PlayerId, i64>,
}

/// Payload of the four shot outcome messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotOutcome {
    /// How long the client shows the outcome, in milliseconds
    pub double_timeout: u64,
}
