use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vec3::Vec3;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Identity of a peer (player) at the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Identity of a replicated entity. Balls start at 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The table itself: its owner runs the pockets and the score ledger.
    pub const TABLE: EntityId = EntityId(0);
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Replicated kinematic state of one ball.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallSnapshot {
    pub id: EntityId,
    pub number: u8,
    pub position: Vec3,
    pub velocity: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_hitter: Option<PeerId>,
}

/// Compact ball state for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallWire {
    pub id: u32,
    pub number: u8,
    pub pos: [f64; 3],
    pub vel: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_hitter: Option<u32>,
}

/// Table-level happenings, emitted by the table owner and seen by every peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TableEvent {
    #[serde(rename = "racked")]
    Racked { balls: u32 },
    #[serde(rename = "ball_potted")]
    #[serde(rename_all = "camelCase")]
    BallPotted {
        ball: EntityId,
        number: u8,
        credited: Option<PeerId>,
        points: u32,
    },
    #[serde(rename = "cue_ball_respotted")]
    #[serde(rename_all = "camelCase")]
    CueBallRespotted { ball: EntityId, respawns_left: u32 },
    #[serde(rename = "money_ball_potted")]
    MoneyBallPotted { number: u8, winner: Option<PeerId> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub peer: PeerId,
    pub score: u32,
}

/// What a score display needs from one peer's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardMsg {
    pub protocol_version: u32,
    pub self_id: PeerId,
    pub scores: Vec<ScoreEntry>,
    /// Lowest-numbered object ball still on the table, 0 when none remain.
    pub next_target: u8,
}

// === Conversion helpers ===

/// Round to 4 decimal places (0.1 mm is plenty for display)
#[inline]
pub fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

impl BallWire {
    pub fn from_snapshot(snapshot: &BallSnapshot) -> Self {
        let p = snapshot.position;
        let v = snapshot.velocity;
        Self {
            id: snapshot.id.0,
            number: snapshot.number,
            pos: [round4(p.x), round4(p.y), round4(p.z)],
            vel: [round4(v.x), round4(v.y), round4(v.z)],
            last_hitter: snapshot.last_hitter.map(|p| p.0),
        }
    }
}
