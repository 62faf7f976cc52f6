use billiards_shared::config::TableConfig;
use billiards_shared::protocol::{EntityId, PeerId};
use billiards_shared::vec3::{self, vec3, Vec3};

use crate::ball::Ball;
use crate::score::ScoreLedger;

/// A pocket holds at most one ball between detection and capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PocketState {
    #[default]
    Idle,
    Overlapping(EntityId),
}

/// Result of a ball dropping into a pocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotOutcome {
    pub ball: EntityId,
    pub number: u8,
    /// Peer that received the points, None for an unattributed pot.
    pub credited: Option<PeerId>,
    pub points: u32,
    /// Cue ball put back on the head spot instead of removed.
    pub respotted: bool,
}

/// Removal and scoring region on the table.
#[derive(Debug, Clone)]
pub struct Pocket {
    pub center: Vec3,
    pub radius: f64,
    pub points: u32,
    state: PocketState,
}

impl Pocket {
    pub fn new(center: Vec3, radius: f64, points: u32) -> Self {
        Self {
            center,
            radius,
            points,
            state: PocketState::Idle,
        }
    }

    /// Four corner pockets and two side pockets.
    pub fn for_table(config: &TableConfig) -> Vec<Pocket> {
        let hl = config.half_length;
        let hw = config.half_width;
        let y = config.surface_y;
        [
            vec3(-hl, y, -hw),
            vec3(-hl, y, hw),
            vec3(hl, y, -hw),
            vec3(hl, y, hw),
            vec3(0.0, y, -hw),
            vec3(0.0, y, hw),
        ]
        .into_iter()
        .map(|center| Pocket::new(center, config.pocket_radius, config.point_value))
        .collect()
    }

    pub fn state(&self) -> PocketState {
        self.state
    }

    /// Ball center inside the pocket's capture circle (measured on the table plane).
    pub fn overlaps(&self, ball: &Ball) -> bool {
        ball.is_alive()
            && vec3::length(vec3::horizontal(vec3::sub(ball.position, self.center))) < self.radius
    }

    /// Claim `ball` for capture. Returns false if the pocket already holds one.
    pub fn engage(&mut self, ball: EntityId) -> bool {
        match self.state {
            PocketState::Idle => {
                self.state = PocketState::Overlapping(ball);
                true
            }
            PocketState::Overlapping(held) => held == ball,
        }
    }

    pub fn horizontal_distance(&self, position: Vec3) -> f64 {
        vec3::length(vec3::horizontal(vec3::sub(position, self.center)))
    }

    /// Take the engaged ball out of play and credit its last hitter, then
    /// go back to `Idle`. Returns None when `ball` is not the one engaged.
    ///
    /// With `respot` set, a cue ball is put back there instead and nobody scores.
    pub fn capture(
        &mut self,
        ball: &mut Ball,
        ledger: &mut ScoreLedger,
        respot: Option<Vec3>,
    ) -> Option<PotOutcome> {
        if self.state != PocketState::Overlapping(ball.id) {
            return None;
        }

        let outcome = match respot {
            Some(spot) if ball.is_cue() => {
                ball.respot(spot);
                tracing::info!(ball = %ball.id, "cue ball potted, respotted");
                PotOutcome {
                    ball: ball.id,
                    number: ball.number,
                    credited: None,
                    points: 0,
                    respotted: true,
                }
            }
            _ => {
                let credited = ball.last_hitter;
                let points = match credited {
                    Some(peer) => {
                        let total = ledger.credit(peer, self.points);
                        tracing::info!(ball = %ball.id, number = ball.number, %peer, total, "ball potted");
                        self.points
                    }
                    None => {
                        tracing::info!(ball = %ball.id, number = ball.number, "ball potted without a hitter");
                        0
                    }
                };
                ball.mark_destroyed();
                PotOutcome {
                    ball: ball.id,
                    number: ball.number,
                    credited,
                    points,
                    respotted: false,
                }
            }
        };

        self.state = PocketState::Idle;
        Some(outcome)
    }

    /// Drop an engaged ball that vanished before capture.
    pub fn release(&mut self) {
        self.state = PocketState::Idle;
    }
}
