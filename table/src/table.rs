use billiards_shared::config::TableConfig;
use billiards_shared::protocol::{EntityId, PeerId};
use billiards_shared::vec3::Vec3;

use crate::authority::{OwnershipPrimitive, ReplicationPrimitive};
use crate::ball::{Ball, HitOutcome};
use crate::contact::{self, PairOutcome};
use crate::cushions::Cushions;
use crate::pocket::{Pocket, PocketState, PotOutcome};
use crate::score::ScoreLedger;

/// Most balls a table will hold (cue ball plus fifteen object balls).
pub const MAX_BALLS: usize = 16;

/// Counters from one collision pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairStats {
    /// Live pairs examined. Always k(k-1)/2 for k live balls.
    pub pairs_checked: usize,
    /// Pairs that were touching and corrected by this peer.
    pub contacts: usize,
    /// Pairs that were touching but belonged to other peers.
    pub not_ours: usize,
}

/// Per-session ball registry and fixed-step driver.
///
/// Balls are kept in insertion order. The coordinator never rescans the
/// world for balls; they are registered when spawned and unregistered when
/// destroyed.
#[derive(Debug, Clone)]
pub struct Table {
    balls: Vec<Ball>,
    cushions: Cushions,
    pockets: Vec<Pocket>,
    restitution: f64,
    surface_y: Option<f64>,
}

impl Table {
    /// Regulation table with rails, six pockets and the plane lock.
    pub fn new(config: &TableConfig) -> Self {
        Self {
            balls: Vec::new(),
            cushions: Cushions::for_table(config),
            pockets: Pocket::for_table(config),
            restitution: config.ball_restitution,
            surface_y: Some(config.surface_y),
        }
    }

    /// Open plane: no rails, no pockets, no height constraint.
    pub fn open(restitution: f64) -> Self {
        Self {
            balls: Vec::new(),
            cushions: Cushions::none(),
            pockets: Vec::new(),
            restitution,
            surface_y: None,
        }
    }

    pub fn with_pockets(mut self, pockets: Vec<Pocket>) -> Self {
        self.pockets = pockets;
        self
    }

    /// Add a ball. Registering an id that is already present, or a ball
    /// beyond [`MAX_BALLS`], does nothing and returns false.
    pub fn register(&mut self, ball: Ball) -> bool {
        if self.contains(ball.id) {
            return false;
        }
        if self.balls.len() >= MAX_BALLS {
            tracing::warn!(ball = %ball.id, "table full, ball not registered");
            return false;
        }
        self.balls.push(ball);
        true
    }

    /// Remove a ball by id. Absent ids are a no-op.
    pub fn unregister(&mut self, id: EntityId) -> Option<Ball> {
        let index = self.balls.iter().position(|b| b.id == id)?;
        Some(self.balls.remove(index))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.balls.iter().any(|b| b.id == id)
    }

    pub fn ball(&self, id: EntityId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn ball_mut(&mut self, id: EntityId) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    pub fn clear(&mut self) {
        self.balls.clear();
    }

    pub fn cushions(&self) -> &Cushions {
        &self.cushions
    }

    pub fn pockets(&self) -> &[Pocket] {
        &self.pockets
    }

    pub fn cue_ball(&self) -> Option<&Ball> {
        self.balls.iter().find(|b| b.is_alive() && b.is_cue())
    }

    /// Re-read this peer's authority for every ball.
    pub fn refresh_ownership(&mut self, net: &impl OwnershipPrimitive) {
        for ball in &mut self.balls {
            ball.refresh_ownership(net);
        }
    }

    /// Land parked hits whose authority has arrived. Returns how many landed.
    pub fn apply_pending_hits(&mut self) -> usize {
        self.balls
            .iter_mut()
            .filter(|b| b.is_alive())
            .map(|b| b.apply_pending_hit())
            .filter(|&applied| applied)
            .count()
    }

    /// Strike a registered ball. None if the ball is unknown or gone.
    pub fn hit(
        &mut self,
        id: EntityId,
        velocity: Vec3,
        hitter: PeerId,
        net: &mut impl OwnershipPrimitive,
        ttl_ticks: u32,
    ) -> Option<HitOutcome> {
        let ball = self.balls.iter_mut().find(|b| b.id == id && b.is_alive())?;
        Some(ball.on_hit(velocity, hitter, net, ttl_ticks))
    }

    /// Integrate owned balls and pull the rest toward their replicas.
    /// Returns how many balls this peer integrated.
    pub fn step_balls(
        &mut self,
        dt: f64,
        net: &impl ReplicationPrimitive,
        blend: f64,
        tolerance: f64,
    ) -> usize {
        let mut stepped = 0;
        for ball in self.balls.iter_mut().filter(|b| b.is_alive()) {
            if ball.is_owned() {
                if ball.step(dt, &self.cushions, self.surface_y) {
                    stepped += 1;
                }
            } else if let Some(replica) = net.replica(ball.id) {
                ball.reconcile(replica, blend, tolerance);
            }
        }
        stepped
    }

    /// Visit every unordered pair of live balls exactly once.
    pub(crate) fn for_each_live_pair(&mut self, mut visit: impl FnMut(&mut Ball, &mut Ball)) {
        for i in 0..self.balls.len() {
            let (head, tail) = self.balls.split_at_mut(i + 1);
            let a = &mut head[i];
            if !a.is_alive() {
                continue;
            }
            for b in tail.iter_mut() {
                // Re-check: a may have been destroyed by an earlier visit
                if a.is_alive() && b.is_alive() {
                    visit(a, b);
                }
            }
        }
    }

    /// Run the pairwise resolver over every live pair once.
    pub fn resolve_collisions(&mut self, net: &mut impl OwnershipPrimitive) -> PairStats {
        let restitution = self.restitution;
        let mut stats = PairStats::default();
        self.for_each_live_pair(|a, b| {
            stats.pairs_checked += 1;
            match contact::resolve_pair(a, b, restitution, net) {
                PairOutcome::Separated => {}
                PairOutcome::NotOurs => stats.not_ours += 1,
                PairOutcome::Resolved { .. } => stats.contacts += 1,
            }
        });
        stats
    }

    /// Pot every live ball sitting over a pocket, then drop destroyed balls
    /// from the registry. Balls that escaped the rails go to the nearest pocket.
    ///
    /// Only the table owner may call this. `cue_respot` is where a potted cue
    /// ball goes back when respots are allowed.
    pub fn resolve_pockets(
        &mut self,
        ledger: &mut ScoreLedger,
        cue_respot: Option<Vec3>,
    ) -> Vec<PotOutcome> {
        let mut outcomes = Vec::new();
        if self.pockets.is_empty() {
            return outcomes;
        }

        // Each pocket takes at most one ball per tick; the rest wait
        for ball in self.balls.iter().filter(|b| b.is_alive()) {
            let index = match self.pockets.iter().position(|p| p.overlaps(ball)) {
                Some(index) => index,
                None if self.cushions.outside(ball.position, ball.radius()) => {
                    tracing::debug!(ball = %ball.id, "ball left the table");
                    nearest_pocket(&self.pockets, ball.position)
                }
                None => continue,
            };
            self.pockets[index].engage(ball.id);
        }

        let mut respot = cue_respot;
        for pocket in self.pockets.iter_mut() {
            let PocketState::Overlapping(id) = pocket.state() else {
                continue;
            };
            let Some(ball) = self.balls.iter_mut().find(|b| b.id == id && b.is_alive()) else {
                pocket.release();
                continue;
            };
            if let Some(outcome) = pocket.capture(ball, ledger, respot) {
                if outcome.respotted {
                    respot = None;
                }
                outcomes.push(outcome);
            }
        }

        self.balls.retain(|b| b.is_alive());
        outcomes
    }

    /// Lowest-numbered live object ball, 0 when none remain.
    pub fn next_target_ball_number(&self) -> u8 {
        self.balls
            .iter()
            .filter(|b| b.is_alive() && !b.is_cue())
            .map(|b| b.number)
            .min()
            .unwrap_or(0)
    }

    /// No live ball is moving.
    pub fn at_rest(&self) -> bool {
        self.balls
            .iter()
            .filter(|b| b.is_alive())
            .all(|b| !b.is_moving())
    }
}

fn nearest_pocket(pockets: &[Pocket], position: Vec3) -> usize {
    pockets
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.horizontal_distance(position)
                .total_cmp(&b.horizontal_distance(position))
        })
        .map(|(index, _)| index)
        .unwrap_or(0)
}
