use billiards_shared::config::BallPhysicsConfig;
use billiards_shared::protocol::{BallSnapshot, EntityId, PeerId};
use billiards_shared::vec3::{self, Vec3};

use crate::authority::{Ownership, OwnershipPrimitive};
use crate::cushions::Cushions;

/// A hit waiting for write authority over its ball.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingHit {
    pub velocity: Vec3,
    pub hitter: PeerId,
    /// Ticks left before the hit is abandoned
    pub ticks_left: u32,
}

/// What `on_hit` did with the impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Velocity written this call.
    Applied,
    /// Authority requested; the velocity lands once it is granted.
    Deferred,
}

/// A billiard ball as simulated by one peer.
///
/// Only the owning peer integrates the ball. Everyone else follows the
/// replicated state published by the owner.
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: EntityId,
    /// 0 for the cue ball, 1..N for object balls
    pub number: u8,
    pub position: Vec3,
    pub velocity: Vec3,
    pub physics: BallPhysicsConfig,
    pub last_hitter: Option<PeerId>,
    ownership: Ownership,
    pending_hit: Option<PendingHit>,
    alive: bool,
}

impl Ball {
    pub fn new(id: EntityId, number: u8, position: Vec3, physics: BallPhysicsConfig) -> Self {
        Self {
            id,
            number,
            position,
            velocity: Vec3::ZERO,
            physics,
            last_hitter: None,
            ownership: Ownership::Unowned,
            pending_hit: None,
            alive: true,
        }
    }

    pub fn from_snapshot(snapshot: &BallSnapshot, physics: BallPhysicsConfig) -> Self {
        Self {
            velocity: snapshot.velocity,
            last_hitter: snapshot.last_hitter,
            ..Self::new(snapshot.id, snapshot.number, snapshot.position, physics)
        }
    }

    pub fn snapshot(&self) -> BallSnapshot {
        BallSnapshot {
            id: self.id,
            number: self.number,
            position: self.position,
            velocity: self.velocity,
            last_hitter: self.last_hitter,
        }
    }

    pub fn radius(&self) -> f64 {
        self.physics.radius
    }

    pub fn is_cue(&self) -> bool {
        self.number == 0
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_owned(&self) -> bool {
        self.ownership.is_owned()
    }

    pub fn pending_hit(&self) -> Option<&PendingHit> {
        self.pending_hit.as_ref()
    }

    /// False once the ball has been potted or removed this tick.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn mark_destroyed(&mut self) {
        self.alive = false;
    }

    pub fn is_moving(&self) -> bool {
        vec3::length(self.velocity) > self.physics.stop_threshold
    }

    /// Re-read this peer's authority over the ball.
    pub fn refresh_ownership(&mut self, net: &impl OwnershipPrimitive) {
        let local = net.local_peer();
        self.ownership = match net.owner_of(self.id) {
            Some(owner) if owner == local => Ownership::Owned,
            _ if net.request_outstanding(self.id) => Ownership::RequestPending,
            Some(owner) => Ownership::OwnedBy(owner),
            None => Ownership::Unowned,
        };
    }

    /// Ask for write authority unless it is already held or on its way.
    pub fn request_authority(&mut self, net: &mut impl OwnershipPrimitive) {
        match self.ownership {
            Ownership::Owned | Ownership::RequestPending => {}
            Ownership::OwnedBy(_) | Ownership::Unowned => {
                net.request_ownership(self.id);
                self.ownership = Ownership::RequestPending;
            }
        }
    }

    /// Strike the ball. Without authority the hit is parked until the grant
    /// arrives or `ttl_ticks` run out.
    pub fn on_hit(
        &mut self,
        velocity: Vec3,
        hitter: PeerId,
        net: &mut impl OwnershipPrimitive,
        ttl_ticks: u32,
    ) -> HitOutcome {
        if self.is_owned() {
            self.velocity = velocity;
            self.last_hitter = Some(hitter);
            self.pending_hit = None;
            return HitOutcome::Applied;
        }

        self.request_authority(net);
        self.pending_hit = Some(PendingHit {
            velocity,
            hitter,
            ticks_left: ttl_ticks,
        });
        tracing::debug!(ball = %self.id, %hitter, "hit deferred until authority is granted");
        HitOutcome::Deferred
    }

    /// Apply a parked hit once authority is held. Returns true if applied.
    pub fn apply_pending_hit(&mut self) -> bool {
        let Some(pending) = self.pending_hit else {
            return false;
        };

        if self.is_owned() {
            self.velocity = pending.velocity;
            self.last_hitter = Some(pending.hitter);
            self.pending_hit = None;
            return true;
        }

        if pending.ticks_left == 0 {
            tracing::debug!(ball = %self.id, hitter = %pending.hitter, "pending hit expired");
            self.pending_hit = None;
        } else {
            self.pending_hit = Some(PendingHit {
                ticks_left: pending.ticks_left - 1,
                ..pending
            });
        }
        false
    }

    /// Advance one fixed step. Owner only; returns false if skipped.
    pub fn step(&mut self, dt: f64, cushions: &Cushions, surface_y: Option<f64>) -> bool {
        if !self.alive || !self.is_owned() {
            return false;
        }

        if self.is_moving() {
            self.resolve_wall_collision(dt, cushions);
            self.position = vec3::add(self.position, vec3::scale(self.velocity, dt));
            self.velocity = vec3::scale(self.velocity, self.physics.friction);
        } else {
            self.velocity = Vec3::ZERO;
        }

        if let Some(y) = surface_y {
            self.position.y = y;
        }
        true
    }

    /// Bounce off a cushion the ball would reach during this step.
    pub fn resolve_wall_collision(&mut self, dt: f64, cushions: &Cushions) -> bool {
        let move_distance = vec3::length(self.velocity) * dt;
        if move_distance <= f64::EPSILON {
            return false;
        }

        let direction = vec3::normalize(self.velocity);
        let check_distance = move_distance + self.physics.radius;
        match cushions.sweep(self.position, direction, check_distance, self.physics.radius) {
            Some(hit) => {
                self.velocity = vec3::scale(
                    vec3::reflect(self.velocity, hit.normal),
                    self.physics.bounciness,
                );
                true
            }
            None => false,
        }
    }

    /// Follow the owner's replicated state instead of simulating locally.
    pub fn reconcile(&mut self, replica: &BallSnapshot, blend: f64, tolerance: f64) {
        if self.is_owned() {
            return;
        }
        if vec3::distance(self.position, replica.position) > tolerance {
            self.position = vec3::lerp(self.position, replica.position, blend.clamp(0.0, 1.0));
        }
        self.velocity = replica.velocity;
        self.last_hitter = replica.last_hitter;
    }

    /// Put the ball back on the cloth at rest with no attribution.
    pub fn respot(&mut self, position: Vec3) {
        self.position = position;
        self.velocity = Vec3::ZERO;
        self.last_hitter = None;
        self.pending_hit = None;
        self.alive = true;
    }

    #[cfg(test)]
    pub(crate) fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::testing::RecordingAuthority;
    use billiards_shared::config::TableConfig;
    use billiards_shared::vec3::vec3;

    const DT: f64 = 1.0 / 60.0;

    fn owned_ball(position: Vec3) -> Ball {
        Ball::new(EntityId(1), 0, position, BallPhysicsConfig::default())
            .with_ownership(Ownership::Owned)
    }

    #[test]
    fn stops_exactly_after_dropping_below_threshold() {
        let physics = BallPhysicsConfig {
            friction: 0.9,
            stop_threshold: 0.01,
            ..Default::default()
        };
        let mut ball = Ball::new(EntityId(1), 0, Vec3::ZERO, physics)
            .with_ownership(Ownership::Owned)
            .with_velocity(vec3(0.0, 0.0, -2.0));
        let cushions = Cushions::none();

        let mut ticks = 0;
        while ball.is_moving() {
            ball.step(DT, &cushions, None);
            ticks += 1;
            assert!(ticks < 1000, "ball never slowed down");
        }
        // Below threshold but not yet zero
        assert!(vec3::length(ball.velocity) > 0.0);

        ball.step(DT, &cushions, None);
        assert_eq!(ball.velocity, Vec3::ZERO);
        assert!(ball.position.z < 0.0);
    }

    #[test]
    fn friction_decays_velocity_each_tick() {
        let mut ball = owned_ball(Vec3::ZERO).with_velocity(vec3(1.0, 0.0, 0.0));
        ball.step(DT, &Cushions::none(), None);
        assert!((ball.velocity.x - ball.physics.friction).abs() < 1e-12);
        assert!((ball.position.x - DT).abs() < 1e-12);
    }

    #[test]
    fn non_owner_does_not_integrate() {
        let mut ball = Ball::new(EntityId(1), 0, Vec3::ZERO, BallPhysicsConfig::default())
            .with_ownership(Ownership::OwnedBy(PeerId(2)))
            .with_velocity(vec3(1.0, 0.0, 0.0));
        assert!(!ball.step(DT, &Cushions::none(), None));
        assert_eq!(ball.position, Vec3::ZERO);
    }

    #[test]
    fn bounces_off_rail_with_bounciness() {
        let config = TableConfig::default();
        let cushions = Cushions::for_table(&config);
        let mut ball = owned_ball(vec3(config.half_length - 0.1, 0.0, 0.0))
            .with_velocity(vec3(5.0, 0.0, 0.0));
        assert!(ball.resolve_wall_collision(DT, &cushions));
        assert!((ball.velocity.x + 5.0 * ball.physics.bounciness).abs() < 1e-9);
    }

    #[test]
    fn stopped_ball_never_queries_walls() {
        let config = TableConfig::default();
        let cushions = Cushions::for_table(&config);
        let mut ball = owned_ball(vec3(config.half_length - 0.031, 0.0, 0.0));
        assert!(!ball.resolve_wall_collision(DT, &cushions));
    }

    #[test]
    fn plane_lock_holds_surface_height() {
        let mut ball = owned_ball(vec3(0.0, 0.2, 0.0)).with_velocity(vec3(1.0, 0.5, 0.0));
        ball.step(DT, &Cushions::none(), Some(0.0));
        assert_eq!(ball.position.y, 0.0);
    }

    #[test]
    fn owner_hit_applies_immediately() {
        let mut net = RecordingAuthority::new(PeerId(1));
        let mut ball = owned_ball(Vec3::ZERO);
        let outcome = ball.on_hit(vec3(2.0, 0.0, 0.0), PeerId(1), &mut net, 30);
        assert_eq!(outcome, HitOutcome::Applied);
        assert_eq!(ball.velocity, vec3(2.0, 0.0, 0.0));
        assert_eq!(ball.last_hitter, Some(PeerId(1)));
        assert!(net.requests.is_empty());
    }

    #[test]
    fn non_owner_hit_is_parked_and_requests_authority() {
        let mut net = RecordingAuthority::new(PeerId(1));
        let mut ball = Ball::new(EntityId(4), 0, Vec3::ZERO, BallPhysicsConfig::default())
            .with_ownership(Ownership::OwnedBy(PeerId(2)));
        let outcome = ball.on_hit(vec3(2.0, 0.0, 0.0), PeerId(1), &mut net, 30);
        assert_eq!(outcome, HitOutcome::Deferred);
        assert_eq!(ball.velocity, Vec3::ZERO);
        assert_eq!(ball.last_hitter, None);
        assert_eq!(ball.ownership(), Ownership::RequestPending);
        assert_eq!(net.requests, vec![EntityId(4)]);
    }

    #[test]
    fn parked_hit_lands_once_owned() {
        let mut net = RecordingAuthority::new(PeerId(1));
        let mut ball = Ball::new(EntityId(4), 0, Vec3::ZERO, BallPhysicsConfig::default());
        ball.on_hit(vec3(0.0, 0.0, 3.0), PeerId(1), &mut net, 30);
        assert!(!ball.apply_pending_hit());

        net.owners.insert(EntityId(4), PeerId(1));
        ball.refresh_ownership(&net);
        assert!(ball.apply_pending_hit());
        assert_eq!(ball.velocity, vec3(0.0, 0.0, 3.0));
        assert_eq!(ball.last_hitter, Some(PeerId(1)));
        assert!(ball.pending_hit().is_none());
    }

    #[test]
    fn parked_hit_expires() {
        let mut net = RecordingAuthority::new(PeerId(1));
        let mut ball = Ball::new(EntityId(4), 0, Vec3::ZERO, BallPhysicsConfig::default());
        ball.on_hit(vec3(1.0, 0.0, 0.0), PeerId(1), &mut net, 2);
        for _ in 0..3 {
            assert!(!ball.apply_pending_hit());
        }
        assert!(ball.pending_hit().is_none());

        // A late grant no longer moves the ball
        net.owners.insert(EntityId(4), PeerId(1));
        ball.refresh_ownership(&net);
        assert!(!ball.apply_pending_hit());
        assert_eq!(ball.velocity, Vec3::ZERO);
    }

    #[test]
    fn refresh_reports_pending_request() {
        let mut net = RecordingAuthority::new(PeerId(1)).with_owner(EntityId(1), PeerId(2));
        let mut ball = Ball::new(EntityId(1), 0, Vec3::ZERO, BallPhysicsConfig::default());
        ball.refresh_ownership(&net);
        assert_eq!(ball.ownership(), Ownership::OwnedBy(PeerId(2)));

        net.request_ownership(EntityId(1));
        ball.refresh_ownership(&net);
        assert_eq!(ball.ownership(), Ownership::RequestPending);
    }

    #[test]
    fn reconcile_snaps_to_replica() {
        let mut ball = Ball::new(EntityId(1), 3, Vec3::ZERO, BallPhysicsConfig::default())
            .with_ownership(Ownership::OwnedBy(PeerId(2)));
        let replica = BallSnapshot {
            id: EntityId(1),
            number: 3,
            position: vec3(0.5, 0.0, 0.25),
            velocity: vec3(1.0, 0.0, 0.0),
            last_hitter: Some(PeerId(2)),
        };
        ball.reconcile(&replica, 1.0, 0.001);
        assert_eq!(ball.position, replica.position);
        assert_eq!(ball.velocity, replica.velocity);
        assert_eq!(ball.last_hitter, Some(PeerId(2)));
    }

    #[test]
    fn reconcile_ignored_by_owner() {
        let mut ball = owned_ball(Vec3::ZERO);
        let replica = BallSnapshot {
            id: EntityId(1),
            number: 0,
            position: vec3(0.5, 0.0, 0.0),
            velocity: Vec3::ZERO,
            last_hitter: None,
        };
        ball.reconcile(&replica, 1.0, 0.001);
        assert_eq!(ball.position, Vec3::ZERO);
    }

    #[test]
    fn respot_clears_motion_and_attribution() {
        let mut ball = owned_ball(Vec3::ZERO).with_velocity(vec3(1.0, 0.0, 0.0));
        ball.last_hitter = Some(PeerId(1));
        ball.mark_destroyed();
        ball.respot(vec3(-0.6, 0.0, 0.0));
        assert!(ball.is_alive());
        assert_eq!(ball.velocity, Vec3::ZERO);
        assert_eq!(ball.last_hitter, None);
    }
}
