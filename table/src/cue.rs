//! Turning raw player input into cue-ball impulses.
//!
//! Two input styles feed `PeerSession::hit`: a tracked hand that strikes the
//! ball directly, and a thumbstick that charges a shot while held.

use billiards_shared::vec3::{self, vec3, Vec3};

use crate::config::CueConfig;

/// Tracks a hand between ticks and reports a strike when it meets the ball.
#[derive(Debug, Clone)]
pub struct HandStrike {
    config: CueConfig,
    last_position: Option<Vec3>,
    velocity: Vec3,
}

impl HandStrike {
    pub fn new(config: CueConfig) -> Self {
        Self {
            config,
            last_position: None,
            velocity: Vec3::ZERO,
        }
    }

    /// Hand velocity measured at the last update.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Feed the hand position for this tick. Returns the cue-ball velocity
    /// when the hand is touching the ball and moving fast enough.
    pub fn update(&mut self, hand: Vec3, dt: f64, cue_ball: Vec3) -> Option<Vec3> {
        self.velocity = match self.last_position {
            Some(last) if dt > 0.0 => vec3::scale(vec3::sub(hand, last), 1.0 / dt),
            _ => Vec3::ZERO,
        };
        self.last_position = Some(hand);

        if vec3::distance(hand, cue_ball) >= self.config.contact_distance {
            return None;
        }
        if vec3::length(self.velocity) <= self.config.min_hit_velocity {
            return None;
        }

        // Strikes stay on the cloth
        Some(vec3::horizontal(vec3::scale(
            self.velocity,
            self.config.hit_multiplier,
        )))
    }

    pub fn reset(&mut self) {
        self.last_position = None;
        self.velocity = Vec3::ZERO;
    }
}

/// Thumbstick charge: hold past the deadzone to fire once, release to re-arm.
#[derive(Debug, Clone)]
pub struct ChargeShot {
    config: CueConfig,
    held: f64,
    fired: bool,
}

impl ChargeShot {
    pub fn new(config: CueConfig) -> Self {
        Self {
            config,
            held: 0.0,
            fired: false,
        }
    }

    /// Seconds the stick has been held toward the current shot.
    pub fn held(&self) -> f64 {
        self.held
    }

    /// Feed the stick position `(x, y)` for this tick. Returns the shot
    /// velocity on the tick the hold completes; stick y maps to table z.
    pub fn update(&mut self, stick: (f64, f64), dt: f64) -> Option<Vec3> {
        let (x, y) = stick;
        if (x * x + y * y).sqrt() <= self.config.deadzone {
            self.held = 0.0;
            self.fired = false;
            return None;
        }
        if self.fired {
            return None;
        }

        self.held += dt;
        if self.held < self.config.hold_seconds {
            return None;
        }

        self.fired = true;
        self.held = 0.0;
        let direction = vec3::normalize(vec3(x, 0.0, y));
        Some(vec3::scale(direction, self.config.shot_power))
    }
}
