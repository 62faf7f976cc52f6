/// Per-peer session configuration
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub tick_rate_hz: u32,
    /// Pumps before an ownership request is granted (loopback hub only)
    pub ownership_latency_ticks: u32,
    /// Ticks a parked hit waits for authority before it is dropped
    pub hit_request_ttl_ticks: u32,
    pub rng_seed: u64,
    /// Ball number whose pot decides the game
    pub money_ball: u8,
    /// How many times a potted cue ball is put back on the head spot
    pub cue_ball_respawns: u32,
    /// Fraction of the replica gap closed per tick (1.0 snaps)
    pub reconcile_blend: f64,
    /// Replica gaps below this are left alone (m)
    pub snap_tolerance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            ownership_latency_ticks: 3,
            hit_request_ttl_ticks: 30, // 0.5 s at 60 Hz
            rng_seed: 42,
            money_ball: 9,
            cue_ball_respawns: 0,
            reconcile_blend: 1.0,
            snap_tolerance: 0.001,
        }
    }
}

impl SessionConfig {
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.ownership_latency_ticks > self.hit_request_ttl_ticks {
            return Err(
                "hit_request_ttl_ticks must be >= ownership_latency_ticks or deferred hits never land"
                    .to_string(),
            );
        }
        if self.money_ball == 0 {
            return Err("money_ball must be an object ball (>= 1)".to_string());
        }
        if !self.reconcile_blend.is_finite()
            || self.reconcile_blend <= 0.0
            || self.reconcile_blend > 1.0
        {
            return Err("reconcile_blend must be in (0, 1]".to_string());
        }
        if !self.snap_tolerance.is_finite() || self.snap_tolerance < 0.0 {
            return Err("snap_tolerance must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

/// Shaping of player input into ball impulses
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueConfig {
    /// Scale applied to hand velocity on a strike
    pub hit_multiplier: f64,
    /// Slowest hand movement that still counts as a strike (m/s)
    pub min_hit_velocity: f64,
    /// Hand-to-ball distance that counts as contact (m)
    pub contact_distance: f64,
    /// Stick magnitude ignored as noise
    pub deadzone: f64,
    /// How long the stick must be held before a charged shot fires (s)
    pub hold_seconds: f64,
    /// Speed of a charged shot (m/s)
    pub shot_power: f64,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            hit_multiplier: 1.5,
            min_hit_velocity: 0.2,
            contact_distance: 0.05,
            deadzone: 0.2,
            hold_seconds: 1.0,
            shot_power: 3.0,
        }
    }
}

impl CueConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.hit_multiplier.is_finite() || self.hit_multiplier <= 0.0 {
            return Err("hit_multiplier must be finite and > 0".to_string());
        }
        if !self.min_hit_velocity.is_finite() || self.min_hit_velocity < 0.0 {
            return Err("min_hit_velocity must be finite and >= 0".to_string());
        }
        if !self.contact_distance.is_finite() || self.contact_distance <= 0.0 {
            return Err("contact_distance must be finite and > 0".to_string());
        }
        if !self.deadzone.is_finite() || !(0.0..1.0).contains(&self.deadzone) {
            return Err("deadzone must be in [0, 1)".to_string());
        }
        if !self.hold_seconds.is_finite() || self.hold_seconds < 0.0 {
            return Err("hold_seconds must be finite and >= 0".to_string());
        }
        if !self.shot_power.is_finite() || self.shot_power <= 0.0 {
            return Err("shot_power must be finite and > 0".to_string());
        }
        Ok(())
    }
}
