//! Bot players that take shots on their own.
//!
//! A bot waits for the table to come to rest, thinks for a while according
//! to its personality, then strikes the cue ball toward the lowest-numbered
//! object ball with some power variation and aim error.

use billiards_shared::vec3::{self, Vec3};
use rand::Rng;

use crate::table::Table;

/// Base cue-ball speed for a bot shot (m/s)
const BASE_SHOT_SPEED: f64 = 2.0;

/// Bot personality affects timing, power and accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BotPersonality {
    /// Shoots quickly (0.3-0.8s after rest)
    Eager,
    /// Takes time lining up (1.5-4.0s)
    Relaxed,
    /// Unpredictable timing, power and aim (0.2-6.0s)
    Chaotic,
}

impl BotPersonality {
    /// Get delay range for this personality (min, max) in seconds
    fn delay_range(&self) -> (f64, f64) {
        match self {
            BotPersonality::Eager => (0.3, 0.8),
            BotPersonality::Relaxed => (1.5, 4.0),
            BotPersonality::Chaotic => (0.2, 6.0),
        }
    }

    fn random_delay(&self, rng: &mut impl Rng) -> f64 {
        let (min, max) = self.delay_range();
        min + rng.gen::<f64>() * (max - min)
    }

    /// Shot power factor for this personality
    fn power_factor(&self, rng: &mut impl Rng) -> f64 {
        match self {
            BotPersonality::Eager => 0.9 + rng.gen::<f64>() * 0.2,   // 0.9-1.1
            BotPersonality::Relaxed => 0.7 + rng.gen::<f64>() * 0.3, // 0.7-1.0
            BotPersonality::Chaotic => 0.5 + rng.gen::<f64>() * 1.0, // 0.5-1.5
        }
    }

    /// Largest aim error in radians
    fn aim_jitter(&self) -> f64 {
        match self {
            BotPersonality::Eager => 0.05,
            BotPersonality::Relaxed => 0.02,
            BotPersonality::Chaotic => 0.3,
        }
    }

    /// Select a random personality
    pub fn random(rng: &mut impl Rng) -> Self {
        match rng.gen_range(0..3) {
            0 => BotPersonality::Eager,
            1 => BotPersonality::Relaxed,
            _ => BotPersonality::Chaotic,
        }
    }
}

/// Automated shooter for one peer
#[derive(Debug, Clone)]
pub struct BotShooter {
    pub personality: BotPersonality,
    /// Time left before the next shot, armed once the table is at rest
    delay: Option<f64>,
}

impl BotShooter {
    pub fn new(personality: BotPersonality) -> Self {
        Self {
            personality,
            delay: None,
        }
    }

    /// Tick the bot. Returns the cue-ball velocity when it decides to shoot.
    pub fn tick(&mut self, dt: f64, table: &Table, rng: &mut impl Rng) -> Option<Vec3> {
        if !table.at_rest() {
            self.delay = None;
            return None;
        }

        let cue = table.cue_ball()?;
        let target_number = table.next_target_ball_number();
        let target = table
            .balls()
            .iter()
            .find(|b| b.is_alive() && b.number == target_number && !b.is_cue())?;

        let delay = self
            .delay
            .get_or_insert_with(|| self.personality.random_delay(rng));
        *delay -= dt;
        if *delay > 0.0 {
            return None;
        }
        self.delay = None;

        let aim = vec3::normalize(vec3::horizontal(vec3::sub(target.position, cue.position)));
        let jitter = self.personality.aim_jitter();
        let aim = vec3::rotate_y(aim, rng.gen_range(-jitter..=jitter));
        let speed = BASE_SHOT_SPEED * self.personality.power_factor(rng);

        tracing::debug!(personality = ?self.personality, target = target_number, speed, "bot shoots");
        Some(vec3::scale(aim, speed))
    }
}
