//! Ball-to-ball contact: overlap detection, separation and the normal/tangent
//! velocity exchange.
//!
//! Balls have equal mass. Only the velocity component along the contact
//! normal is exchanged (with restitution); the tangential component of each
//! ball is left untouched.

use billiards_shared::vec3::{self, Vec3};

use crate::authority::OwnershipPrimitive;
use crate::ball::Ball;

/// Normal used when two centers coincide exactly.
pub const FALLBACK_NORMAL: Vec3 = Vec3 {
    x: 0.0,
    y: 0.0,
    z: 1.0,
};

/// Overlap between two balls. `normal` points from the second ball toward the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub normal: Vec3,
    pub overlap: f64,
}

impl Contact {
    fn flipped(self) -> Self {
        Self {
            normal: vec3::scale(self.normal, -1.0),
            overlap: self.overlap,
        }
    }
}

/// How a pair was handled this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// Not touching (or one of them is gone).
    Separated,
    /// Touching, but this peer owns neither ball.
    NotOurs,
    /// Touching and corrected. `both` is false when only the owned ball was written.
    Resolved { both: bool },
}

pub fn detect(a: &Ball, b: &Ball) -> Option<Contact> {
    let delta = vec3::sub(a.position, b.position);
    let distance = vec3::length(delta);
    let min_distance = a.radius() + b.radius();
    if distance >= min_distance {
        return None;
    }

    let normal = if distance == 0.0 {
        FALLBACK_NORMAL
    } else {
        vec3::normalize_or(delta, FALLBACK_NORMAL)
    };
    Some(Contact {
        normal,
        overlap: min_distance - distance,
    })
}

/// Split `v` into its speed along unit `normal` and the remaining tangential part.
pub fn split_velocity(v: Vec3, normal: Vec3) -> (f64, Vec3) {
    let along = vec3::dot(v, normal);
    (along, vec3::sub(v, vec3::scale(normal, along)))
}

/// 1-D collision of equal masses with restitution `e`.
pub fn exchange_normal_speeds(v1n: f64, v2n: f64, e: f64) -> (f64, f64) {
    (
        (v1n * (1.0 - e) + v2n * (1.0 + e)) / 2.0,
        (v2n * (1.0 - e) + v1n * (1.0 + e)) / 2.0,
    )
}

/// Resolve one unordered pair from this peer's point of view.
///
/// The ball this peer owns is always written. The other ball is written only
/// if it is owned too; otherwise authority over it is requested and the
/// correction is left to a later tick.
pub fn resolve_pair(
    a: &mut Ball,
    b: &mut Ball,
    restitution: f64,
    net: &mut impl OwnershipPrimitive,
) -> PairOutcome {
    if !a.is_alive() || !b.is_alive() {
        return PairOutcome::Separated;
    }
    let Some(contact) = detect(a, b) else {
        return PairOutcome::Separated;
    };

    if a.is_owned() {
        resolve_from(a, b, contact, restitution, net)
    } else if b.is_owned() {
        resolve_from(b, a, contact.flipped(), restitution, net)
    } else {
        PairOutcome::NotOurs
    }
}

fn resolve_from(
    this: &mut Ball,
    other: &mut Ball,
    contact: Contact,
    restitution: f64,
    net: &mut impl OwnershipPrimitive,
) -> PairOutcome {
    let both = other.is_owned();
    if !both {
        other.request_authority(net);
    }

    let n = contact.normal;
    if both {
        let half = contact.overlap / 2.0;
        this.position = vec3::add(this.position, vec3::scale(n, half));
        other.position = vec3::sub(other.position, vec3::scale(n, half));
    } else {
        this.position = vec3::add(this.position, vec3::scale(n, contact.overlap));
    }

    let relative = vec3::sub(this.velocity, other.velocity);
    if vec3::dot(relative, n) < 0.0 {
        let (v1n, t1) = split_velocity(this.velocity, n);
        let (v2n, t2) = split_velocity(other.velocity, n);
        let (v1n_new, v2n_new) = exchange_normal_speeds(v1n, v2n, restitution);

        this.velocity = vec3::add(t1, vec3::scale(n, v1n_new));
        if both {
            other.velocity = vec3::add(t2, vec3::scale(n, v2n_new));
        }
    }

    if both {
        if let Some(hitter) = this.last_hitter {
            other.last_hitter = Some(hitter);
        }
    }
    if this.last_hitter.is_none() {
        this.last_hitter = other.last_hitter;
    }

    PairOutcome::Resolved { both }
}
