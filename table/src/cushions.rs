use billiards_shared::config::TableConfig;
use billiards_shared::vec3::{self, vec3, Vec3};

/// Straight rail cushion. `normal` points into the playing area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cushion {
    pub from: Vec3,
    pub to: Vec3,
    pub normal: Vec3,
}

/// Result of a swept query against the cushions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub normal: Vec3,
    /// Distance along the sweep direction until the ball touches the rail.
    pub distance: f64,
}

/// Static table boundary.
#[derive(Debug, Clone, Default)]
pub struct Cushions {
    segments: Vec<Cushion>,
}

impl Cushions {
    /// No rails at all (open plane).
    pub fn none() -> Self {
        Self::default()
    }

    /// Four rails with openings at the corner and side pockets.
    pub fn for_table(config: &TableConfig) -> Self {
        let hl = config.half_length;
        let hw = config.half_width;
        let y = config.surface_y;
        let cg = config.corner_pocket_gap;
        let sg = config.side_pocket_gap;

        let top = vec3(0.0, 0.0, -1.0);
        let bottom = vec3(0.0, 0.0, 1.0);
        let left = vec3(1.0, 0.0, 0.0);
        let right = vec3(-1.0, 0.0, 0.0);

        let segment = |fx: f64, fz: f64, tx: f64, tz: f64, normal: Vec3| Cushion {
            from: vec3(fx, y, fz),
            to: vec3(tx, y, tz),
            normal,
        };

        Self {
            segments: vec![
                // Long rails, split by the side pockets
                segment(-hl + cg, hw, -sg, hw, top),
                segment(sg, hw, hl - cg, hw, top),
                segment(-hl + cg, -hw, -sg, -hw, bottom),
                segment(sg, -hw, hl - cg, -hw, bottom),
                // Short rails
                segment(-hl, -hw + cg, -hl, hw - cg, left),
                segment(hl, -hw + cg, hl, hw - cg, right),
            ],
        }
    }

    pub fn segments(&self) -> &[Cushion] {
        &self.segments
    }

    /// Sweep a circle of `radius` from `origin` along unit `direction` for up
    /// to `max_distance`, returning the nearest rail it would touch.
    ///
    /// Only rails the ball is moving toward count. A ball whose center is
    /// already behind a rail line is ignored for that rail.
    pub fn sweep(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f64,
        radius: f64,
    ) -> Option<WallHit> {
        if max_distance <= f64::EPSILON {
            return None;
        }

        let mut best: Option<WallHit> = None;
        for cushion in &self.segments {
            let approach = vec3::dot(direction, cushion.normal);
            if approach >= -1e-9 {
                continue;
            }

            let center_offset = vec3::dot(vec3::sub(origin, cushion.from), cushion.normal);
            if center_offset < 0.0 {
                continue;
            }

            let gap = center_offset - radius;
            let distance = (gap / -approach).max(0.0);
            if distance > max_distance {
                continue;
            }

            // Where the ball meets the rail line, measured along the rail
            let center_at_contact = vec3::add(origin, vec3::scale(direction, distance));
            let contact = vec3::sub(center_at_contact, vec3::scale(cushion.normal, radius));
            let along = vec3::sub(cushion.to, cushion.from);
            let rail_length = vec3::length(along);
            let s = vec3::dot(vec3::sub(contact, cushion.from), along) / rail_length;
            if s < 0.0 || s > rail_length {
                continue;
            }

            if best.map_or(true, |b| distance < b.distance) {
                best = Some(WallHit {
                    normal: cushion.normal,
                    distance,
                });
            }
        }
        best
    }

    /// True when `position` lies outside the rail lines by more than `margin`.
    pub fn outside(&self, position: Vec3, margin: f64) -> bool {
        self.segments
            .iter()
            .any(|c| vec3::dot(vec3::sub(position, c.from), c.normal) < -margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f64 = 0.03;

    fn table() -> (TableConfig, Cushions) {
        let config = TableConfig::default();
        let cushions = Cushions::for_table(&config);
        (config, cushions)
    }

    #[test]
    fn six_rail_segments() {
        let (_, cushions) = table();
        assert_eq!(cushions.segments().len(), 6);
    }

    #[test]
    fn hits_right_rail_head_on() {
        let (config, cushions) = table();
        let origin = vec3(config.half_length - 0.1, 0.0, 0.0);
        let hit = cushions
            .sweep(origin, vec3(1.0, 0.0, 0.0), 0.2, R)
            .expect("should hit right rail");
        assert_eq!(hit.normal, vec3(-1.0, 0.0, 0.0));
        assert!((hit.distance - 0.07).abs() < 1e-9);
    }

    #[test]
    fn misses_when_rail_out_of_reach() {
        let (config, cushions) = table();
        let origin = vec3(config.half_length - 0.5, 0.0, 0.0);
        assert!(cushions.sweep(origin, vec3(1.0, 0.0, 0.0), 0.1, R).is_none());
    }

    #[test]
    fn moving_away_does_not_hit() {
        let (config, cushions) = table();
        let origin = vec3(config.half_length - 0.04, 0.0, 0.0);
        assert!(cushions.sweep(origin, vec3(-1.0, 0.0, 0.0), 0.5, R).is_none());
    }

    #[test]
    fn passes_through_side_pocket_opening() {
        let (config, cushions) = table();
        let origin = vec3(0.0, 0.0, config.half_width - 0.1);
        assert!(cushions.sweep(origin, vec3(0.0, 0.0, 1.0), 0.2, R).is_none());
    }

    #[test]
    fn zero_distance_sweep_is_no_hit() {
        let (config, cushions) = table();
        let origin = vec3(config.half_length - 0.031, 0.0, 0.0);
        assert!(cushions.sweep(origin, vec3(1.0, 0.0, 0.0), 0.0, R).is_none());
    }

    #[test]
    fn nearest_rail_wins_in_corner_region() {
        let (config, cushions) = table();
        let origin = vec3(config.half_length - 0.2, 0.0, config.half_width - 0.05);
        let dir = vec3::normalize(vec3(1.0, 0.0, 1.0));
        let hit = cushions.sweep(origin, dir, 1.0, R).expect("should hit");
        assert_eq!(hit.normal, vec3(0.0, 0.0, -1.0));
    }

    #[test]
    fn outside_detects_escaped_ball() {
        let (config, cushions) = table();
        assert!(!cushions.outside(vec3(0.0, 0.0, 0.0), R));
        assert!(cushions.outside(vec3(config.half_length + 0.1, 0.0, 0.0), R));
    }

    #[test]
    fn open_plane_never_hits() {
        let cushions = Cushions::none();
        assert!(cushions
            .sweep(Vec3::ZERO, vec3(1.0, 0.0, 0.0), 100.0, R)
            .is_none());
        assert!(!cushions.outside(vec3(100.0, 0.0, 0.0), R));
    }
}
