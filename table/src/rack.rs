//! Starting ball layouts.
//!
//! The cue ball sits on the head spot. Object balls are racked with the apex
//! on the foot spot, pointing back toward the cue ball, rows spreading toward
//! the foot rail.

use billiards_shared::config::TableConfig;
use billiards_shared::vec3::{vec3, Vec3};
use std::str::FromStr;

/// Clearance between racked balls so nothing starts overlapping.
const RACK_CLEARANCE: f64 = 0.0005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RackLayout {
    /// Balls 1-9 in a diamond, the 9 in the middle.
    #[default]
    NineBall,
    /// Balls 1-15 in a triangle, the 8 in the middle of the third row.
    EightBall,
}

impl FromStr for RackLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nine" | "nine_ball" | "9" => Ok(RackLayout::NineBall),
            "eight" | "eight_ball" | "8" => Ok(RackLayout::EightBall),
            other => Err(format!("unknown rack layout '{other}' (expected nine or eight)")),
        }
    }
}

// (ball number, row, offset across the table in ball spacings)
const NINE_BALL: [(u8, usize, f64); 9] = [
    (1, 0, 0.0),
    (2, 1, -0.5),
    (3, 1, 0.5),
    (4, 2, -1.0),
    (9, 2, 0.0),
    (5, 2, 1.0),
    (6, 3, -0.5),
    (7, 3, 0.5),
    (8, 4, 0.0),
];

const EIGHT_BALL: [(u8, usize, f64); 15] = [
    (1, 0, 0.0),
    (9, 1, -0.5),
    (2, 1, 0.5),
    (3, 2, -1.0),
    (8, 2, 0.0),
    (10, 2, 1.0),
    (11, 3, -1.5),
    (4, 3, -0.5),
    (5, 3, 0.5),
    (12, 3, 1.5),
    (6, 4, -2.0),
    (13, 4, -1.0),
    (14, 4, 0.0),
    (7, 4, 1.0),
    (15, 4, 2.0),
];

/// Where the cue ball starts and is respotted.
pub fn head_spot(config: &TableConfig) -> Vec3 {
    vec3(-config.half_length / 2.0, config.surface_y, 0.0)
}

/// Apex of the rack.
pub fn foot_spot(config: &TableConfig) -> Vec3 {
    vec3(config.half_length / 2.0, config.surface_y, 0.0)
}

/// Ball numbers and positions for a fresh rack, cue ball first.
pub fn rack_positions(layout: RackLayout, config: &TableConfig, radius: f64) -> Vec<(u8, Vec3)> {
    let table: &[(u8, usize, f64)] = match layout {
        RackLayout::NineBall => &NINE_BALL,
        RackLayout::EightBall => &EIGHT_BALL,
    };

    let gap = radius * 2.0 + RACK_CLEARANCE;
    let row_offset = gap * 3f64.sqrt() / 2.0;
    let apex = foot_spot(config);

    let mut positions = Vec::with_capacity(table.len() + 1);
    positions.push((0, head_spot(config)));
    for &(number, row, across) in table {
        positions.push((
            number,
            vec3(apex.x + row as f64 * row_offset, apex.y, apex.z + across * gap),
        ));
    }
    positions
}
