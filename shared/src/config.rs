/// Per-ball physics parameters
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallPhysicsConfig {
    pub radius: f64,
    /// Multiplicative velocity decay per tick (0 < friction < 1)
    pub friction: f64,
    /// Speed below which velocity snaps to zero
    pub stop_threshold: f64,
    /// Restitution against cushions
    pub bounciness: f64,
}

impl Default for BallPhysicsConfig {
    fn default() -> Self {
        Self {
            radius: 0.03,         // m
            friction: 0.985,      // per tick
            stop_threshold: 0.01, // m/s
            bounciness: 0.8,
        }
    }
}

impl BallPhysicsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err("radius must be finite and > 0".to_string());
        }
        if !self.friction.is_finite() || self.friction <= 0.0 || self.friction >= 1.0 {
            return Err("friction must be in (0, 1)".to_string());
        }
        if !self.stop_threshold.is_finite() || self.stop_threshold < 0.0 {
            return Err("stop_threshold must be finite and >= 0".to_string());
        }
        if !self.bounciness.is_finite() || !(0.0..=1.0).contains(&self.bounciness) {
            return Err("bounciness must be in [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Table geometry and scoring
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// Half of the playing length along X (m)
    pub half_length: f64,
    /// Half of the playing width along Z (m)
    pub half_width: f64,
    /// Height of the cloth; balls are held on this plane
    pub surface_y: f64,
    /// Capture radius around each pocket center
    pub pocket_radius: f64,
    /// Length of rail removed on each side of a corner pocket
    pub corner_pocket_gap: f64,
    /// Half-width of the opening at each side pocket
    pub side_pocket_gap: f64,
    /// Ball-to-ball restitution along the contact normal
    pub ball_restitution: f64,
    /// Points credited per potted ball
    pub point_value: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            half_length: 1.27,
            half_width: 0.635,
            surface_y: 0.0,
            pocket_radius: 0.075,
            corner_pocket_gap: 0.09,
            side_pocket_gap: 0.07,
            ball_restitution: 0.98,
            point_value: 1,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.half_length.is_finite() || self.half_length <= 0.0 {
            return Err("half_length must be finite and > 0".to_string());
        }
        if !self.half_width.is_finite() || self.half_width <= 0.0 {
            return Err("half_width must be finite and > 0".to_string());
        }
        if !self.surface_y.is_finite() {
            return Err("surface_y must be finite".to_string());
        }
        if !self.pocket_radius.is_finite() || self.pocket_radius <= 0.0 {
            return Err("pocket_radius must be finite and > 0".to_string());
        }
        if !self.corner_pocket_gap.is_finite()
            || self.corner_pocket_gap < 0.0
            || self.corner_pocket_gap >= self.half_width
        {
            return Err("corner_pocket_gap must be in [0, half_width)".to_string());
        }
        if !self.side_pocket_gap.is_finite()
            || self.side_pocket_gap < 0.0
            || self.side_pocket_gap + self.corner_pocket_gap >= self.half_length
        {
            return Err("side_pocket_gap leaves no rail between pockets".to_string());
        }
        if !self.ball_restitution.is_finite() || !(0.0..=1.0).contains(&self.ball_restitution) {
            return Err("ball_restitution must be in [0, 1]".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_are_valid() {
        assert!(BallPhysicsConfig::default().validate().is_ok());
        assert!(TableConfig::default().validate().is_ok());
    }

    #[test]
    fn friction_of_one_is_invalid() {
        let config = BallPhysicsConfig {
            friction: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn restitution_above_one_invalid() {
        let config = TableConfig {
            ball_restitution: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_pocket_gaps_invalid() {
        let config = TableConfig {
            corner_pocket_gap: 0.7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&TableConfig::default()).unwrap();
        assert!(json.contains("\"halfLength\""));
        assert!(json.contains("\"pointValue\""));
    }
}
