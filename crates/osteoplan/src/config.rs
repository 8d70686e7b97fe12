//! Planner configuration.

use crate::{PlannerError, PlannerResult};
use osteoplan_guides::Perturbation;
use serde::{Deserialize, Serialize};

/// All user-facing settings of a planning session.
///
/// Blade and screw dimensions are millimeters; the scene itself works in
/// centimeters (the 1 mm-thick cutting-plane template makes the
/// thickness value double as its scale factor).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Number of fibula segments (>= 1).
    pub segment_count: usize,
    /// Bone-saw blade thickness (mm).
    pub cutting_plane_thickness: f64,
    /// Screw hole diameter (mm).
    pub screw_hole_diameter: f64,
    /// Width of guide material around the blade path (mm).
    pub guide_around_width: f64,
    /// Bevel smoothing passes on guide shells.
    pub bevel_segments: u32,
    /// Bevel round-over distance.
    pub bevel_width: f64,
    /// Auto-update poll interval in seconds.
    pub update_rate: f64,
    /// Decimate oversized inputs at rig initialization.
    pub auto_decimate: bool,
    /// Uniform scale applied on export (>= 0).
    pub export_scale_factor: f64,
    /// Anti-coplanar base scale for boolean operands. Empirically tuned
    /// and geometry dependent, hence configurable.
    pub perturbation_base: f64,
    /// Anti-coplanar per-operand scale increment.
    pub perturbation_step: f64,
    /// Positioning-aid width scale.
    pub positioning_aid_size_x: f64,
    /// Positioning-aid height scale.
    pub positioning_aid_size_z: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            segment_count: 3,
            cutting_plane_thickness: 0.9,
            screw_hole_diameter: 3.0,
            guide_around_width: 10.0,
            bevel_segments: 2,
            bevel_width: 0.1,
            update_rate: 0.2,
            auto_decimate: false,
            export_scale_factor: 1.0,
            perturbation_base: 4.0,
            perturbation_step: 0.01,
            positioning_aid_size_x: 1.0,
            positioning_aid_size_z: 1.0,
        }
    }
}

impl PlannerConfig {
    /// Validate all settings.
    pub fn validate(&self) -> PlannerResult<()> {
        if self.segment_count < 1 {
            return Err(PlannerError::InvalidConfig(
                "segment_count must be >= 1".into(),
            ));
        }
        if self.cutting_plane_thickness <= 0.0 {
            return Err(PlannerError::InvalidConfig(
                "cutting_plane_thickness must be positive".into(),
            ));
        }
        if self.screw_hole_diameter <= 0.0 {
            return Err(PlannerError::InvalidConfig(
                "screw_hole_diameter must be positive".into(),
            ));
        }
        if self.guide_around_width <= 0.0 {
            return Err(PlannerError::InvalidConfig(
                "guide_around_width must be positive".into(),
            ));
        }
        if self.bevel_width < 0.0 {
            return Err(PlannerError::InvalidConfig(
                "bevel_width must be >= 0".into(),
            ));
        }
        if self.update_rate <= 0.0 {
            return Err(PlannerError::InvalidConfig(
                "update_rate must be positive".into(),
            ));
        }
        if self.export_scale_factor < 0.0 {
            return Err(PlannerError::InvalidConfig(
                "export_scale_factor must be >= 0".into(),
            ));
        }
        if self.perturbation_base <= 0.0 || self.perturbation_step < 0.0 {
            return Err(PlannerError::InvalidConfig(
                "perturbation_base must be positive and perturbation_step non-negative".into(),
            ));
        }
        if self.positioning_aid_size_x <= 0.0 || self.positioning_aid_size_z <= 0.0 {
            return Err(PlannerError::InvalidConfig(
                "positioning aid sizes must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse a TOML configuration string.
    pub fn from_toml_str(text: &str) -> PlannerResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| PlannerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The operand perturbation derived from the configured constants.
    pub fn perturbation(&self) -> Perturbation {
        Perturbation {
            base: self.perturbation_base,
            step: self.perturbation_step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PlannerConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_segments_rejected() {
        let config = PlannerConfig {
            segment_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlannerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn toml_roundtrip_with_partial_overrides() {
        let config =
            PlannerConfig::from_toml_str("segment_count = 4\ncutting_plane_thickness = 1.2\n")
                .unwrap();
        assert_eq!(config.segment_count, 4);
        assert_eq!(config.cutting_plane_thickness, 1.2);
        // Unset fields fall back to defaults.
        assert_eq!(config.screw_hole_diameter, 3.0);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        assert!(matches!(
            PlannerConfig::from_toml_str("segment_count = \"three\""),
            Err(PlannerError::InvalidConfig(_))
        ));
    }
}
