//! Controller configuration.
//!
//! [`SphereControllerConfig`] holds the designer-facing tunables. Angles are
//! given in degrees; the controller works with their cosines, which are cached
//! in [`SurfaceThresholds`] and recomputed whenever the config is replaced
//! through [`MovingSphere::set_config`](crate::controller::MovingSphere::set_config).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest supported number of air jumps.
pub const MAX_AIR_JUMPS_LIMIT: u32 = 5;

/// Errors produced while loading a persisted configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The text is not valid TOML or does not match the config schema.
    #[error("failed to parse controller config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The config could not be serialized back to TOML.
    #[error("failed to serialize controller config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Check whether any of the `layers` bits are selected by `mask`.
#[inline]
pub fn mask_selects(mask: u32, layers: u32) -> bool {
    mask & layers != 0
}

/// Tunables for a [`MovingSphere`](crate::controller::MovingSphere).
///
/// Speeds are in units/second, accelerations in units/second².
///
/// # Surface masks
///
/// Every collider reports a `u32` bitset of the layers it belongs to. The three
/// masks select which of those layers are probed for ground snapping, which
/// use the looser stairs angle, and which may be climbed.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SphereControllerConfig {
    // === Movement ===
    /// Top speed when walking or in the air.
    pub max_speed: f32,
    /// Speed change rate while grounded.
    pub max_acceleration: f32,
    /// Speed change rate while airborne.
    pub max_air_acceleration: f32,

    // === Climbing ===
    /// Top speed while climbing, and while walking with climb held.
    pub max_climb_speed: f32,
    /// Speed change rate while climbing. Also scales the pull that keeps
    /// the sphere pressed against a climbed wall.
    pub max_climb_acceleration: f32,

    // === Jumping ===
    /// Apex height of a jump from rest.
    pub jump_height: f32,
    /// Number of extra jumps allowed before touching ground again.
    pub max_air_jumps: u32,
    /// Whether touching a steep surface allows jumping off it.
    pub wall_jumps_enabled: bool,

    // === Surfaces ===
    /// Steepest slope (degrees) still treated as ground.
    pub max_ground_angle: f32,
    /// Steepest slope (degrees) treated as ground on stairs layers.
    pub max_stairs_angle: f32,
    /// Most overhanging surface (degrees from up) that can still be climbed.
    pub max_climb_angle: f32,

    // === Ground snapping ===
    /// Above this speed the sphere is allowed to launch off bumps.
    pub max_snap_speed: f32,
    /// Length of the downward snap probe.
    pub probe_distance: f32,
    /// Layers the snap probe can hit.
    pub probe_mask: u32,
    /// Layers that use [`max_stairs_angle`](Self::max_stairs_angle).
    pub stairs_mask: u32,
    /// Layers that can be climbed.
    pub climb_mask: u32,
}

impl Default for SphereControllerConfig {
    fn default() -> Self {
        Self {
            // Movement
            max_speed: 10.0,
            max_acceleration: 10.0,
            max_air_acceleration: 1.0,

            // Climbing
            max_climb_speed: 2.0,
            max_climb_acceleration: 20.0,

            // Jumping
            jump_height: 2.0,
            max_air_jumps: 0,
            wall_jumps_enabled: true,

            // Surfaces
            max_ground_angle: 40.0,
            max_stairs_angle: 50.0,
            max_climb_angle: 140.0,

            // Ground snapping
            max_snap_speed: 100.0,
            probe_distance: 1.0,
            probe_mask: u32::MAX,
            stairs_mask: 0,
            climb_mask: u32::MAX,
        }
    }
}

impl SphereControllerConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config tuned for a nimble player: faster, with one air jump.
    pub fn player() -> Self {
        Self {
            max_speed: 12.0,
            max_acceleration: 35.0,
            max_air_acceleration: 3.0,
            max_air_jumps: 1,
            ..default()
        }
    }

    /// Load a config from TOML text. Missing keys keep their defaults and the
    /// result is [validated](Self::validated).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        Ok(config.validated())
    }

    /// Serialize this config as TOML text.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Clamp every option into its supported range.
    ///
    /// Invalid values are never rejected; they are pulled to the nearest
    /// valid setting.
    pub fn validated(self) -> Self {
        let speed = |v: f32| finite_or(v, 0.0).clamp(0.0, 100.0);
        Self {
            max_speed: speed(self.max_speed),
            max_acceleration: speed(self.max_acceleration),
            max_air_acceleration: speed(self.max_air_acceleration),
            max_climb_speed: speed(self.max_climb_speed),
            max_climb_acceleration: speed(self.max_climb_acceleration),
            jump_height: finite_or(self.jump_height, 0.0).clamp(0.0, 10.0),
            max_air_jumps: self.max_air_jumps.min(MAX_AIR_JUMPS_LIMIT),
            wall_jumps_enabled: self.wall_jumps_enabled,
            max_ground_angle: finite_or(self.max_ground_angle, 0.0).clamp(0.0, 90.0),
            max_stairs_angle: finite_or(self.max_stairs_angle, 0.0).clamp(0.0, 90.0),
            max_climb_angle: finite_or(self.max_climb_angle, 90.0).clamp(90.0, 180.0),
            max_snap_speed: speed(self.max_snap_speed),
            probe_distance: finite_or(self.probe_distance, 0.0).max(0.0),
            probe_mask: self.probe_mask,
            stairs_mask: self.stairs_mask,
            climb_mask: self.climb_mask,
        }
    }

    /// Builder: set top speed and ground acceleration.
    pub fn with_movement(mut self, max_speed: f32, max_acceleration: f32) -> Self {
        self.max_speed = max_speed;
        self.max_acceleration = max_acceleration;
        self
    }

    /// Builder: set air acceleration.
    pub fn with_air_acceleration(mut self, acceleration: f32) -> Self {
        self.max_air_acceleration = acceleration;
        self
    }

    /// Builder: set climb speed and acceleration.
    pub fn with_climbing(mut self, max_climb_speed: f32, max_climb_acceleration: f32) -> Self {
        self.max_climb_speed = max_climb_speed;
        self.max_climb_acceleration = max_climb_acceleration;
        self
    }

    /// Builder: set jump height.
    pub fn with_jump_height(mut self, height: f32) -> Self {
        self.jump_height = height;
        self
    }

    /// Builder: set the air jump budget.
    pub fn with_air_jumps(mut self, count: u32) -> Self {
        self.max_air_jumps = count;
        self
    }

    /// Builder: enable or disable wall jumps.
    pub fn with_wall_jumps(mut self, enabled: bool) -> Self {
        self.wall_jumps_enabled = enabled;
        self
    }

    /// Builder: set ground and stairs slope limits (degrees).
    pub fn with_ground_angles(mut self, ground: f32, stairs: f32) -> Self {
        self.max_ground_angle = ground;
        self.max_stairs_angle = stairs;
        self
    }

    /// Builder: set the climb angle limit (degrees).
    pub fn with_climb_angle(mut self, angle: f32) -> Self {
        self.max_climb_angle = angle;
        self
    }

    /// Builder: set snap speed limit and probe length.
    pub fn with_snapping(mut self, max_snap_speed: f32, probe_distance: f32) -> Self {
        self.max_snap_speed = max_snap_speed;
        self.probe_distance = probe_distance;
        self
    }

    /// Builder: set the probe, stairs and climb masks.
    pub fn with_masks(mut self, probe: u32, stairs: u32, climb: u32) -> Self {
        self.probe_mask = probe;
        self.stairs_mask = stairs;
        self.climb_mask = climb;
        self
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Cosine thresholds derived from the configured angles.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SurfaceThresholds {
    /// Minimum `dot(up, normal)` for ground.
    pub min_ground_dot: f32,
    /// Minimum `dot(up, normal)` for ground on stairs layers.
    pub min_stairs_dot: f32,
    /// Minimum `dot(up, normal)` for climbable surfaces. Negative for
    /// climb angles past 90 degrees.
    pub min_climb_dot: f32,
}

impl SurfaceThresholds {
    /// Compute thresholds for a config.
    pub fn from_config(config: &SphereControllerConfig) -> Self {
        Self {
            min_ground_dot: config.max_ground_angle.to_radians().cos(),
            min_stairs_dot: config.max_stairs_angle.to_radians().cos(),
            min_climb_dot: config.max_climb_angle.to_radians().cos(),
        }
    }

    /// Ground threshold for a surface on `layers`.
    #[inline]
    pub fn min_dot(&self, layers: u32, stairs_mask: u32) -> f32 {
        if mask_selects(stairs_mask, layers) {
            self.min_stairs_dot
        } else {
            self.min_ground_dot
        }
    }
}

impl Default for SurfaceThresholds {
    fn default() -> Self {
        Self::from_config(&SphereControllerConfig::default())
    }
}
