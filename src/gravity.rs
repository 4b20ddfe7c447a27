//! Gravity providers.
//!
//! The controller never assumes world-down. Each fixed step it asks a
//! [`GravitySource`] for the acceleration and the matching up axis at the
//! body's position, so characters can walk around planets or on walls.

use bevy::prelude::*;

/// Acceleration and up axis at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravitySample {
    /// Gravitational acceleration.
    pub acceleration: Vec3,
    /// Unit "up" direction. Opposite to the acceleration when it is non-zero.
    pub up: Vec3,
}

impl GravitySample {
    /// Build a sample from an acceleration, deriving up from it.
    ///
    /// In zero gravity the up axis falls back to `fallback_up`.
    pub fn from_acceleration(acceleration: Vec3, fallback_up: Vec3) -> Self {
        let up = (-acceleration).normalize_or_zero();
        Self {
            acceleration,
            up: if up == Vec3::ZERO { fallback_up } else { up },
        }
    }
}

impl Default for GravitySample {
    fn default() -> Self {
        UniformGravity::default().gravity_at(Vec3::ZERO)
    }
}

/// Anything that can report gravity at a world position.
pub trait GravitySource: Send + Sync + 'static {
    /// Return the acceleration and up axis at `position`.
    fn gravity_at(&self, position: Vec3) -> GravitySample;
}

/// Constant gravity everywhere.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct UniformGravity {
    /// Acceleration applied everywhere.
    pub acceleration: Vec3,
}

impl Default for UniformGravity {
    fn default() -> Self {
        Self {
            acceleration: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

impl UniformGravity {
    /// Create uniform gravity with the given acceleration.
    pub fn new(acceleration: Vec3) -> Self {
        Self { acceleration }
    }
}

impl GravitySource for UniformGravity {
    fn gravity_at(&self, _position: Vec3) -> GravitySample {
        GravitySample::from_acceleration(self.acceleration, Vec3::Y)
    }
}

/// Radial gravity pulling toward a center point, like a small planet.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SphericalGravity {
    /// Center of attraction.
    pub center: Vec3,
    /// Magnitude of the pull.
    pub strength: f32,
    /// Beyond this distance there is no gravity. `None` means unbounded.
    pub outer_radius: Option<f32>,
}

impl SphericalGravity {
    /// Create unbounded radial gravity.
    pub fn new(center: Vec3, strength: f32) -> Self {
        Self {
            center,
            strength,
            outer_radius: None,
        }
    }

    /// Builder: limit the field to `radius` around the center.
    pub fn with_outer_radius(mut self, radius: f32) -> Self {
        self.outer_radius = Some(radius);
        self
    }
}

impl GravitySource for SphericalGravity {
    fn gravity_at(&self, position: Vec3) -> GravitySample {
        let offset = position - self.center;
        let up = offset.normalize_or_zero();
        if up == Vec3::ZERO {
            return GravitySample {
                acceleration: Vec3::ZERO,
                up: Vec3::Y,
            };
        }
        let inside = self
            .outer_radius
            .is_none_or(|radius| offset.length_squared() <= radius * radius);
        GravitySample {
            acceleration: if inside { -up * self.strength } else { Vec3::ZERO },
            up,
        }
    }
}

/// World resource holding the active gravity source.
///
/// When absent, systems fall back to [`UniformGravity::default`].
#[derive(Resource)]
pub struct GravityField(Box<dyn GravitySource>);

impl GravityField {
    /// Wrap a gravity source.
    pub fn new(source: impl GravitySource) -> Self {
        Self(Box::new(source))
    }

    /// Sample gravity at `position`.
    pub fn sample(&self, position: Vec3) -> GravitySample {
        self.0.gravity_at(position)
    }
}

impl Default for GravityField {
    fn default() -> Self {
        Self::new(UniformGravity::default())
    }
}

/// Sample the world's gravity field at `position`.
pub(crate) fn sample_gravity(world: &World, position: Vec3) -> GravitySample {
    world
        .get_resource::<GravityField>()
        .map(|field| field.sample(position))
        .unwrap_or_default()
}
