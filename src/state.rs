//! State marker components.
//!
//! These components mirror the support classification of a [`MovingSphere`]
//! after each fixed step. They are added and removed automatically, so game
//! code (renderers, animation, audio) can react with plain queries.
//!
//! [`MovingSphere`]: crate::controller::MovingSphere

use bevy::prelude::*;

/// Marker component indicating the sphere is supported.
///
/// Present while the sphere stands on ground, was snapped to it, is wedged in
/// a walkable corner, or is climbing. Mutually exclusive with [`Airborne`].
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use moving_sphere_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the sphere has no support.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the sphere is climbing.
///
/// Always accompanied by [`Grounded`]. Useful for swapping materials or
/// animations while on a wall.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Climbing;

/// The sphere touched at least one surface too steep to stand on.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct OnSteep {
    /// Normalized sum of the steep normals.
    pub normal: Vec3,
}

impl Default for OnSteep {
    fn default() -> Self {
        Self { normal: Vec3::X }
    }
}

impl OnSteep {
    /// Create a steep contact state.
    pub fn new(normal: Vec3) -> Self {
        Self { normal }
    }

    /// Whether the surface faces against `direction`, i.e. blocks movement
    /// along it.
    pub fn blocks(&self, direction: Vec3) -> bool {
        self.normal.dot(direction) < 0.0
    }
}
