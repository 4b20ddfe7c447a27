//! Connected-platform tracking.
//!
//! When the sphere rests on a body that carries it (kinematic, or at least as
//! heavy as the sphere), locomotion is computed relative to that body's
//! velocity so the sphere rides moving platforms instead of sliding off.

use bevy::math::Affine3A;
use bevy::prelude::*;

/// What the tracker needs to know about a candidate platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformBody {
    /// Whether the body is moved kinematically.
    pub kinematic: bool,
    /// Mass of the body.
    pub mass: f32,
    /// Current world transform of the body.
    pub transform: Affine3A,
}

impl PlatformBody {
    /// Whether this body should carry a sphere of `body_mass`.
    ///
    /// Lighter dynamic bodies are left to the physics engine's contact
    /// response.
    #[inline]
    pub fn carries(&self, body_mass: f32) -> bool {
        self.kinematic || self.mass >= body_mass
    }
}

/// Platform the sphere is connected to and its estimated velocity.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct PlatformConnection {
    /// Body supporting the sphere this step.
    pub current: Option<Entity>,
    /// Body that supported the sphere last step.
    pub previous: Option<Entity>,
    /// Anchor position in world space, as of the last sample.
    pub world_anchor: Vec3,
    /// The same anchor in the platform's local space.
    pub local_anchor: Vec3,
    /// Estimated platform velocity at the anchor.
    pub velocity: Vec3,
}

impl PlatformConnection {
    /// Update the velocity estimate for the current platform and re-anchor
    /// at `position`.
    ///
    /// The estimate stays zero unless the same platform was also connected
    /// on the previous step.
    pub fn track(&mut self, platform: &PlatformBody, position: Vec3, dt: f32) {
        if self.current.is_some() && self.current == self.previous && dt > 0.0 {
            let displacement = platform.transform.transform_point3(self.local_anchor) - self.world_anchor;
            self.velocity = displacement / dt;
        }
        self.world_anchor = position;
        self.local_anchor = platform.transform.inverse().transform_point3(position);
    }

    /// Move on to the next step: the current platform becomes the previous
    /// one and the estimate is cleared.
    pub fn advance(&mut self) {
        self.previous = self.current.take();
        self.velocity = Vec3::ZERO;
    }
}
