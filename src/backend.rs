//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to work
//! with the controller, plus the narrower [`PhysicsView`] the step logic
//! queries. Swapping physics engines only means implementing
//! [`SpherePhysicsBackend`].

use std::marker::PhantomData;

use bevy::math::Affine3A;
use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::platform::PlatformBody;

/// Trait for physics backend implementations.
///
/// The backend owns every interaction with the physics engine: reading and
/// writing body velocity, answering queries, and reporting contacts. Contact
/// reporting is wired up by the backend's [`plugin`](Self::plugin), which must
/// feed [`MovingSphere::record_contact`](crate::controller::MovingSphere::record_contact)
/// in [`MovingSphereSet::Contacts`](crate::MovingSphereSet::Contacts).
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`
/// (enabled with the `rapier3d` feature).
pub trait SpherePhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of a body.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of a body.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the world position of a body.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the world transform of a body.
    fn get_transform(world: &World, entity: Entity) -> Affine3A;

    /// Whether the physics engine has put the body to sleep.
    fn is_sleeping(world: &World, entity: Entity) -> bool;

    /// Whether the body is moved kinematically.
    fn is_kinematic(world: &World, entity: Entity) -> bool;

    /// Get the mass of a body.
    fn get_mass(_world: &World, _entity: Entity) -> f32 {
        // Default implementation returns 1.0
        1.0
    }

    /// Cast a ray and return the first hit on a collider whose layers
    /// intersect `mask`.
    ///
    /// # Arguments
    /// * `world` - The ECS world for queries
    /// * `origin` - Ray origin in world space
    /// * `direction` - Ray direction (normalized)
    /// * `max_distance` - Maximum cast distance
    /// * `exclude_entity` - Entity to exclude from the cast (usually self)
    /// * `mask` - Layer bits the ray may hit
    fn raycast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude_entity: Entity,
        mask: u32,
    ) -> Option<CollisionData>;

    /// Sweep a box along a direction and return the distance to the first
    /// hit on a collider whose layers intersect `mask`.
    ///
    /// Used by camera rigs to keep the view unobstructed.
    ///
    /// # Arguments
    /// * `world` - The ECS world for queries
    /// * `origin` - Box center at the start of the sweep
    /// * `half_extents` - Half size of the box
    /// * `direction` - Sweep direction (normalized)
    /// * `orientation` - Box rotation
    /// * `max_distance` - Maximum sweep distance
    /// * `mask` - Layer bits the box may hit
    fn sweep_cast(
        world: &World,
        origin: Vec3,
        half_extents: Vec3,
        direction: Vec3,
        orientation: Quat,
        max_distance: f32,
        mask: u32,
    ) -> Option<f32>;

    /// Get the fixed timestep length.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// The queries a fixed step makes against the physics world.
///
/// Implemented by [`BackendView`] for any [`SpherePhysicsBackend`]; tests
/// and custom drivers can implement it directly.
pub trait PhysicsView {
    /// Cast a ray for the ground-snap probe.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: u32) -> Option<CollisionData>;

    /// Describe a body that might be carrying the sphere.
    fn platform(&self, body: Entity) -> Option<PlatformBody>;
}

/// [`PhysicsView`] over a Bevy world through backend `B`.
pub struct BackendView<'w, B: SpherePhysicsBackend> {
    world: &'w World,
    exclude: Entity,
    _marker: PhantomData<B>,
}

impl<'w, B: SpherePhysicsBackend> BackendView<'w, B> {
    /// Create a view whose raycasts ignore `exclude` (the sphere itself).
    pub fn new(world: &'w World, exclude: Entity) -> Self {
        Self {
            world,
            exclude,
            _marker: PhantomData,
        }
    }
}

impl<B: SpherePhysicsBackend> PhysicsView for BackendView<'_, B> {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: u32) -> Option<CollisionData> {
        B::raycast(self.world, origin, direction, max_distance, self.exclude, mask)
    }

    fn platform(&self, body: Entity) -> Option<PlatformBody> {
        self.world.get_entity(body).ok()?;
        Some(PlatformBody {
            kinematic: B::is_kinematic(self.world, body),
            mass: B::get_mass(self.world, body),
            transform: B::get_transform(self.world, body),
        })
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
