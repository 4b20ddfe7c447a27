//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! Layers map to Rapier collision groups: a collider's layers are its
//! [`CollisionGroups::memberships`] bits, or the first group when it has no
//! [`CollisionGroups`].

use std::sync::Mutex;

use bevy::ecs::system::SystemState;
use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::SpherePhysicsBackend;
use crate::collision::CollisionData;
use crate::controller::MovingSphere;
use crate::intent::InputIntent;
use crate::MovingSphereSet;

/// Layer bits of colliders without [`CollisionGroups`].
pub const DEFAULT_LAYERS: u32 = Group::GROUP_1.bits();

/// Rapier3D physics backend for the sphere controller.
///
/// This backend uses `bevy_rapier3d` for velocity access and queries.
/// Contacts are gathered from Rapier's narrow phase by a dedicated system
/// that receives `RapierContext` as a system parameter.
pub struct Rapier3dBackend;

impl SpherePhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<GlobalTransform>(entity)
            .map(|t| t.translation())
            .or_else(|| world.get::<Transform>(entity).map(|t| t.translation))
            .unwrap_or(Vec3::ZERO)
    }

    fn get_transform(world: &World, entity: Entity) -> Affine3A {
        world
            .get::<GlobalTransform>(entity)
            .map(|t| t.affine())
            .or_else(|| world.get::<Transform>(entity).map(|t| t.compute_affine()))
            .unwrap_or(Affine3A::IDENTITY)
    }

    fn is_sleeping(world: &World, entity: Entity) -> bool {
        world
            .get::<Sleeping>(entity)
            .map(|s| s.sleeping)
            .unwrap_or(false)
    }

    fn is_kinematic(world: &World, entity: Entity) -> bool {
        matches!(
            world.get::<RigidBody>(entity),
            Some(RigidBody::Fixed | RigidBody::KinematicPositionBased | RigidBody::KinematicVelocityBased)
        )
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.mass)
            .filter(|mass| *mass > 0.0 && mass.is_finite())
            .unwrap_or(1.0)
    }

    fn raycast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude_entity: Entity,
        mask: u32,
    ) -> Option<CollisionData> {
        let queries = world.get_resource::<RapierQueries>()?;
        let mut state = queries.0.lock().ok()?;
        let rapier_context = state.get(world);
        let context = rapier_context.single().ok()?;

        context
            .cast_ray_and_get_normal(origin, direction, max_distance, true, query_filter(exclude_entity, mask))
            .map(|(hit_entity, hit)| {
                CollisionData::new(hit.time_of_impact, hit.normal, hit.point, body_of(world, hit_entity))
                    .with_layers(layers_of(world.get::<CollisionGroups>(hit_entity)))
            })
    }

    fn sweep_cast(
        world: &World,
        origin: Vec3,
        half_extents: Vec3,
        direction: Vec3,
        orientation: Quat,
        max_distance: f32,
        mask: u32,
    ) -> Option<f32> {
        let queries = world.get_resource::<RapierQueries>()?;
        let mut state = queries.0.lock().ok()?;
        let rapier_context = state.get(world);
        let context = rapier_context.single().ok()?;

        let shape = Collider::cuboid(half_extents.x, half_extents.y, half_extents.z);
        let filter = QueryFilter::default()
            .exclude_sensors()
            .groups(CollisionGroups::new(Group::ALL, Group::from_bits_truncate(mask)));

        context
            .cast_shape(
                origin,
                orientation,
                direction,
                &shape,
                ShapeCastOptions {
                    max_time_of_impact: max_distance,
                    stop_at_penetration: false,
                    ..default()
                },
                filter,
            )
            .map(|(_, hit)| hit.time_of_impact)
    }
}

/// Cached read access to the Rapier context for queries made through
/// `&World`.
#[derive(Resource)]
struct RapierQueries(Mutex<SystemState<ReadRapierContext<'static, 'static>>>);

/// Plugin that sets up Rapier3D-specific systems for the sphere controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        let state = SystemState::<ReadRapierContext>::new(app.world_mut());
        app.insert_resource(RapierQueries(Mutex::new(state)));

        app.add_systems(
            FixedUpdate,
            rapier_collect_contacts.in_set(MovingSphereSet::Contacts),
        );
    }
}

fn query_filter(exclude_entity: Entity, mask: u32) -> QueryFilter<'static> {
    QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(Group::ALL, Group::from_bits_truncate(mask)))
}

fn layers_of(groups: Option<&CollisionGroups>) -> u32 {
    groups.map(|cg| cg.memberships.bits()).unwrap_or(DEFAULT_LAYERS)
}

/// Rigid body a collider belongs to: itself or its parent.
fn body_of(world: &World, collider: Entity) -> Option<Entity> {
    if world.get::<RigidBody>(collider).is_some() {
        return Some(collider);
    }
    world
        .get::<ChildOf>(collider)
        .map(|child_of| child_of.parent())
        .filter(|parent| world.get::<RigidBody>(*parent).is_some())
}

/// Feed every active contact touching a controlled sphere into its
/// accumulator.
///
/// Rapier reports manifold normals pointing from the first collider of a
/// pair to the second, so the sign is flipped when the sphere comes first.
fn rapier_collect_contacts(
    rapier_context: ReadRapierContext,
    mut q_spheres: Query<(Entity, &mut MovingSphere)>,
    q_groups: Query<&CollisionGroups>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, mut sphere) in &mut q_spheres {
        for pair in context.contact_pairs_with(entity) {
            if !pair.has_any_active_contact() {
                continue;
            }
            let sphere_first = pair.collider1() == Some(entity);
            let other = if sphere_first { pair.collider2() } else { pair.collider1() };
            let layers = layers_of(other.and_then(|o| q_groups.get(o).ok()));

            for manifold in pair.manifolds() {
                let normal = if sphere_first { -manifold.normal() } else { manifold.normal() };
                let body = if sphere_first {
                    manifold.rigid_body2()
                } else {
                    manifold.rigid_body1()
                };
                for _ in 0..manifold.num_points() {
                    sphere.record_contact(normal, layers, body);
                }
            }
        }
    }
}

/// Bundle for creating a sphere with Rapier3D physics.
///
/// This bundle provides the Rapier3D components a controlled sphere needs:
/// a dynamic rigid body with a ball collider, velocity tracking, mass
/// properties for platform checks, and the controller itself.
///
/// Rapier's own gravity is disabled; the controller integrates the
/// [`GravityField`](crate::gravity::GravityField) instead.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use moving_sphere_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         Rapier3dSphereBundle::new(0.5).with_config(SphereControllerConfig::player()),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `collider`: ball of radius 0.5
/// - `gravity_scale`: 0 (gravity comes from the controller)
/// - `sleeping`: disabled, so the controller always gets contacts
#[derive(Bundle)]
pub struct Rapier3dSphereBundle {
    /// The rigid body type. Should be [`RigidBody::Dynamic`].
    pub rigid_body: RigidBody,
    /// The sphere's collider.
    pub collider: Collider,
    /// Current linear and angular velocity. Written by the controller each step.
    pub velocity: Velocity,
    /// Scale of Rapier's built-in gravity.
    pub gravity_scale: GravityScale,
    /// Sleep settings for the body.
    pub sleeping: Sleeping,
    /// Computed mass properties. Rapier updates this based on the collider.
    pub mass_properties: ReadMassProperties,
    /// The controller.
    pub controller: MovingSphere,
    /// Player intent, written by game code.
    pub intent: InputIntent,
}

impl Default for Rapier3dSphereBundle {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Rapier3dSphereBundle {
    /// Create a sphere bundle with the given radius and default config.
    pub fn new(radius: f32) -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            collider: Collider::ball(radius),
            velocity: Velocity::default(),
            gravity_scale: GravityScale(0.0),
            sleeping: Sleeping::disabled(),
            // Rapier will update this based on collider after first physics step
            mass_properties: ReadMassProperties::default(),
            controller: MovingSphere::default(),
            intent: InputIntent::default(),
        }
    }

    /// Builder: use the given controller config.
    pub fn with_config(mut self, config: crate::config::SphereControllerConfig) -> Self {
        self.controller = MovingSphere::new(config);
        self
    }
}
