//! Core controller systems.
//!
//! These systems drive every [`MovingSphere`] in the world through a
//! [`WorldStepper`]. They are generic over the physics backend so different
//! physics engines can be used.

use bevy::log::trace;
use bevy::prelude::*;

use crate::backend::SpherePhysicsBackend;
use crate::controller::MovingSphere;
use crate::gravity::sample_gravity;
use crate::gravity_body::GravityBody;
use crate::state::{Airborne, Climbing, Grounded, OnSteep};
use crate::stepper::{Stepper, WorldStepper};

fn controlled_spheres(world: &mut World) -> Vec<Entity> {
    world
        .query_filtered::<Entity, With<MovingSphere>>()
        .iter(world)
        .collect()
}

/// Sample input for every sphere. Runs once per rendered frame.
pub fn drive_variable_frame<B: SpherePhysicsBackend>(world: &mut World) {
    let dt = world
        .get_resource::<Time>()
        .map(|t| t.delta_secs())
        .unwrap_or(0.0);

    for entity in controlled_spheres(world) {
        WorldStepper::<B>::new(world, entity).on_variable_frame(dt);
    }
}

/// Advance every sphere by one fixed step and write its velocity back.
///
/// Contacts for the step must already have been recorded.
pub fn drive_fixed_step<B: SpherePhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    for entity in controlled_spheres(world) {
        WorldStepper::<B>::new(world, entity).on_fixed_step(dt);
    }
}

/// Pull every [`GravityBody`] along the gravity field, suspending gravity
/// for bodies that have come to rest.
pub fn apply_body_gravity<B: SpherePhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let entities: Vec<(Entity, GravityBody)> = world
        .query::<(Entity, &GravityBody)>()
        .iter(world)
        .map(|(e, body)| (e, *body))
        .collect();

    for (entity, mut body) in entities {
        let velocity = B::get_velocity(world, entity);
        let sleeping = B::is_sleeping(world, entity);

        if body.update(sleeping, velocity, dt) {
            let position = B::get_position(world, entity);
            let gravity = sample_gravity(world, position);
            B::set_velocity(world, entity, velocity + gravity.acceleration * dt);
        } else {
            trace!("gravity suspended for {entity}: {:?}", body.state);
        }

        if let Some(mut slot) = world.get_mut::<GravityBody>(entity) {
            *slot = body;
        }
    }
}

/// Sync state marker components with the last step of each sphere.
pub fn sync_state_markers(
    mut commands: Commands,
    q_spheres: Query<(Entity, &MovingSphere, Has<Grounded>, Has<Airborne>, Has<Climbing>, Has<OnSteep>)>,
) {
    for (entity, sphere, has_grounded, has_airborne, has_climbing, has_steep) in &q_spheres {
        let grounded = sphere.is_grounded();

        // Sync Grounded/Airborne
        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded);
            commands.entity(entity).remove::<Airborne>();
        } else if !grounded && has_grounded {
            commands.entity(entity).remove::<Grounded>();
            commands.entity(entity).insert(Airborne);
        } else if !grounded && !has_airborne && !has_grounded {
            commands.entity(entity).insert(Airborne);
        }

        // Sync Climbing
        if sphere.is_climbing() && !has_climbing {
            commands.entity(entity).insert(Climbing);
        } else if !sphere.is_climbing() && has_climbing {
            commands.entity(entity).remove::<Climbing>();
        }

        // Sync OnSteep, refreshing the normal while in contact
        if sphere.is_on_steep() {
            commands.entity(entity).insert(OnSteep::new(sphere.steep_normal()));
        } else if has_steep {
            commands.entity(entity).remove::<OnSteep>();
        }
    }
}
