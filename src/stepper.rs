//! Explicit stepping interface.
//!
//! The controller does not own a clock. Whoever drives it calls
//! [`Stepper::on_variable_frame`] once per rendered frame and
//! [`Stepper::on_fixed_step`] once per physics step. The plugin systems do
//! this for every [`MovingSphere`] in the world; custom schedulers can use
//! [`WorldStepper`] directly.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::backend::{BackendView, SpherePhysicsBackend};
use crate::controller::{MovingSphere, SphereBody};
use crate::gravity::sample_gravity;
use crate::intent::{InputIntent, InputSpace};

/// Entry points for the two update phases.
pub trait Stepper {
    /// Sample input for one rendered frame.
    fn on_variable_frame(&mut self, dt: f32);

    /// Advance the controller by one physics step of length `dt`.
    fn on_fixed_step(&mut self, dt: f32);
}

/// [`Stepper`] for one sphere entity in a Bevy world, talking to physics
/// through backend `B`.
///
/// The entity is expected to carry a [`MovingSphere`]. [`InputIntent`] and
/// [`InputSpace`] are optional; missing intent means no input.
pub struct WorldStepper<'w, B: SpherePhysicsBackend> {
    world: &'w mut World,
    body: Entity,
    _marker: PhantomData<B>,
}

impl<'w, B: SpherePhysicsBackend> WorldStepper<'w, B> {
    /// Bind a stepper to `body`.
    pub fn new(world: &'w mut World, body: Entity) -> Self {
        Self {
            world,
            body,
            _marker: PhantomData,
        }
    }

    /// The entity being stepped.
    pub fn body(&self) -> Entity {
        self.body
    }
}

impl<B: SpherePhysicsBackend> Stepper for WorldStepper<'_, B> {
    fn on_variable_frame(&mut self, _dt: f32) {
        let world = &mut *self.world;
        if world.get::<MovingSphere>(self.body).is_none() {
            return;
        }

        let position = B::get_position(world, self.body);
        let up = sample_gravity(world, position).up;
        let space = world.get::<InputSpace>(self.body).copied();

        // The jump press is an edge: once latched it is consumed from the intent.
        // Intent writers run before `MovingSphereSet::Input`, so a press is
        // always latched in the frame it was written.
        let intent = match world.get_mut::<InputIntent>(self.body) {
            Some(mut intent) => {
                let sampled = *intent;
                intent.jump_pressed = false;
                sampled
            }
            None => InputIntent::default(),
        };

        if let Some(mut sphere) = world.get_mut::<MovingSphere>(self.body) {
            sphere.sample_input(&intent, space.as_ref(), up);
        }
    }

    fn on_fixed_step(&mut self, dt: f32) {
        let world = &mut *self.world;
        let Some(mut sphere) = world.get::<MovingSphere>(self.body).cloned() else {
            return;
        };

        let position = B::get_position(world, self.body);
        let body = SphereBody {
            position,
            velocity: B::get_velocity(world, self.body),
            mass: B::get_mass(world, self.body),
        };
        let gravity = sample_gravity(world, position);

        let velocity = {
            let view = BackendView::<B>::new(world, self.body);
            sphere.fixed_step(body, gravity, &view, dt)
        };

        B::set_velocity(world, self.body, velocity);
        if let Some(mut slot) = world.get_mut::<MovingSphere>(self.body) {
            *slot = sphere;
        }
    }
}
