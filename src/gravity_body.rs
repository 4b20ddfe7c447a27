//! Gravity for loose props.
//!
//! Bodies with a [`GravityBody`] fall along the [`GravityField`] instead of
//! the physics engine's fixed gravity. Once a body has been still for long
//! enough, gravity stops being applied so the engine can put it to sleep.
//!
//! [`GravityField`]: crate::gravity::GravityField

use bevy::prelude::*;

/// Squared speed at or below which a body counts as still.
pub const STILL_SPEED_SQUARED: f32 = 0.001;

/// Seconds a body must be still before gravity is suspended.
pub const FLOAT_TO_SLEEP_DELAY: f32 = 1.0;

/// What a [`GravityBody`] did during the last step.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GravityBodyState {
    /// Asleep in the physics engine; left alone.
    Asleep,
    /// Moving under gravity.
    #[default]
    Active,
    /// Still, but gravity is applied until the delay runs out.
    Floating,
    /// Still for longer than the delay; gravity suspended.
    Resting,
}

/// Dynamic body pulled by the world's gravity field.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct GravityBody {
    /// Seconds the body has been still.
    pub float_delay: f32,
    /// Outcome of the last step.
    pub state: GravityBodyState,
}

impl GravityBody {
    /// Advance the float-to-sleep timer and return whether gravity should be
    /// applied this step.
    pub fn update(&mut self, sleeping: bool, velocity: Vec3, dt: f32) -> bool {
        if sleeping {
            self.float_delay = 0.0;
            self.state = GravityBodyState::Asleep;
            return false;
        }
        if velocity.length_squared() <= STILL_SPEED_SQUARED {
            self.float_delay += dt;
            if self.float_delay > FLOAT_TO_SLEEP_DELAY {
                self.state = GravityBodyState::Resting;
                return false;
            }
            self.state = GravityBodyState::Floating;
        } else {
            self.float_delay = 0.0;
            self.state = GravityBodyState::Active;
        }
        true
    }
}
