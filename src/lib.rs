//! # `moving_sphere_controller`
//!
//! A rolling-sphere character controller with physics backend abstraction.
//!
//! This crate provides a responsive, tuneable controller for a dynamic sphere
//! that:
//! - Classifies contacts into ground, steep and climbable surfaces
//! - Snaps back to the ground after cresting small bumps
//! - Climbs walls and overhangs on selected layers
//! - Supports ground, wall and air jumps with a configurable air budget
//! - Rides moving and rotating platforms
//! - Follows arbitrary gravity (uniform, planets, custom [`GravitySource`]s)
//! - Abstracts the physics backend for easy swapping (Rapier3D included)
//!
//! [`GravitySource`]: gravity::GravitySource
//!
//! ## Architecture
//!
//! The controller works in two phases:
//! 1. Once per rendered frame, input is sampled and a jump press is latched
//! 2. Once per physics step, the contacts reported by the physics engine are
//!    classified, the velocity is steered toward the player's intent, a latched
//!    jump is resolved, gravity is integrated, and the result is written back
//!    to the body
//!
//! All of this lives on the [`MovingSphere`](controller::MovingSphere)
//! component and can be driven by hand through a [`PhysicsView`](backend::PhysicsView)
//! or a [`Stepper`](stepper::Stepper). [`MovingSpherePlugin`] does it for you.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use moving_sphere_controller::prelude::*;
//!
//! // Create controller components for a player sphere
//! let sphere = MovingSphere::new(SphereControllerConfig::player());
//! let intent = InputIntent::default();
//!
//! // These can be spawned together with physics components
//! assert!(!sphere.is_grounded());
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod controller;
pub mod detection;
pub mod gravity;
pub mod gravity_body;
pub mod intent;
pub mod jump;
pub mod movement;
pub mod platform;
pub mod state;
pub mod stepper;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{PhysicsView, SpherePhysicsBackend};
    pub use crate::collision::{CollisionData, ContactKind};
    pub use crate::config::{ConfigError, SphereControllerConfig};
    pub use crate::controller::{MovingSphere, SphereBody, StepReport};
    pub use crate::detection::SupportKind;
    pub use crate::gravity::{GravityField, GravitySample, GravitySource, SphericalGravity, UniformGravity};
    pub use crate::gravity_body::{GravityBody, GravityBodyState};
    pub use crate::intent::{InputIntent, InputSpace};
    pub use crate::jump::JumpKind;
    pub use crate::state::{Airborne, Climbing, Grounded, OnSteep};
    pub use crate::stepper::{Stepper, WorldStepper};
    pub use crate::{MovingSpherePlugin, MovingSphereSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dSphereBundle};
}

/// Ordering of the controller's work.
///
/// Systems that write [`InputIntent`](intent::InputIntent) must run before
/// [`Input`](Self::Input) in `Update`; the press is consumed there. Backends
/// record contacts in [`Contacts`](Self::Contacts). Anything that wants to
/// react to the new support state should run after [`Sync`](Self::Sync).
///
/// ```rust,ignore
/// app.add_systems(Update, read_player_keys.before(MovingSphereSet::Input));
/// ```
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovingSphereSet {
    /// Input intent is sampled and jump presses are latched (`Update`).
    Input,
    /// Contacts of the last physics step are recorded.
    Contacts,
    /// Spheres and gravity bodies are stepped.
    Step,
    /// State markers are updated.
    Sync,
}

/// Main plugin for the sphere controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (velocity access, raycasts, contact reporting).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use moving_sphere_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(MovingSpherePlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct MovingSpherePlugin<B: backend::SpherePhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::SpherePhysicsBackend> Default for MovingSpherePlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::SpherePhysicsBackend> Plugin for MovingSpherePlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::MovingSphere>();
        app.register_type::<config::SphereControllerConfig>();
        app.register_type::<intent::InputIntent>();
        app.register_type::<intent::InputSpace>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::Climbing>();
        app.register_type::<state::OnSteep>();
        app.register_type::<gravity_body::GravityBody>();

        // Uniform gravity unless the app already chose a field
        app.init_resource::<gravity::GravityField>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        // Input is sampled at the render rate
        app.add_systems(
            Update,
            systems::drive_variable_frame::<B>.in_set(MovingSphereSet::Input),
        );

        app.configure_sets(
            FixedUpdate,
            (
                MovingSphereSet::Contacts,
                MovingSphereSet::Step,
                MovingSphereSet::Sync,
            )
                .chain(),
        );
        app.add_systems(
            FixedUpdate,
            (systems::drive_fixed_step::<B>, systems::apply_body_gravity::<B>)
                .chain()
                .in_set(MovingSphereSet::Step),
        );
        app.add_systems(FixedUpdate, systems::sync_state_markers.in_set(MovingSphereSet::Sync));
    }
}
