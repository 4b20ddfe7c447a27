//! The sphere controller component and its fixed-step driver.
//!
//! [`MovingSphere`] owns all locomotion state for one character. It is driven
//! by two entry points:
//!
//! - [`sample_input`](MovingSphere::sample_input) once per rendered frame,
//! - [`fixed_step`](MovingSphere::fixed_step) once per physics step, after all
//!   of that step's contacts were passed to
//!   [`record_contact`](MovingSphere::record_contact).
//!
//! Neither touches the physics world directly; [`WorldStepper`](crate::stepper::WorldStepper)
//! wires them to a Bevy world and backend.

use bevy::log::debug;
use bevy::prelude::*;

use crate::backend::PhysicsView;
use crate::collision::{ContactAccumulator, ContactKind, ContactThresholds};
use crate::config::{mask_selects, SphereControllerConfig, SurfaceThresholds};
use crate::detection::SupportKind;
use crate::gravity::GravitySample;
use crate::intent::{InputIntent, InputSpace, JumpLatch};
use crate::jump::JumpKind;
use crate::movement::project_direction_on_plane;
use crate::platform::PlatformConnection;

/// Up, right and forward directions used for movement.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct MovementAxes {
    /// Up axis from the gravity source.
    pub up: Vec3,
    /// Input "right", flattened onto the plane orthogonal to up.
    pub right: Vec3,
    /// Input "forward", flattened onto the plane orthogonal to up.
    pub forward: Vec3,
}

impl Default for MovementAxes {
    fn default() -> Self {
        Self {
            up: Vec3::Y,
            right: Vec3::X,
            forward: Vec3::Z,
        }
    }
}

/// State of the physics body read at the start of a fixed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereBody {
    /// World position of the sphere.
    pub position: Vec3,
    /// Current linear velocity.
    pub velocity: Vec3,
    /// Mass of the sphere, compared against platform masses.
    pub mass: f32,
}

impl SphereBody {
    /// Create a body snapshot with unit mass.
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            mass: 1.0,
        }
    }
}

/// Summary of the last completed fixed step.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// How the sphere was supported.
    pub support: SupportKind,
    /// Ground contacts after classification (forced to 1 by climbing,
    /// snapping and corner promotion).
    pub ground_contacts: u32,
    /// Steep contacts recorded.
    pub steep_contacts: u32,
    /// Climbable contacts recorded.
    pub climb_contacts: u32,
    /// Normalized steep normal, zero without steep contacts.
    pub steep_normal: Vec3,
    /// Estimated velocity of the connected platform.
    pub platform_velocity: Vec3,
    /// Jump performed during the step, if any.
    pub jump: Option<JumpKind>,
}

/// Locomotion controller for a rolling sphere.
///
/// This is the **central hub** for all controller state. Spawn it next to the
/// physics body it drives; the plugin systems do the rest.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct MovingSphere {
    // Only changed through `set_config`, which keeps the thresholds in sync.
    #[reflect(ignore)]
    pub(crate) config: SphereControllerConfig,
    #[reflect(ignore)]
    pub(crate) thresholds: SurfaceThresholds,

    // === Per-step state ===
    pub(crate) velocity: Vec3,
    pub(crate) contact_normal: Vec3,
    pub(crate) contacts: ContactAccumulator,
    pub(crate) connection: PlatformConnection,

    // === Input (variable-rate phase) ===
    pub(crate) axes: MovementAxes,
    pub(crate) player_input: Vec2,
    pub(crate) desires_climbing: bool,
    pub(crate) jump: JumpLatch,

    // === Counters ===
    pub(crate) steps_since_last_grounded: u32,
    pub(crate) steps_since_last_jump: u32,
    pub(crate) jump_phase: u32,

    pub(crate) last_step: StepReport,
}

impl Default for MovingSphere {
    fn default() -> Self {
        Self::new(SphereControllerConfig::default())
    }
}

impl MovingSphere {
    /// Create a controller with the given config. The config is validated.
    pub fn new(config: SphereControllerConfig) -> Self {
        let config = config.validated();
        Self {
            config,
            thresholds: SurfaceThresholds::from_config(&config),
            velocity: Vec3::ZERO,
            contact_normal: Vec3::Y,
            contacts: ContactAccumulator::default(),
            connection: PlatformConnection::default(),
            axes: MovementAxes::default(),
            player_input: Vec2::ZERO,
            desires_climbing: false,
            jump: JumpLatch::default(),
            steps_since_last_grounded: 0,
            steps_since_last_jump: 0,
            jump_phase: 0,
            last_step: StepReport::default(),
        }
    }

    /// Get the active config.
    pub fn config(&self) -> &SphereControllerConfig {
        &self.config
    }

    /// Replace the config, validating it and recomputing the angle
    /// thresholds.
    pub fn set_config(&mut self, config: SphereControllerConfig) {
        self.config = config.validated();
        self.thresholds = SurfaceThresholds::from_config(&self.config);
    }

    /// Get the cosine thresholds derived from the config.
    pub fn thresholds(&self) -> &SurfaceThresholds {
        &self.thresholds
    }

    // === Queries ===

    /// Velocity written to the body by the last step.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Normal of the supporting surface, or up while airborne.
    pub fn contact_normal(&self) -> Vec3 {
        self.contact_normal
    }

    /// Normal of the steep surfaces touched during the last step, or zero.
    pub fn steep_normal(&self) -> Vec3 {
        self.last_step.steep_normal
    }

    /// Velocity of the platform carrying the sphere during the last step.
    pub fn platform_velocity(&self) -> Vec3 {
        self.last_step.platform_velocity
    }

    /// Up axis used by the last step.
    pub fn up_axis(&self) -> Vec3 {
        self.axes.up
    }

    /// Current movement axes.
    pub fn axes(&self) -> &MovementAxes {
        &self.axes
    }

    /// Summary of the last completed step.
    pub fn last_step(&self) -> &StepReport {
        &self.last_step
    }

    /// How the sphere was supported during the last step.
    pub fn support(&self) -> SupportKind {
        self.last_step.support
    }

    /// Whether the sphere was supported (walking, snapped or climbing).
    pub fn is_grounded(&self) -> bool {
        self.last_step.support.is_supported()
    }

    /// Whether the sphere was climbing.
    pub fn is_climbing(&self) -> bool {
        self.last_step.support == SupportKind::Climbing
    }

    /// Whether the sphere touched a steep surface.
    pub fn is_on_steep(&self) -> bool {
        self.last_step.steep_contacts > 0
    }

    /// Air jumps used since the last grounding.
    pub fn jump_phase(&self) -> u32 {
        self.jump_phase
    }

    /// Steps since the sphere was last supported.
    pub fn steps_since_last_grounded(&self) -> u32 {
        self.steps_since_last_grounded
    }

    /// Steps since the last successful jump.
    pub fn steps_since_last_jump(&self) -> u32 {
        self.steps_since_last_jump
    }

    /// Platform the sphere was connected to during the last step.
    pub fn connected_body(&self) -> Option<Entity> {
        self.connection.previous
    }

    /// Whether a jump request is waiting for the next fixed step.
    pub fn jump_pending(&self) -> bool {
        self.jump.is_pending()
    }

    /// Contacts recorded so far for the upcoming step.
    pub fn pending_contacts(&self) -> &ContactAccumulator {
        &self.contacts
    }

    // === Variable-rate phase ===

    /// Sample one frame of input.
    ///
    /// Latches the jump press, samples the climb request and flattens the
    /// input space onto the plane orthogonal to `up`.
    pub fn sample_input(&mut self, intent: &InputIntent, space: Option<&InputSpace>, up: Vec3) {
        self.player_input = intent.move_axis.clamp_length_max(1.0);
        self.jump.latch(intent.jump_pressed);
        self.desires_climbing = intent.climb_held;

        let space = space.copied().unwrap_or_default();
        self.axes = MovementAxes {
            up,
            right: project_direction_on_plane(space.right, up),
            forward: project_direction_on_plane(space.forward, up),
        };
    }

    // === Contact reporting ===

    /// Record one contact normal reported by the physics engine for the
    /// upcoming step.
    ///
    /// `layers` are the layer bits of the touched collider, `body` the rigid
    /// body it belongs to.
    pub fn record_contact(&mut self, normal: Vec3, layers: u32, body: Option<Entity>) -> ContactKind {
        let climbable = self.desires_climbing && mask_selects(self.config.climb_mask, layers);
        let thresholds = ContactThresholds {
            min_ground_dot: self.thresholds.min_dot(layers, self.config.stairs_mask),
            min_climb_dot: climbable.then_some(self.thresholds.min_climb_dot),
        };
        self.contacts.record(normal, self.axes.up, thresholds, body)
    }

    /// Record a batch of contact normals against the same collider.
    pub fn record_contacts(&mut self, normals: impl IntoIterator<Item = Vec3>, layers: u32, body: Option<Entity>) {
        for normal in normals {
            self.record_contact(normal, layers, body);
        }
    }

    // === Fixed-rate phase ===

    /// Run one fixed step and return the velocity to write back to the body.
    ///
    /// Order: classify support, track the connected platform, steer toward
    /// the desired velocity, resolve a latched jump, integrate gravity, then
    /// reset the contact accumulator for the next step.
    pub fn fixed_step(
        &mut self,
        body: SphereBody,
        gravity: GravitySample,
        view: &impl PhysicsView,
        dt: f32,
    ) -> Vec3 {
        self.axes.up = gravity.up;
        self.velocity = body.velocity;

        let support = self.update_state(body.position, view);
        self.update_connection(&body, view, dt);
        self.adjust_velocity(dt);

        let jump = if self.jump.take() {
            self.jump(gravity.acceleration)
        } else {
            None
        };

        self.apply_gravity(gravity.acceleration, dt);
        self.finish_step(support, jump);
        self.velocity
    }

    fn update_connection(&mut self, body: &SphereBody, view: &impl PhysicsView, dt: f32) {
        self.connection.current = self.contacts.connected_body;
        let Some(connected) = self.connection.current else {
            return;
        };
        match view.platform(connected) {
            Some(platform) if platform.carries(body.mass) => {
                self.connection.track(&platform, body.position, dt);
            }
            _ => {}
        }
    }

    fn finish_step(&mut self, support: SupportKind, jump: Option<JumpKind>) {
        if support != self.last_step.support {
            debug!("sphere support changed: {:?} -> {:?}", self.last_step.support, support);
        }
        self.last_step = StepReport {
            support,
            ground_contacts: self.contacts.ground_count,
            steep_contacts: self.contacts.steep_count,
            climb_contacts: self.contacts.climb_count,
            steep_normal: self.contacts.steep_normal.normalize_or_zero(),
            platform_velocity: self.connection.velocity,
            jump,
        };
        self.contacts.reset();
        self.connection.advance();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collision::CollisionData;
    use crate::gravity::{GravitySource, UniformGravity};
    use crate::platform::PlatformBody;
    use approx::assert_relative_eq;
    use bevy::math::Affine3A;

    pub(crate) const DT: f32 = 0.02;

    /// Physics stand-in: an optional ground hit and a set of platforms.
    #[derive(Default)]
    pub(crate) struct TestView {
        pub ground: Option<CollisionData>,
        pub platforms: Vec<(Entity, PlatformBody)>,
    }

    impl PhysicsView for TestView {
        fn raycast(&self, _origin: Vec3, _direction: Vec3, max_distance: f32, mask: u32) -> Option<CollisionData> {
            self.ground
                .filter(|hit| hit.distance <= max_distance && mask_selects(mask, hit.layers))
        }

        fn platform(&self, body: Entity) -> Option<PlatformBody> {
            self.platforms.iter().find(|(e, _)| *e == body).map(|(_, p)| *p)
        }
    }

    pub(crate) fn earth() -> GravitySample {
        UniformGravity::default().gravity_at(Vec3::ZERO)
    }

    pub(crate) fn step(sphere: &mut MovingSphere, velocity: Vec3) -> Vec3 {
        sphere.fixed_step(SphereBody::new(Vec3::ZERO, velocity), earth(), &TestView::default(), DT)
    }

    // ==================== Construction Tests ====================

    #[test]
    fn new_controller_is_airborne_and_idle() {
        let sphere = MovingSphere::default();
        assert_eq!(sphere.support(), SupportKind::Airborne);
        assert!(!sphere.is_grounded());
        assert!(!sphere.jump_pending());
        assert_eq!(sphere.contact_normal(), Vec3::Y);
    }

    #[test]
    fn set_config_recomputes_thresholds() {
        let mut sphere = MovingSphere::default();
        let before = *sphere.thresholds();

        sphere.set_config(SphereControllerConfig::default().with_ground_angles(60.0, 70.0));

        assert_ne!(*sphere.thresholds(), before);
        assert_relative_eq!(sphere.thresholds().min_ground_dot, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn set_config_validates() {
        let mut sphere = MovingSphere::default();
        sphere.set_config(SphereControllerConfig::default().with_air_jumps(99));
        assert_eq!(sphere.config().max_air_jumps, 5);
    }

    #[test]
    fn config_is_not_editable_through_reflection() {
        use bevy::reflect::Struct;

        let sphere = MovingSphere::default();
        assert!(sphere.field("config").is_none());
        assert!(sphere.field("thresholds").is_none());
        assert!(sphere.field("velocity").is_some());
    }

    // ==================== Input Tests ====================

    #[test]
    fn sample_input_flattens_input_space() {
        let mut sphere = MovingSphere::default();
        let tilted = InputSpace::new(Vec3::X, Vec3::new(0.0, 1.0, 1.0));

        sphere.sample_input(&InputIntent::default(), Some(&tilted), Vec3::Y);

        assert!((sphere.axes().forward - Vec3::Z).length() < 1e-6);
        assert_eq!(sphere.axes().right, Vec3::X);
    }

    #[test]
    fn jump_press_between_steps_is_consumed_once() {
        let mut sphere = MovingSphere::default();
        let press = InputIntent {
            jump_pressed: true,
            ..default()
        };

        sphere.sample_input(&press, None, Vec3::Y);
        sphere.sample_input(&InputIntent::default(), None, Vec3::Y);
        assert!(sphere.jump_pending());

        sphere.record_contact(Vec3::Y, 1, None);
        step(&mut sphere, Vec3::ZERO);
        assert!(!sphere.jump_pending());
        assert_eq!(sphere.last_step().jump, Some(JumpKind::Ground));

        sphere.record_contact(Vec3::Y, 1, None);
        step(&mut sphere, Vec3::ZERO);
        assert_eq!(sphere.last_step().jump, None);
    }

    // ==================== Contact Tests ====================

    #[test]
    fn climb_contacts_require_climb_intent() {
        let mut sphere = MovingSphere::default();
        sphere.record_contact(Vec3::X, 1, None);
        assert_eq!(sphere.pending_contacts().climb_count, 0);

        let climb = InputIntent {
            climb_held: true,
            ..default()
        };
        sphere.sample_input(&climb, None, Vec3::Y);
        sphere.record_contact(Vec3::X, 1, None);
        assert_eq!(sphere.pending_contacts().climb_count, 1);
    }

    #[test]
    fn climb_mask_filters_layers() {
        let mut sphere = MovingSphere::new(SphereControllerConfig::default().with_masks(u32::MAX, 0, 0b10));
        let climb = InputIntent {
            climb_held: true,
            ..default()
        };
        sphere.sample_input(&climb, None, Vec3::Y);

        sphere.record_contact(Vec3::X, 0b01, None);
        assert_eq!(sphere.pending_contacts().climb_count, 0);

        sphere.record_contact(Vec3::X, 0b10, None);
        assert_eq!(sphere.pending_contacts().climb_count, 1);
    }

    #[test]
    fn stairs_layer_accepts_steeper_ground() {
        let config = SphereControllerConfig::default()
            .with_ground_angles(30.0, 60.0)
            .with_masks(u32::MAX, 0b100, u32::MAX);
        let mut sphere = MovingSphere::new(config);
        let slope = Vec3::new(45f32.to_radians().sin(), 45f32.to_radians().cos(), 0.0);

        assert_eq!(sphere.record_contact(slope, 0b001, None), ContactKind::Steep);
        assert_eq!(sphere.record_contact(slope, 0b100, None), ContactKind::Ground);
    }

    #[test]
    fn record_contacts_accumulates_batch() {
        let mut sphere = MovingSphere::default();
        sphere.record_contacts([Vec3::Y, Vec3::Y, Vec3::X], 1, None);

        assert_eq!(sphere.pending_contacts().ground_count, 2);
        assert_eq!(sphere.pending_contacts().steep_count, 1);
    }

    // ==================== Step Driver Tests ====================

    #[test]
    fn step_resets_accumulator_and_reports_counts() {
        let mut sphere = MovingSphere::default();
        sphere.record_contacts([Vec3::Y, Vec3::Y], 1, None);
        sphere.record_contact(Vec3::X, 1, None);

        step(&mut sphere, Vec3::ZERO);

        assert_eq!(sphere.last_step().ground_contacts, 2);
        assert_eq!(sphere.last_step().steep_contacts, 1);
        assert_eq!(*sphere.pending_contacts(), ContactAccumulator::default());
    }

    #[test]
    fn resting_on_flat_ground_only_presses_into_it() {
        let mut sphere = MovingSphere::default();
        sphere.record_contact(Vec3::Y, 1, None);

        let velocity = step(&mut sphere, Vec3::ZERO);

        assert_eq!(sphere.last_step().ground_contacts, 1);
        assert_eq!(sphere.support(), SupportKind::Ground);
        assert_eq!(velocity.x, 0.0);
        assert_eq!(velocity.z, 0.0);
        assert_relative_eq!(velocity.y, -9.81 * DT, epsilon = 1e-6);
    }

    #[test]
    fn forward_input_accelerates_by_rate_times_step() {
        let mut sphere = MovingSphere::default();
        let forward = InputIntent {
            move_axis: Vec2::Y,
            ..default()
        };
        sphere.sample_input(&forward, None, Vec3::Y);
        sphere.record_contact(Vec3::Y, 1, None);

        let velocity = step(&mut sphere, Vec3::ZERO);

        assert_relative_eq!(velocity.dot(Vec3::Z), 10.0 * DT, epsilon = 1e-6);
        assert_relative_eq!(velocity.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn forward_speed_clamps_at_max_speed() {
        let mut sphere = MovingSphere::default();
        let forward = InputIntent {
            move_axis: Vec2::Y,
            ..default()
        };
        sphere.sample_input(&forward, None, Vec3::Y);
        sphere.record_contact(Vec3::Y, 1, None);

        let velocity = step(&mut sphere, Vec3::new(0.0, 0.0, 9.9));

        assert_relative_eq!(velocity.z, 10.0, epsilon = 1e-5);
    }

    #[test]
    fn airborne_fallback_uses_up_as_contact_normal() {
        let mut sphere = MovingSphere::default();
        sphere.record_contact(Vec3::X, 1, None);

        let velocity = step(&mut sphere, Vec3::ZERO);

        assert_eq!(sphere.support(), SupportKind::Airborne);
        assert_eq!(sphere.contact_normal(), Vec3::Y);
        assert!(sphere.is_on_steep());
        assert_eq!(sphere.steep_normal(), Vec3::X);
        assert_relative_eq!(velocity.y, -9.81 * DT, epsilon = 1e-6);
    }

    #[test]
    fn grounded_climb_intent_eases_gravity() {
        let mut sphere = MovingSphere::default();
        let climb = InputIntent {
            climb_held: true,
            ..default()
        };
        sphere.sample_input(&climb, None, Vec3::Y);
        sphere.record_contact(Vec3::Y, 1, None);

        // Moving fast enough to skip the resting branch.
        let velocity = step(&mut sphere, Vec3::new(1.0, 0.0, 0.0));

        let expected = (-9.81 - 0.9 * 20.0) * DT;
        assert_relative_eq!(velocity.y, expected, epsilon = 1e-5);
    }

    #[test]
    fn moving_platform_carries_idle_sphere() {
        let platform = Entity::from_raw(11);
        let platform_velocity = Vec3::new(3.0, 0.0, 0.0);
        let mut sphere = MovingSphere::default();
        let mut position = Vec3::new(0.0, 0.5, 0.0);
        let mut velocity = Vec3::ZERO;

        for i in 0..120 {
            let offset = platform_velocity * (i as f32 * DT);
            let view = TestView {
                ground: None,
                platforms: vec![(
                    platform,
                    PlatformBody {
                        kinematic: true,
                        mass: 0.0,
                        transform: Affine3A::from_translation(offset),
                    },
                )],
            };
            sphere.record_contact(Vec3::Y, 1, Some(platform));
            velocity = sphere.fixed_step(SphereBody::new(position, velocity), earth(), &view, DT);

            // The floor stops any motion into it.
            let into_floor = velocity.dot(Vec3::Y).min(0.0);
            velocity -= Vec3::Y * into_floor;
            position += velocity * DT;
        }

        assert_eq!(sphere.connected_body(), Some(platform));
        assert_relative_eq!(sphere.platform_velocity().x, platform_velocity.x, epsilon = 1e-3);
        assert_relative_eq!(velocity.x, platform_velocity.x, epsilon = 1e-3);
        assert_relative_eq!(velocity.z, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn light_dynamic_body_is_not_tracked() {
        let crate_body = Entity::from_raw(12);
        let mut sphere = MovingSphere::default();
        let mut view = TestView::default();

        for i in 0..5 {
            view.platforms = vec![(
                crate_body,
                PlatformBody {
                    kinematic: false,
                    mass: 0.1,
                    transform: Affine3A::from_translation(Vec3::X * i as f32),
                },
            )];
            sphere.record_contact(Vec3::Y, 1, Some(crate_body));
            sphere.fixed_step(SphereBody::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)), earth(), &view, DT);
        }

        assert_eq!(sphere.platform_velocity(), Vec3::ZERO);
        assert_eq!(sphere.connection.local_anchor, Vec3::ZERO);
    }
}
