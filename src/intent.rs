//! Player intent.
//!
//! Intents are written by your input code (or AI) once per rendered frame.
//! The controller samples them during the variable-rate phase and latches the
//! jump so a press between two fixed steps is never lost.

use bevy::prelude::*;

/// Movement intent for one frame.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use moving_sphere_controller::prelude::*;
///
/// let mut intent = InputIntent::new();
/// intent.set_move(Vec2::new(3.0, 4.0));
/// assert!((intent.move_axis.length() - 1.0).abs() < 1e-6);
///
/// intent.set_jump_pressed(true);
/// intent.set_climb_held(true);
/// assert!(intent.is_moving());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct InputIntent {
    /// Strafe (`x`) and forward (`y`) input, clamped to the unit circle.
    pub move_axis: Vec2,
    /// Whether jump was pressed this frame (rising edge).
    pub jump_pressed: bool,
    /// Whether climb is being held.
    pub climb_held: bool,
}

impl InputIntent {
    /// Create an empty intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement axes. Longer vectors are scaled back to length 1.
    pub fn set_move(&mut self, axis: Vec2) {
        self.move_axis = axis.clamp_length_max(1.0);
    }

    /// Set whether jump was pressed this frame.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    /// Set whether climb is held.
    pub fn set_climb_held(&mut self, held: bool) {
        self.climb_held = held;
    }

    /// Check if there is any movement input.
    pub fn is_moving(&self) -> bool {
        self.move_axis.length_squared() > 1e-6
    }

    /// Clear all input.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Frame that defines "right" and "forward" for movement input,
/// usually the camera's.
///
/// Without one, world `X` and `Z` are used. Both directions are flattened
/// onto the plane orthogonal to the current up axis before use.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct InputSpace {
    /// Direction of positive strafe input.
    pub right: Vec3,
    /// Direction of positive forward input.
    pub forward: Vec3,
}

impl Default for InputSpace {
    fn default() -> Self {
        Self {
            right: Vec3::X,
            forward: Vec3::Z,
        }
    }
}

impl InputSpace {
    /// Create an input space from explicit directions.
    pub fn new(right: Vec3, forward: Vec3) -> Self {
        Self { right, forward }
    }

    /// Derive an input space from a rotation, e.g. a camera's.
    ///
    /// Uses Bevy's convention that forward is `-Z`.
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            right: rotation * Vec3::X,
            forward: rotation * Vec3::NEG_Z,
        }
    }
}

/// Jump request latched across the variable-rate and fixed-rate phases.
///
/// The variable-rate phase is the only writer and may only set it; the fixed
/// step is the only reader and clears it when it attempts a jump. This is the
/// single mutable value shared between the two phases.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JumpLatch {
    desired: bool,
}

impl JumpLatch {
    /// Latch a press. A `false` press never clears a pending request.
    #[inline]
    pub fn latch(&mut self, pressed: bool) {
        self.desired |= pressed;
    }

    /// Take the pending request, clearing it.
    #[inline]
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.desired)
    }

    /// Check whether a jump is pending.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.desired
    }
}
