//! Velocity adjustment and gravity integration.

use bevy::prelude::*;

use crate::controller::MovingSphere;

/// Fraction of the climb acceleration used to press the sphere into the
/// surface it is climbing or about to climb.
pub const CLIMB_GRIP_FACTOR: f32 = 0.9;

/// Below this squared speed a grounded sphere counts as resting.
pub const RESTING_SPEED_SQUARED: f32 = 0.01;

/// Project `direction` onto the plane with the given `normal` and normalize.
///
/// Returns zero when `direction` is parallel to `normal`.
#[inline]
pub fn project_direction_on_plane(direction: Vec3, normal: Vec3) -> Vec3 {
    (direction - normal * direction.dot(normal)).normalize_or_zero()
}

/// Move `current` toward `target` by at most `max_delta`.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

impl MovingSphere {
    /// Steer the velocity toward the player's desired along-surface velocity,
    /// relative to the connected platform.
    pub(crate) fn adjust_velocity(&mut self, dt: f32) {
        let (acceleration, speed, x_axis, z_axis) = if self.climbing() {
            (
                self.config.max_climb_acceleration,
                self.config.max_climb_speed,
                self.contact_normal.cross(self.axes.up),
                self.axes.up,
            )
        } else {
            let on_ground = self.contacts.on_ground();
            let acceleration = if on_ground {
                self.config.max_acceleration
            } else {
                self.config.max_air_acceleration
            };
            let speed = if on_ground && self.desires_climbing {
                self.config.max_climb_speed
            } else {
                self.config.max_speed
            };
            (acceleration, speed, self.axes.right, self.axes.forward)
        };

        let x_axis = project_direction_on_plane(x_axis, self.contact_normal);
        let z_axis = project_direction_on_plane(z_axis, self.contact_normal);

        let relative = self.velocity - self.connection.velocity;
        let current_x = relative.dot(x_axis);
        let current_z = relative.dot(z_axis);

        let max_change = acceleration * dt;
        let new_x = move_towards(current_x, self.player_input.x * speed, max_change);
        let new_z = move_towards(current_z, self.player_input.y * speed, max_change);

        self.velocity += x_axis * (new_x - current_x) + z_axis * (new_z - current_z);
    }

    /// Integrate gravity, modulated by the current support.
    pub(crate) fn apply_gravity(&mut self, gravity: Vec3, dt: f32) {
        let on_ground = self.contacts.on_ground();
        if self.climbing() {
            self.velocity -= self.contact_normal * (self.config.max_climb_acceleration * CLIMB_GRIP_FACTOR * dt);
        } else if on_ground && self.velocity.length_squared() < RESTING_SPEED_SQUARED {
            self.velocity += self.contact_normal * (gravity.dot(self.contact_normal) * dt);
        } else if on_ground && self.desires_climbing {
            self.velocity +=
                (gravity - self.contact_normal * (self.config.max_climb_acceleration * CLIMB_GRIP_FACTOR)) * dt;
        } else {
            self.velocity += gravity * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SphereControllerConfig;
    use crate::controller::tests::DT;
    use crate::intent::InputIntent;
    use approx::assert_relative_eq;

    const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

    fn with_input(sphere: &mut MovingSphere, axis: Vec2, climb: bool) {
        let intent = InputIntent {
            move_axis: axis,
            climb_held: climb,
            ..default()
        };
        sphere.sample_input(&intent, None, Vec3::Y);
    }

    fn grounded() -> MovingSphere {
        let mut sphere = MovingSphere::default();
        sphere.contacts.ground_count = 1;
        sphere.contact_normal = Vec3::Y;
        sphere
    }

    // ==================== Helper Tests ====================

    #[test]
    fn move_towards_is_symmetric_and_does_not_overshoot() {
        assert_eq!(move_towards(0.0, 1.0, 0.25), 0.25);
        assert_eq!(move_towards(0.0, -1.0, 0.25), -0.25);
        assert_eq!(move_towards(0.9, 1.0, 0.25), 1.0);
        assert_eq!(move_towards(2.0, 2.0, 0.0), 2.0);
    }

    #[test]
    fn project_direction_on_plane_stays_unit() {
        let slope = Vec3::new(0.0, 1.0, -1.0).normalize();
        let projected = project_direction_on_plane(Vec3::Z, slope);

        assert_relative_eq!(projected.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(projected.dot(slope), 0.0, epsilon = 1e-6);
        assert_eq!(project_direction_on_plane(Vec3::Y, Vec3::Y), Vec3::ZERO);
    }

    // ==================== Adjust Tests ====================

    #[test]
    fn change_per_axis_is_capped_by_acceleration() {
        let mut sphere = grounded();
        with_input(&mut sphere, Vec2::new(1.0, -1.0).normalize(), false);
        sphere.velocity = Vec3::new(-3.0, 0.0, 4.0);

        sphere.adjust_velocity(DT);

        let max_change = 10.0 * DT;
        assert_relative_eq!((sphere.velocity.x + 3.0).abs(), max_change, epsilon = 1e-5);
        assert_relative_eq!((sphere.velocity.z - 4.0).abs(), max_change, epsilon = 1e-5);
    }

    #[test]
    fn air_control_uses_air_acceleration() {
        let mut sphere = MovingSphere::default();
        with_input(&mut sphere, Vec2::Y, false);

        sphere.adjust_velocity(DT);

        assert_relative_eq!(sphere.velocity.z, 1.0 * DT, epsilon = 1e-6);
    }

    #[test]
    fn climb_intent_on_ground_limits_speed() {
        let mut sphere = grounded();
        with_input(&mut sphere, Vec2::Y, true);
        sphere.velocity = Vec3::new(0.0, 0.0, 2.1);

        sphere.adjust_velocity(DT);

        assert_relative_eq!(sphere.velocity.z, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn slope_basis_follows_surface() {
        let mut sphere = grounded();
        sphere.contact_normal = Vec3::new(0.0, 1.0, -1.0).normalize();
        with_input(&mut sphere, Vec2::Y, false);

        sphere.adjust_velocity(DT);

        assert_relative_eq!(sphere.velocity.dot(sphere.contact_normal), 0.0, epsilon = 1e-6);
        assert_relative_eq!(sphere.velocity.length(), 10.0 * DT, epsilon = 1e-6);
        assert!(sphere.velocity.y > 0.0);
    }

    #[test]
    fn climbing_moves_along_wall() {
        let mut sphere = MovingSphere::default();
        with_input(&mut sphere, Vec2::new(0.0, 1.0), true);
        sphere.steps_since_last_jump = 10;
        sphere.contacts.climb_count = 1;
        sphere.contact_normal = Vec3::NEG_Z;

        sphere.adjust_velocity(DT);

        assert_relative_eq!(sphere.velocity.y, 20.0 * DT, epsilon = 1e-6);
        assert_relative_eq!(sphere.velocity.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn platform_velocity_is_the_reference() {
        let mut sphere = grounded();
        sphere.connection.velocity = Vec3::new(3.0, 0.0, 0.0);

        sphere.adjust_velocity(DT);

        // Standing still relative to the world means sliding back on the
        // platform, so the sphere accelerates toward its velocity.
        assert_relative_eq!(sphere.velocity.x, 10.0 * DT, epsilon = 1e-6);
    }

    // ==================== Gravity Tests ====================

    #[test]
    fn resting_sphere_only_gets_normal_component() {
        let mut sphere = grounded();
        sphere.contact_normal = Vec3::new(0.0, 1.0, 0.2).normalize();

        sphere.apply_gravity(GRAVITY, DT);

        let cross = sphere.velocity.cross(sphere.contact_normal);
        assert_relative_eq!(cross.length(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn moving_grounded_sphere_gets_full_gravity() {
        let mut sphere = grounded();
        sphere.velocity = Vec3::new(2.0, 0.0, 0.0);

        sphere.apply_gravity(GRAVITY, DT);

        assert_relative_eq!(sphere.velocity.y, -9.81 * DT, epsilon = 1e-6);
    }

    #[test]
    fn climbing_presses_into_wall_without_gravity() {
        let mut sphere = MovingSphere::default();
        sphere.steps_since_last_jump = 10;
        sphere.contacts.climb_count = 1;
        sphere.contact_normal = Vec3::NEG_Z;

        sphere.apply_gravity(GRAVITY, DT);

        assert_eq!(sphere.velocity.y, 0.0);
        assert_relative_eq!(sphere.velocity.z, 20.0 * CLIMB_GRIP_FACTOR * DT, epsilon = 1e-6);
    }

    #[test]
    fn airborne_gets_full_gravity() {
        let mut sphere = MovingSphere::new(SphereControllerConfig::default());

        sphere.apply_gravity(GRAVITY, DT);

        assert_eq!(sphere.velocity, GRAVITY * DT);
    }
}
