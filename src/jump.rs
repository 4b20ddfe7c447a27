//! Jump resolution.
//!
//! A latched jump request is resolved once per fixed step, in priority order:
//! ground jump, wall jump (off steep contacts), then air jump while the air
//! budget lasts. Requests that match none of these are dropped.

use bevy::log::debug;
use bevy::prelude::*;

use crate::controller::MovingSphere;

/// Which kind of jump was performed.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpKind {
    /// Off supporting ground (including snapped ground and climbed walls).
    Ground,
    /// Off a steep surface while unsupported.
    Wall,
    /// Mid-air, consuming one air jump.
    Air,
}

/// Launch speed that reaches `jump_height` under gravity of
/// `gravity_magnitude`, from `v² = 2gh`.
#[inline]
pub fn jump_speed(gravity_magnitude: f32, jump_height: f32) -> f32 {
    (2.0 * gravity_magnitude * jump_height).sqrt()
}

/// Impulse to add when `aligned_speed` is already moving along the jump
/// direction. Outward motion is not stacked on top of the jump.
#[inline]
pub fn impulse_speed(jump_speed: f32, aligned_speed: f32) -> f32 {
    if aligned_speed > 0.0 {
        (jump_speed - aligned_speed).max(0.0)
    } else {
        jump_speed
    }
}

impl MovingSphere {
    /// Attempt a jump. Returns the kind performed, or `None` when the request
    /// was dropped.
    pub(crate) fn jump(&mut self, gravity: Vec3) -> Option<JumpKind> {
        let (kind, direction) = if self.contacts.on_ground() {
            (JumpKind::Ground, self.contact_normal)
        } else if self.contacts.on_steep() && self.config.wall_jumps_enabled {
            self.jump_phase = 0;
            (JumpKind::Wall, self.contacts.steep_normal.normalize_or_zero())
        } else if self.jump_phase < self.config.max_air_jumps {
            self.jump_phase += 1;
            (JumpKind::Air, self.contact_normal)
        } else {
            debug!(
                "jump dropped: unsupported with {}/{} air jumps used",
                self.jump_phase, self.config.max_air_jumps
            );
            return None;
        };

        self.steps_since_last_jump = 0;
        let direction = (direction + self.axes.up).normalize_or_zero();
        let speed = jump_speed(gravity.length(), self.config.jump_height);
        let aligned_speed = self.velocity.dot(direction);
        self.velocity += direction * impulse_speed(speed, aligned_speed);
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SphereControllerConfig;
    use approx::assert_relative_eq;

    const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

    fn airborne(max_air_jumps: u32) -> MovingSphere {
        let mut sphere = MovingSphere::new(SphereControllerConfig::default().with_air_jumps(max_air_jumps));
        sphere.steps_since_last_jump = 10;
        sphere
    }

    // ==================== Speed Tests ====================

    #[test]
    fn jump_speed_reaches_configured_height() {
        let speed = jump_speed(9.81, 2.0);
        let apex = speed * speed / (2.0 * 9.81);
        assert_relative_eq!(apex, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn impulse_is_reduced_by_outward_motion() {
        assert_eq!(impulse_speed(5.0, -2.0), 5.0);
        assert_eq!(impulse_speed(5.0, 2.0), 3.0);
        assert_eq!(impulse_speed(5.0, 7.0), 0.0);
    }

    // ==================== Ground Jump Tests ====================

    #[test]
    fn ground_jump_from_rest_uses_full_speed() {
        let mut sphere = airborne(0);
        sphere.contacts.ground_count = 1;

        assert_eq!(sphere.jump(GRAVITY), Some(JumpKind::Ground));
        assert_relative_eq!(sphere.velocity.y, jump_speed(9.81, 2.0), epsilon = 1e-5);
        assert_eq!(sphere.steps_since_last_jump, 0);
        assert_eq!(sphere.jump_phase, 0);
    }

    #[test]
    fn ground_jump_does_not_stack_on_rising_motion() {
        let mut sphere = airborne(0);
        sphere.contacts.ground_count = 1;
        sphere.velocity = Vec3::new(0.0, 100.0, 0.0);

        sphere.jump(GRAVITY);

        assert_eq!(sphere.velocity.y, 100.0);
    }

    #[test]
    fn slope_jump_is_biased_toward_up() {
        let mut sphere = airborne(0);
        sphere.contacts.ground_count = 1;
        sphere.contact_normal = Vec3::new(0.5f32.sqrt(), 0.5f32.sqrt(), 0.0);

        sphere.jump(GRAVITY);

        let direction = sphere.velocity.normalize();
        let expected = (sphere.contact_normal + Vec3::Y).normalize();
        assert!((direction - expected).length() < 1e-5);
    }

    // ==================== Wall Jump Tests ====================

    #[test]
    fn wall_jump_resets_air_phase() {
        let mut sphere = airborne(2);
        sphere.jump_phase = 2;
        sphere.contacts.steep_count = 1;
        sphere.contacts.steep_normal = Vec3::X;

        assert_eq!(sphere.jump(GRAVITY), Some(JumpKind::Wall));
        assert_eq!(sphere.jump_phase, 0);
        assert!(sphere.velocity.x > 0.0);
        assert!(sphere.velocity.y > 0.0);
    }

    #[test]
    fn disabled_wall_jump_falls_back_to_air_jump() {
        let mut sphere = MovingSphere::new(
            SphereControllerConfig::default()
                .with_air_jumps(1)
                .with_wall_jumps(false),
        );
        sphere.contacts.steep_count = 1;
        sphere.contacts.steep_normal = Vec3::X;

        assert_eq!(sphere.jump(GRAVITY), Some(JumpKind::Air));
        assert_eq!(sphere.velocity.x, 0.0);
    }

    // ==================== Air Jump Tests ====================

    #[test]
    fn air_jump_budget_is_enforced() {
        let mut sphere = airborne(1);

        assert_eq!(sphere.jump(GRAVITY), Some(JumpKind::Air));
        assert_eq!(sphere.jump_phase, 1);

        let velocity = sphere.velocity;
        let steps = sphere.steps_since_last_jump;
        sphere.steps_since_last_jump = 5;
        assert_eq!(sphere.jump(GRAVITY), None);
        assert_eq!(sphere.jump_phase, 1);
        assert_eq!(sphere.velocity, velocity);
        assert_eq!(sphere.steps_since_last_jump, 5);
        assert_eq!(steps, 0);
    }

    #[test]
    fn no_air_jumps_drops_request() {
        let mut sphere = airborne(0);
        assert_eq!(sphere.jump(GRAVITY), None);
        assert_eq!(sphere.velocity, Vec3::ZERO);
    }

    #[test]
    fn air_jump_count_never_exceeds_budget() {
        for budget in 0..=5 {
            let mut sphere = airborne(budget);
            let performed = (0..10).filter(|_| sphere.jump(GRAVITY).is_some()).count();
            assert_eq!(performed as u32, budget);
            assert!(sphere.jump_phase <= budget);
        }
    }
}
