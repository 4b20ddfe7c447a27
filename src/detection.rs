//! Surface classification.
//!
//! At the start of every fixed step the accumulated contacts are turned into a
//! single [`SupportKind`]. The checks run in priority order and the first one
//! that succeeds wins:
//!
//! 1. climbing a climbable surface,
//! 2. standing on direct ground contacts,
//! 3. snapping back to ground found by a short downward probe,
//! 4. promoting several steep contacts that together form a walkable corner,
//! 5. airborne.

use bevy::log::trace;
use bevy::prelude::*;

use crate::backend::PhysicsView;
use crate::controller::MovingSphere;

/// Steps that must pass after a jump before climbing, snapping or corner
/// promotion may treat a contact as support again.
pub const JUMP_SEPARATION_STEPS: u32 = 2;

/// How the sphere is supported during a step.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SupportKind {
    /// No usable support.
    #[default]
    Airborne,
    /// Held against a climbable surface.
    Climbing,
    /// Resting on at least one walkable contact.
    Ground,
    /// No contact, but the snap probe found ground just below.
    Snapped,
    /// Only steep contacts, which together form a walkable corner.
    SteepCorner,
}

impl SupportKind {
    /// Whether this counts as grounded for movement and jumping.
    #[inline]
    pub fn is_supported(self) -> bool {
        self != SupportKind::Airborne
    }
}

impl MovingSphere {
    /// Whether the accumulated contacts allow climbing this step.
    #[inline]
    pub(crate) fn climbing(&self) -> bool {
        self.contacts.climb_count > 0 && self.steps_since_last_jump > JUMP_SEPARATION_STEPS
    }

    /// Classify the accumulated contacts and update the step counters.
    ///
    /// Leaves `contact_normal` unit length (or up when airborne), forces the
    /// ground count to at least 1 whenever some support was found, and resets
    /// the air-jump phase once the sphere is firmly back on support.
    pub(crate) fn update_state(&mut self, position: Vec3, view: &impl PhysicsView) -> SupportKind {
        self.steps_since_last_grounded = self.steps_since_last_grounded.saturating_add(1);
        self.steps_since_last_jump = self.steps_since_last_jump.saturating_add(1);

        let support = if self.check_climbing() {
            SupportKind::Climbing
        } else if self.check_ground() {
            SupportKind::Ground
        } else if self.snap_to_ground(position, view) {
            SupportKind::Snapped
        } else if self.check_steep_contacts() {
            SupportKind::SteepCorner
        } else {
            SupportKind::Airborne
        };

        if support.is_supported() {
            self.steps_since_last_grounded = 0;
            if self.steps_since_last_jump > 1 {
                self.jump_phase = 0;
            }
        } else {
            self.contact_normal = self.axes.up;
        }
        support
    }

    fn check_climbing(&mut self) -> bool {
        if !self.climbing() {
            return false;
        }
        if self.contacts.climb_count > 1 {
            let normal = self.contacts.climb_normal.normalize_or_zero();
            // Opposing walls of a crevice sum to something pointing up or to
            // nothing; fall back to the last wall touched.
            self.contacts.climb_normal =
                if normal == Vec3::ZERO || self.axes.up.dot(normal) >= self.thresholds.min_ground_dot {
                    self.contacts.last_climb_normal
                } else {
                    normal
                };
        }
        self.contacts.ground_count = 1;
        self.contact_normal = self.contacts.climb_normal;
        true
    }

    fn check_ground(&mut self) -> bool {
        if !self.contacts.on_ground() {
            return false;
        }
        self.contact_normal = if self.contacts.ground_count > 1 {
            self.contacts.ground_normal.normalize_or_zero()
        } else {
            self.contacts.ground_normal
        };
        true
    }

    /// Keep the sphere glued to the ground when it briefly loses contact,
    /// e.g. when rolling over a crest.
    fn snap_to_ground(&mut self, position: Vec3, view: &impl PhysicsView) -> bool {
        if self.steps_since_last_grounded > 1 || self.steps_since_last_jump <= JUMP_SEPARATION_STEPS {
            return false;
        }
        let speed = self.velocity.length();
        if speed > self.config.max_snap_speed {
            return false;
        }

        let Some(hit) = view.raycast(position, -self.axes.up, self.config.probe_distance, self.config.probe_mask)
        else {
            trace!("ground snap probe found nothing");
            return false;
        };
        let up_dot = self.axes.up.dot(hit.normal);
        if up_dot < self.thresholds.min_dot(hit.layers, self.config.stairs_mask) {
            trace!("ground snap probe hit a surface too steep to stand on");
            return false;
        }

        self.contacts.ground_count = 1;
        self.contact_normal = hit.normal;
        let dot = self.velocity.dot(hit.normal);
        if dot > 0.0 {
            self.velocity = (self.velocity - hit.normal * dot).normalize_or_zero() * speed;
        }
        self.contacts.connected_body = hit.entity;
        true
    }

    /// Several steep contacts can still hold the sphere up, e.g. wedged in a
    /// V-shaped gap.
    fn check_steep_contacts(&mut self) -> bool {
        if self.contacts.steep_count <= 1 || self.steps_since_last_jump <= JUMP_SEPARATION_STEPS {
            return false;
        }
        self.contacts.steep_normal = self.contacts.steep_normal.normalize_or_zero();
        if self.axes.up.dot(self.contacts.steep_normal) < self.thresholds.min_ground_dot {
            return false;
        }
        self.contacts.ground_count = 1;
        self.contact_normal = self.contacts.steep_normal;
        true
    }
}
