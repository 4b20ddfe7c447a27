//! Collision data and per-step contact accumulation.
//!
//! The physics engine reports contacts as batches of surface normals, possibly
//! several times per step (enter and stay events, several points each). The
//! [`ContactAccumulator`] buckets them into ground, steep and climbable sums
//! until the step driver consumes and resets it.

use bevy::prelude::*;

/// Information about a raycast or contact hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    /// Distance from the query origin to the hit point.
    pub distance: f32,
    /// Normal of the surface at the hit point, pointing away from it.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Rigid body that was hit, if the collider belongs to one.
    pub entity: Option<Entity>,
    /// Layer bits of the hit collider.
    pub layers: u32,
}

impl CollisionData {
    /// Create a hit on the default layer.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
            layers: 1,
        }
    }

    /// Builder: set the layer bits of the hit collider.
    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }
}

/// Below this `dot(up, normal)` a contact is facing away from up (a ceiling)
/// and does not count as steep.
pub const MIN_STEEP_DOT: f32 = -0.01;

/// How a single recorded contact was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Walkable for the contact's layer.
    Ground,
    /// Too steep to walk, but not facing down.
    Steep,
    /// Facing away from up; only relevant for climbing.
    Overhang,
}

/// Thresholds applying to one contact, resolved from its layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactThresholds {
    /// Minimum `dot(up, normal)` for ground on this layer.
    pub min_ground_dot: f32,
    /// Minimum `dot(up, normal)` for climbing, or `None` when this contact
    /// cannot be climbed (climb not requested or layer not climbable).
    pub min_climb_dot: Option<f32>,
}

/// Per-step contact sums and counts.
///
/// Reset exactly once per fixed step by [`reset`](Self::reset), before the
/// next step's contacts arrive.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactAccumulator {
    /// Number of ground contacts this step.
    pub ground_count: u32,
    /// Number of steep contacts this step.
    pub steep_count: u32,
    /// Number of climbable contacts this step.
    pub climb_count: u32,
    /// Sum of ground normals.
    pub ground_normal: Vec3,
    /// Sum of steep normals.
    pub steep_normal: Vec3,
    /// Sum of climbable normals.
    pub climb_normal: Vec3,
    /// Most recent climbable normal. Survives [`reset`](Self::reset).
    pub last_climb_normal: Vec3,
    /// Body the latest qualifying contact belongs to.
    pub connected_body: Option<Entity>,
}

impl ContactAccumulator {
    /// Record one contact normal.
    ///
    /// Ground contacts always claim the connected body. Steep contacts claim
    /// it only while no ground contact has been recorded this step. Climbable
    /// contacts claim it unconditionally, so the last climbable contact wins.
    pub fn record(
        &mut self,
        normal: Vec3,
        up: Vec3,
        thresholds: ContactThresholds,
        body: Option<Entity>,
    ) -> ContactKind {
        let up_dot = up.dot(normal);
        if up_dot >= thresholds.min_ground_dot {
            self.ground_count += 1;
            self.ground_normal += normal;
            self.connected_body = body;
            return ContactKind::Ground;
        }

        let kind = if up_dot > MIN_STEEP_DOT {
            self.steep_count += 1;
            self.steep_normal += normal;
            if self.ground_count == 0 {
                self.connected_body = body;
            }
            ContactKind::Steep
        } else {
            ContactKind::Overhang
        };

        if let Some(min_climb_dot) = thresholds.min_climb_dot {
            if up_dot >= min_climb_dot {
                self.climb_count += 1;
                self.climb_normal += normal;
                self.last_climb_normal = normal;
                self.connected_body = body;
            }
        }

        kind
    }

    /// Whether any ground contact was recorded (or forced) this step.
    #[inline]
    pub fn on_ground(&self) -> bool {
        self.ground_count > 0
    }

    /// Whether any steep contact was recorded this step.
    #[inline]
    pub fn on_steep(&self) -> bool {
        self.steep_count > 0
    }

    /// Clear counts, sums and the connected body for the next step.
    pub fn reset(&mut self) {
        *self = Self {
            last_climb_normal: self.last_climb_normal,
            ..default()
        };
    }
}
