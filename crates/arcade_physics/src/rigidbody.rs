//! Rigidbody integration.
//!
//! Each fixed tick a [`Rigidbody`] advances its entity's [`Transform`]:
//!
//! 1. angular acceleration = angular resultant / mass; angular velocity
//!    integrates first, then rotation, then the angular cap applies.
//! 2. position integrates with the velocity from the start of the tick.
//!    Velocity then takes the friction force computed last tick, which may
//!    stop the body but never reverses it, and the applied resultant / mass.
//!    The result is capped.
//! 3. The friction force for the next tick opposes the new velocity, so
//!    friction lags one tick.
//!
//! Forces are accumulated with [`Rigidbody::add_force`] and
//! [`Rigidbody::add_torque`] and consumed by the next integration. Friction
//! is kept apart from them, so applied forces always take full effect.

use arcade_core::{Behaviour, Component, Context, HookResult, Hooks, Options};
use arcade_math::Vec2;
use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// Magnitudes below this snap to exactly zero.
pub const EPSILON: f32 = 1e-4;

/// Rigidbodies integrate before colliders test overlaps.
pub const ORDER: i32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rigidbody {
    /// Non-positive mass makes the body ignore forces.
    pub mass: f32,
    /// Friction coefficient: deceleration per unit of speed direction.
    pub friction: f32,
    pub velocity: Vec2,
    /// Radians per second.
    pub angular_velocity: f32,
    /// Force accumulator for the next tick.
    pub resultant: Vec2,
    /// Torque accumulator for the next tick.
    pub angular_resultant: f32,
    /// Speed cap; `None` is uncapped.
    pub max_velocity: Option<f32>,
    pub max_angular_velocity: Option<f32>,
    /// Friction force computed at the end of the previous tick.
    #[serde(skip)]
    friction_force: Vec2,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            mass: 1.0,
            friction: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            resultant: Vec2::ZERO,
            angular_resultant: 0.0,
            max_velocity: None,
            max_angular_velocity: None,
            friction_force: Vec2::ZERO,
        }
    }
}

impl Rigidbody {
    pub fn add_force(&mut self, force: Vec2) {
        self.resultant += force;
    }

    pub fn add_torque(&mut self, torque: f32) {
        self.angular_resultant += torque;
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Friction force the next integration will apply.
    #[must_use]
    pub fn friction_force(&self) -> Vec2 {
        self.friction_force
    }

    fn inverse_mass(&self) -> f32 {
        if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 }
    }

    /// Advance `transform` by `dt` seconds.
    pub fn integrate(&mut self, transform: &mut Transform, dt: f32) {
        let inverse_mass = self.inverse_mass();

        let angular_acceleration = self.angular_resultant * inverse_mass;
        self.angular_velocity += angular_acceleration * dt;
        transform.rotation += self.angular_velocity * dt;
        if let Some(cap) = self.max_angular_velocity {
            if self.angular_velocity.abs() > cap {
                self.angular_velocity = cap.copysign(self.angular_velocity);
            }
        }
        self.angular_resultant = 0.0;

        transform.position += self.velocity * dt;

        // Friction may stop the body but never reverses it.
        let slowed = self.velocity + self.friction_force * inverse_mass * dt;
        self.velocity = if slowed.dot(self.velocity) < 0.0 {
            Vec2::ZERO
        } else {
            slowed
        };
        self.velocity += self.resultant * inverse_mass * dt;
        self.resultant = Vec2::ZERO;
        if let Some(cap) = self.max_velocity {
            self.velocity = self.velocity.clamp_length_max(cap);
        }
        self.snap();

        self.friction_force = if self.friction > 0.0 && self.velocity != Vec2::ZERO {
            -self.velocity.normalize() * self.friction * self.mass.max(0.0)
        } else {
            Vec2::ZERO
        };
        if self.friction_force.length() < EPSILON {
            self.friction_force = Vec2::ZERO;
        }
    }

    fn snap(&mut self) {
        if self.velocity.length() < EPSILON {
            self.velocity = Vec2::ZERO;
        }
        if self.angular_velocity.abs() < EPSILON {
            self.angular_velocity = 0.0;
        }
    }
}

impl Behaviour for Rigidbody {
    fn on_fixed_update(&mut self, ctx: &mut Context<'_>, dt: f32) -> HookResult {
        if let Some(transform) = ctx.get_component_mut::<Transform>() {
            self.integrate(transform, dt);
        }
        Ok(())
    }
}

impl Component for Rigidbody {
    const TYPE_NAME: &'static str = "Rigidbody";

    fn options() -> Options {
        Options::new()
            .requires::<Transform>()
            .hooks(Hooks::FIXED_UPDATE)
            .order(ORDER)
    }
}
