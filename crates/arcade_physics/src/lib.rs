//! # arcade_physics
//!
//! Spatial and physical components for the arcade runtime.
//!
//! - [`Transform`] — position, rotation and local bounds, arranged in a tree.
//! - [`Rigidbody`] — mass, velocity and force accumulators, integrated every
//!   fixed tick.
//! - [`CircleCollider`] / [`RectCollider`] — pairwise overlap tests raising
//!   enter, stay and exit collision hooks on the owning entity.

pub mod collider;
pub mod rigidbody;
pub mod shape;
pub mod transform;

use arcade_core::{Metadata, RuntimeError};

pub use collider::{CircleCollider, RectCollider};
pub use rigidbody::Rigidbody;
pub use shape::{Shape, ShapeKind};
pub use transform::{Transform, set_parent, world_position, world_rotation};

/// Define every physics component in `metadata`.
pub fn register(metadata: &mut Metadata) -> Result<(), RuntimeError> {
    metadata.define_component::<Transform>()?;
    metadata.define_component::<Rigidbody>()?;
    metadata.define_component::<CircleCollider>()?;
    metadata.define_component::<RectCollider>()?;
    Ok(())
}
