//! Collision pairs delivered to collision hooks.

use arcade_math::Vec2;
use serde::{Deserialize, Serialize};

use crate::id::{ComponentId, EntityId};

/// One (owner, other) overlap as seen from the owner's collider.
///
/// The other entity's collider keeps its own mirrored pair; the two are
/// never merged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub owner: EntityId,
    pub other: EntityId,
    pub owner_body: ComponentId,
    pub other_body: ComponentId,
    /// Contact point. Not computed yet; always `None`.
    pub contact: Option<Vec2>,
}

impl Collision {
    #[must_use]
    pub fn new(
        owner: EntityId,
        other: EntityId,
        owner_body: ComponentId,
        other_body: ComponentId,
    ) -> Self {
        Self {
            owner,
            other,
            owner_body,
            other_body,
            contact: None,
        }
    }
}

/// Which collision hook to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionPhase {
    Enter,
    Stay,
    Exit,
}

impl CollisionPhase {
    #[must_use]
    pub const fn hook_name(self) -> &'static str {
        match self {
            Self::Enter => "on_collision_enter",
            Self::Stay => "on_collision_stay",
            Self::Exit => "on_collision_exit",
        }
    }
}
