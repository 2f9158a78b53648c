//! Entity and component identifiers and their allocator.
//!
//! Identifiers are plain `u64`s handed out by the [`App`](crate::App). They
//! are never reused, so a stale id simply stops resolving once the object it
//! named has been destroyed.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// A unique component instance identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl EntityId {
    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl ComponentId {
    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Component({})", self.0)
    }
}

/// Allocates monotonically increasing ids shared by entities and components.
///
/// IDs start at 1 so that a zeroed id never names a live object.
#[derive(Debug)]
pub struct IdAllocator {
    next_id: u64,
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn entity(&mut self) -> EntityId {
        EntityId(self.next())
    }

    pub fn component(&mut self) -> ComponentId {
        ComponentId(self.next())
    }

    /// Returns the number of ids allocated so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next_id - 1
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut alloc = IdAllocator::new();
        let e = alloc.entity();
        let c = alloc.component();
        let e2 = alloc.entity();
        assert_eq!(e.raw(), 1);
        assert_eq!(c.raw(), 2);
        assert_eq!(e2.raw(), 3);
        assert_eq!(alloc.count(), 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId(7).to_string(), "Entity(7)");
        assert_eq!(ComponentId(9).to_string(), "Component(9)");
    }

    #[test]
    fn test_id_serialization_roundtrip() {
        let json = serde_json::to_string(&ComponentId(42)).unwrap();
        assert_eq!(json, "42");
        let restored: ComponentId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ComponentId(42));
    }
}
