//! Outbound domain events.
//!
//! Hooks queue events on the [`App`](crate::App); the host drains them after
//! each tick and routes them wherever it wants (network sync, audio, UI).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub topic: String,
    /// The entity whose hook raised the event, if any.
    pub source: Option<EntityId>,
    pub payload: Value,
}
