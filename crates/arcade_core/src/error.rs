//! Runtime error types.

use crate::id::{ComponentId, EntityId};
use crate::metadata::Kind;

/// Errors raised by the application registry.
///
/// Lookups that find nothing are not errors; they return `None` or an empty
/// collection instead.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A type was referenced that was never defined in the metadata registry.
    #[error("type `{0}` is not defined")]
    UnknownType(String),

    /// A type was defined twice.
    #[error("type `{0}` is already defined")]
    AlreadyDefined(&'static str),

    /// A type was used where a different kind was expected (e.g. a service
    /// type requested as a component).
    #[error("type `{name}` is a {actual:?}, expected a {expected:?}")]
    KindMismatch {
        name: &'static str,
        expected: Kind,
        actual: Kind,
    },

    /// A component's required sibling is absent from the entity's effective
    /// component list.
    #[error("component `{component}` on entity type `{entity}` requires missing component `{missing}`")]
    MissingRequirement {
        entity: String,
        component: &'static str,
        missing: String,
    },

    /// Service dependencies form a cycle. Holds the resolution chain.
    #[error("service dependency cycle: {}", .0.join(" -> "))]
    ServiceCycle(Vec<&'static str>),

    /// A service constructor failed.
    #[error("failed to construct service `{name}`: {source}")]
    ServiceConstruction {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A field override could not be applied to a type.
    #[error("invalid override for `{name}`: {source}")]
    InvalidOverride {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A lifecycle hook returned an error and the failure policy propagates it.
    #[error("`{hook}` hook failed on {owner}: {source}")]
    Hook {
        hook: &'static str,
        owner: String,
        #[source]
        source: anyhow::Error,
    },

    /// The entity does not exist (never created or already destroyed).
    #[error("{0} is not alive")]
    DeadEntity(EntityId),

    /// The component does not exist (never created or already destroyed).
    #[error("{0} is not alive")]
    DeadComponent(ComponentId),

    /// Re-parenting a transform would make it its own ancestor.
    #[error("parenting {child} under {parent} would create a cycle")]
    TransformCycle {
        child: ComponentId,
        parent: ComponentId,
    },

    /// A scheduler setting is out of range.
    #[error("invalid scheduler setting `{field}` = {value}: {reason}")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Encoding an outbound event payload failed.
    #[error("failed to encode event `{topic}`: {source}")]
    Event {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
}
