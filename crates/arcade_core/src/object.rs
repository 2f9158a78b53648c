//! The object graph contracts: behaviours, components, entity types and
//! services.
//!
//! Entities and components share the [`Behaviour`] hook surface. Which hooks
//! the runtime actually invokes is decided by the [`Hooks`] capability set a
//! type declares in its [`Options`]; the default method bodies exist only so
//! implementors can leave unused hooks out.
//!
//! # Examples
//!
//! ```rust
//! use arcade_core::{Behaviour, Component, Context, HookResult, Hooks, Options};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Lifetime {
//!     remaining: f32,
//! }
//!
//! impl Behaviour for Lifetime {
//!     fn on_fixed_update(&mut self, ctx: &mut Context<'_>, dt: f32) -> HookResult {
//!         self.remaining -= dt;
//!         if self.remaining <= 0.0 {
//!             ctx.destroy_self()?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl Component for Lifetime {
//!     const TYPE_NAME: &'static str = "Lifetime";
//!
//!     fn options() -> Options {
//!         Options::new().hooks(Hooks::FIXED_UPDATE)
//!     }
//! }
//! ```

use std::any::Any;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::collision::Collision;
use crate::context::Context;
use crate::metadata::Options;
use crate::services::Services;
use crate::surface::Surface;
use crate::type_key::TypeKey;

/// Result type returned by every lifecycle hook.
pub type HookResult = anyhow::Result<()>;

/// Object-safe access to [`Any`] for downcasting trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Lifecycle hooks shared by entity types and components.
pub trait Behaviour: AsAny {
    /// Dependencies are resolved; cache sibling lookups here.
    fn on_awake(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// Runs after every unit of the entity has been awakened.
    fn on_start(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn on_fixed_update(&mut self, _ctx: &mut Context<'_>, _dt: f32) -> HookResult {
        Ok(())
    }

    fn on_update(&mut self, _ctx: &mut Context<'_>, _surface: &mut dyn Surface) -> HookResult {
        Ok(())
    }

    fn on_late_update(&mut self, _ctx: &mut Context<'_>, _surface: &mut dyn Surface) -> HookResult {
        Ok(())
    }

    /// Runs before the unit is removed from the live collections.
    fn on_destroy(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn on_collision_enter(&mut self, _ctx: &mut Context<'_>, _collision: &Collision) -> HookResult {
        Ok(())
    }

    fn on_collision_stay(&mut self, _ctx: &mut Context<'_>, _collision: &Collision) -> HookResult {
        Ok(())
    }

    fn on_collision_exit(&mut self, _ctx: &mut Context<'_>, _collision: &Collision) -> HookResult {
        Ok(())
    }
}

/// A component type: an exclusively-owned behaviour attached to one entity.
///
/// Components are built from `Default` and then field overrides are merged in
/// through their serde representation, so only fields that exist on the type
/// can be overridden.
pub trait Component: Behaviour + Default + Serialize + DeserializeOwned {
    /// The registration key. Must be unique across all defined types.
    const TYPE_NAME: &'static str;

    /// Declared requirements, services, ordering and hook capabilities.
    fn options() -> Options {
        Options::new()
    }

    fn type_key() -> TypeKey {
        TypeKey::from_name(Self::TYPE_NAME)
    }
}

/// An entity type: the entity's own fields and hooks plus the components and
/// services it is declared with.
pub trait EntityType: Behaviour + Default + Serialize + DeserializeOwned {
    /// The registration key. Must be unique across all defined types.
    const TYPE_NAME: &'static str;

    fn options() -> Options {
        Options::new()
    }

    fn type_key() -> TypeKey {
        TypeKey::from_name(Self::TYPE_NAME)
    }
}

/// Marker for application-wide singleton state.
pub trait Service: AsAny {}

/// A service type. At most one instance exists per application, created the
/// first time any entity or service references it.
pub trait ServiceType: Service + Sized {
    /// The registration key. Must be unique across all defined types.
    const TYPE_NAME: &'static str;

    /// Declared service dependencies. Only the `services` list is consulted.
    fn options() -> Options {
        Options::new()
    }

    /// Build the service. Every declared dependency is already present in
    /// `services` when this runs.
    fn create(services: &Services) -> anyhow::Result<Self>;

    fn type_key() -> TypeKey {
        TypeKey::from_name(Self::TYPE_NAME)
    }
}
