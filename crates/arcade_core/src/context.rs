//! Per-hook context.

use serde::Serialize;

use crate::app::{App, ComponentRef, Target};
use crate::error::RuntimeError;
use crate::id::{ComponentId, EntityId};
use crate::object::{Component, ServiceType};
use crate::spawn::Spawn;

/// Handed to every lifecycle hook.
///
/// Knows which entity (and, for component hooks, which component) is
/// running, and exposes the registry for sibling lookups, spawning and
/// destruction. The running object itself is checked out of the registry
/// for the duration of the hook, so it never shows up in its own lookups.
pub struct Context<'a> {
    app: &'a mut App,
    entity: EntityId,
    component: Option<ComponentId>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(app: &'a mut App, entity: EntityId, component: Option<ComponentId>) -> Self {
        Self {
            app,
            entity,
            component,
        }
    }

    /// The entity whose hook is running.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The running component, when this is a component hook.
    #[must_use]
    pub fn component(&self) -> Option<ComponentId> {
        self.component
    }

    #[must_use]
    pub fn app(&self) -> &App {
        &*self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut *self.app
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.app.tag_of(self.entity)
    }

    /// First sibling component of type `T`.
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.app.get_component::<T>(self.entity)
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.app.get_component_mut::<T>(self.entity)
    }

    #[must_use]
    pub fn get_components<T: Component>(&self) -> Vec<&T> {
        self.app.get_components::<T>(self.entity)
    }

    /// Sibling component of type `T` with the given correlation id.
    #[must_use]
    pub fn get_component_by_id<T: Component>(&self, id: &str) -> Option<&T> {
        self.app.get_component_by_id::<T>(self.entity, id)
    }

    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.app.component_id::<T>(self.entity)
    }

    /// Service of type `S`, if this entity references it.
    #[must_use]
    pub fn get_service<S: ServiceType>(&self) -> Option<&S> {
        self.app.get_service::<S>(self.entity)
    }

    pub fn get_service_mut<S: ServiceType>(&mut self) -> Option<&mut S> {
        self.app.get_service_mut::<S>(self.entity)
    }

    #[must_use]
    pub fn find<T: Component>(&self) -> Vec<ComponentRef> {
        self.app.find::<T>()
    }

    pub fn instantiate(&mut self, spawn: Spawn) -> Result<EntityId, RuntimeError> {
        self.app.instantiate(spawn)
    }

    pub fn destroy(&mut self, target: impl Into<Target>) -> Result<bool, RuntimeError> {
        self.app.destroy(target)
    }

    /// Destroy the entity whose hook is running, with all its components.
    pub fn destroy_self(&mut self) -> Result<bool, RuntimeError> {
        self.app.destroy(self.entity)
    }

    /// Queue an outbound event attributed to this entity.
    pub fn emit<P: Serialize>(&mut self, topic: &str, payload: &P) -> Result<(), RuntimeError> {
        self.app.emit_from(Some(self.entity), topic, payload)
    }
}
