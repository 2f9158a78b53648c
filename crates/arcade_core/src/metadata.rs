//! Metadata registry — declared options per type.
//!
//! Every entity, component and service type is defined exactly once in a
//! [`Metadata`] table before the [`App`](crate::App) is built. The table maps
//! a [`TypeKey`] to the type's [`Options`] and to the function that
//! constructs it, so the registry never has to probe objects at runtime to
//! find out what they need or which hooks they implement.

use std::collections::HashMap;

use bitflags::bitflags;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::RuntimeError;
use crate::object::{Behaviour, Component, EntityType, Service, ServiceType};
use crate::overrides::{Fields, apply_fields};
use crate::services::Services;
use crate::type_key::TypeKey;

bitflags! {
    /// The lifecycle hooks a type implements. Only declared hooks are invoked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Hooks: u16 {
        const AWAKE = 1 << 0;
        const START = 1 << 1;
        const FIXED_UPDATE = 1 << 2;
        const UPDATE = 1 << 3;
        const LATE_UPDATE = 1 << 4;
        const DESTROY = 1 << 5;
        /// Enter, stay and exit collision hooks.
        const COLLISION = 1 << 6;
    }
}

/// What a registered type is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Entity,
    Component,
    Service,
}

/// Declared options for a type.
///
/// Built fluently from the type's `options()` function:
///
/// ```rust,ignore
/// Options::new()
///     .requires::<Transform>()
///     .service::<Score>()
///     .hooks(Hooks::FIXED_UPDATE)
///     .order(10)
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    /// Components an entity type is instantiated with.
    pub components: Vec<TypeKey>,
    /// Sibling components that must co-exist with a component.
    pub requires: Vec<TypeKey>,
    /// Services resolved before construction.
    pub services: Vec<TypeKey>,
    /// Ordering hint for tick dispatch. Lower runs first; ties keep
    /// registration order.
    pub order: Option<i32>,
    /// Hook capabilities.
    pub hooks: Hooks,
    /// Default tag for an entity type.
    pub tag: Option<String>,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a component the entity type is instantiated with.
    #[must_use]
    pub fn component<T: Component>(self) -> Self {
        self.component_key(T::type_key())
    }

    #[must_use]
    pub fn component_key(mut self, key: TypeKey) -> Self {
        if !self.components.contains(&key) {
            self.components.push(key);
        }
        self
    }

    /// Declare a sibling component that must be present on the same entity.
    #[must_use]
    pub fn requires<T: Component>(self) -> Self {
        self.requires_key(T::type_key())
    }

    #[must_use]
    pub fn requires_key(mut self, key: TypeKey) -> Self {
        if !self.requires.contains(&key) {
            self.requires.push(key);
        }
        self
    }

    /// Declare a service dependency.
    #[must_use]
    pub fn service<S: ServiceType>(self) -> Self {
        self.service_key(S::type_key())
    }

    #[must_use]
    pub fn service_key(mut self, key: TypeKey) -> Self {
        if !self.services.contains(&key) {
            self.services.push(key);
        }
        self
    }

    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks |= hooks;
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

pub(crate) type BehaviourFactory = fn(&[&Fields]) -> Result<Box<dyn Behaviour>, RuntimeError>;
pub(crate) type ServiceFactory = fn(&Services) -> anyhow::Result<Box<dyn Service>>;

#[derive(Clone, Copy)]
pub(crate) enum Factory {
    Behaviour(BehaviourFactory),
    Service(ServiceFactory),
}

/// A registered type.
#[derive(Clone)]
pub struct TypeMeta {
    pub key: TypeKey,
    pub name: &'static str,
    pub kind: Kind,
    pub options: Options,
    pub(crate) factory: Factory,
}

impl std::fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMeta")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TypeMeta {
    pub(crate) fn behaviour_factory(&self) -> Option<BehaviourFactory> {
        match self.factory {
            Factory::Behaviour(f) => Some(f),
            Factory::Service(_) => None,
        }
    }

    pub(crate) fn service_factory(&self) -> Option<ServiceFactory> {
        match self.factory {
            Factory::Service(f) => Some(f),
            Factory::Behaviour(_) => None,
        }
    }
}

/// The metadata table. Additive only: there is no removal.
#[derive(Debug, Default)]
pub struct Metadata {
    types: HashMap<TypeKey, TypeMeta>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define an entity type.
    pub fn define_entity<T: EntityType>(&mut self) -> Result<(), RuntimeError> {
        self.define(TypeMeta {
            key: T::type_key(),
            name: T::TYPE_NAME,
            kind: Kind::Entity,
            options: T::options(),
            factory: Factory::Behaviour(construct_entity::<T>),
        })
    }

    /// Define a component type.
    pub fn define_component<T: Component>(&mut self) -> Result<(), RuntimeError> {
        self.define(TypeMeta {
            key: T::type_key(),
            name: T::TYPE_NAME,
            kind: Kind::Component,
            options: T::options(),
            factory: Factory::Behaviour(construct_component::<T>),
        })
    }

    /// Define a service type.
    pub fn define_service<S: ServiceType>(&mut self) -> Result<(), RuntimeError> {
        self.define(TypeMeta {
            key: S::type_key(),
            name: S::TYPE_NAME,
            kind: Kind::Service,
            options: S::options(),
            factory: Factory::Service(construct_service::<S>),
        })
    }

    fn define(&mut self, meta: TypeMeta) -> Result<(), RuntimeError> {
        if self.types.contains_key(&meta.key) {
            return Err(RuntimeError::AlreadyDefined(meta.name));
        }
        debug!(type_name = meta.name, kind = ?meta.kind, "defined type");
        self.types.insert(meta.key, meta);
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, key: TypeKey) -> Option<&TypeMeta> {
        self.types.get(&key)
    }

    /// Look a type up and check that it is of the expected kind.
    pub fn expect(&self, key: TypeKey, kind: Kind) -> Result<&TypeMeta, RuntimeError> {
        let meta = self
            .lookup(key)
            .ok_or_else(|| RuntimeError::UnknownType(key.to_string()))?;
        if meta.kind != kind {
            return Err(RuntimeError::KindMismatch {
                name: meta.name,
                expected: kind,
                actual: meta.kind,
            });
        }
        Ok(meta)
    }

    /// Registration name for error messages; falls back to the raw key.
    #[must_use]
    pub fn name_of(&self, key: TypeKey) -> String {
        self.lookup(key)
            .map_or_else(|| key.to_string(), |meta| meta.name.to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn build<T>(name: &'static str, layers: &[&Fields]) -> Result<Box<dyn Behaviour>, RuntimeError>
where
    T: Behaviour + Default + Serialize + DeserializeOwned,
{
    let mut value = T::default();
    for fields in layers {
        apply_fields(name, &mut value, fields)?;
    }
    Ok(Box::new(value))
}

fn construct_entity<T: EntityType>(layers: &[&Fields]) -> Result<Box<dyn Behaviour>, RuntimeError> {
    build::<T>(T::TYPE_NAME, layers)
}

fn construct_component<T: Component>(
    layers: &[&Fields],
) -> Result<Box<dyn Behaviour>, RuntimeError> {
    build::<T>(T::TYPE_NAME, layers)
}

fn construct_service<S: ServiceType>(services: &Services) -> anyhow::Result<Box<dyn Service>> {
    Ok(Box::new(S::create(services)?))
}
