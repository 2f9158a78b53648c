//! Singleton service storage.

use std::collections::HashMap;

use crate::object::{Service, ServiceType};
use crate::type_key::TypeKey;

/// The live services of an application, at most one per type.
///
/// Services are inserted once and never removed.
#[derive(Default)]
pub struct Services {
    instances: HashMap<TypeKey, Box<dyn Service>>,
    /// Creation order, for diagnostics.
    order: Vec<TypeKey>,
}

impl Services {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get<S: ServiceType>(&self) -> Option<&S> {
        self.instances
            .get(&S::type_key())
            .and_then(|service| (**service).as_any().downcast_ref::<S>())
    }

    #[must_use]
    pub fn get_mut<S: ServiceType>(&mut self) -> Option<&mut S> {
        self.instances
            .get_mut(&S::type_key())
            .and_then(|service| (**service).as_any_mut().downcast_mut::<S>())
    }

    #[must_use]
    pub fn contains(&self, key: TypeKey) -> bool {
        self.instances.contains_key(&key)
    }

    /// Keys in creation order.
    #[must_use]
    pub fn keys(&self) -> &[TypeKey] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub(crate) fn insert(&mut self, key: TypeKey, service: Box<dyn Service>) {
        if self.instances.insert(key, service).is_none() {
            self.order.push(key);
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
