//! Instantiation requests.
//!
//! A [`Spawn`] describes one call to [`App::instantiate`](crate::App::instantiate):
//! the entity type, overrides for the entity's own fields, extra components
//! and services, and property overrides for specific components.

use serde_json::Value;

use crate::object::{Component, EntityType, ServiceType};
use crate::overrides::Fields;
use crate::type_key::TypeKey;

/// A request for one component instance.
///
/// A correlation id distinguishes several instances of the same component
/// type on one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRequest {
    pub key: TypeKey,
    pub id: Option<String>,
    pub fields: Fields,
}

impl ComponentRequest {
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::keyed(T::type_key())
    }

    #[must_use]
    pub fn keyed(key: TypeKey) -> Self {
        Self {
            key,
            id: None,
            fields: Fields::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override one field of the constructed component.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Two requests name the same instance when type and correlation id match.
    #[must_use]
    pub fn same_instance(&self, other: &ComponentRequest) -> bool {
        self.key == other.key && self.id == other.id
    }
}

/// Property overrides addressed to every component of a type, or to one
/// correlation id of that type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyOverride {
    pub target: TypeKey,
    pub id: Option<String>,
    pub fields: Fields,
}

impl PropertyOverride {
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            target: T::type_key(),
            id: None,
            fields: Fields::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// An override without an id applies to every instance of its type.
    #[must_use]
    pub fn matches(&self, key: TypeKey, id: Option<&str>) -> bool {
        self.target == key && self.id.as_deref().is_none_or(|wanted| Some(wanted) == id)
    }
}

/// Everything needed to instantiate one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spawn {
    /// Entity type; `None` spawns a bare entity.
    pub kind: Option<TypeKey>,
    /// Overrides for the entity's own fields. The `tag` key sets the tag.
    pub fields: Fields,
    pub components: Vec<ComponentRequest>,
    pub services: Vec<TypeKey>,
    pub properties: Vec<PropertyOverride>,
}

impl Spawn {
    /// Spawn an entity of type `T`.
    #[must_use]
    pub fn of<T: EntityType>() -> Self {
        Self::keyed(T::type_key())
    }

    #[must_use]
    pub fn keyed(key: TypeKey) -> Self {
        Self {
            kind: Some(key),
            ..Self::default()
        }
    }

    /// Spawn an entity with no type of its own.
    #[must_use]
    pub fn bare() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    #[must_use]
    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.set("tag", Value::String(tag.into()))
    }

    #[must_use]
    pub fn with(mut self, request: ComponentRequest) -> Self {
        self.components.push(request);
        self
    }

    #[must_use]
    pub fn with_component<T: Component>(self) -> Self {
        self.with(ComponentRequest::of::<T>())
    }

    #[must_use]
    pub fn with_service<S: ServiceType>(mut self) -> Self {
        self.services.push(S::type_key());
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: PropertyOverride) -> Self {
        self.properties.push(property);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_property_override_matching() {
        let key = TypeKey::from_name("Gun");
        let any = PropertyOverride {
            target: key,
            id: None,
            fields: Fields::new(),
        };
        assert!(any.matches(key, None));
        assert!(any.matches(key, Some("left")));
        assert!(!any.matches(TypeKey::from_name("Other"), None));

        let left = PropertyOverride {
            id: Some("left".into()),
            ..any
        };
        assert!(left.matches(key, Some("left")));
        assert!(!left.matches(key, Some("right")));
        assert!(!left.matches(key, None));
    }

    #[test]
    fn test_same_instance() {
        let key = TypeKey::from_name("Gun");
        let plain = ComponentRequest::keyed(key);
        let left = ComponentRequest::keyed(key).with_id("left");
        assert!(plain.same_instance(&ComponentRequest::keyed(key).set("ammo", json!(3))));
        assert!(!plain.same_instance(&left));
    }

    #[test]
    fn test_tag_is_a_field() {
        let spawn = Spawn::bare().tag("enemy:asteroid");
        assert_eq!(spawn.fields.get("tag"), Some(&json!("enemy:asteroid")));
        assert!(spawn.kind.is_none());
    }
}
