//! Application registry and lifecycle driver.
//!
//! The [`App`] is the single owner of every live entity, component and
//! service. It resolves declared dependencies through the [`Metadata`]
//! table, runs lifecycle hooks in a fixed order, and dispatches the fixed
//! and render ticks.
//!
//! ## Instantiation order
//!
//! 1. Resolve the effective component list (declared ∪ requested).
//! 2. Validate required siblings. Nothing is constructed if this fails.
//! 3. Resolve services, dependencies first.
//! 4. Construct the entity and its components, applying overrides.
//! 5. `on_awake` on the entity, then each component.
//! 6. `on_start` on the same list.
//! 7. Commit everything to the live collections.
//!
//! Until step 7 the entity is pending: siblings can see each other, but
//! [`App::find`], [`App::entity`] and the ticks cannot.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::collision::{Collision, CollisionPhase};
use crate::config::HookFailurePolicy;
use crate::context::Context;
use crate::error::RuntimeError;
use crate::event::DomainEvent;
use crate::id::{ComponentId, EntityId, IdAllocator};
use crate::metadata::{BehaviourFactory, Hooks, Kind, Metadata, Options};
use crate::object::{Behaviour, Component, EntityType, HookResult, ServiceType};
use crate::overrides::Fields;
use crate::services::Services;
use crate::spawn::{ComponentRequest, Spawn};
use crate::surface::Surface;
use crate::tag;
use crate::type_key::TypeKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Live,
}

struct EntityRecord {
    id: EntityId,
    kind: Option<TypeKey>,
    name: &'static str,
    tag: Option<String>,
    components: Vec<ComponentId>,
    services: Vec<TypeKey>,
    hooks: Hooks,
    order: i32,
    phase: Phase,
    /// `None` for bare entities, or while a hook has it checked out.
    behaviour: Option<Box<dyn Behaviour>>,
}

struct ComponentRecord {
    id: ComponentId,
    key: TypeKey,
    name: &'static str,
    entity: EntityId,
    correlation: Option<String>,
    hooks: Hooks,
    order: i32,
    phase: Phase,
    /// `None` while a hook has it checked out.
    instance: Option<Box<dyn Behaviour>>,
}

impl ComponentRecord {
    fn to_ref(&self) -> ComponentRef {
        ComponentRef {
            id: self.id,
            entity: self.entity,
            key: self.key,
        }
    }
}

/// Something that can be destroyed or run a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Entity(EntityId),
    Component(ComponentId),
}

impl From<EntityId> for Target {
    fn from(id: EntityId) -> Self {
        Self::Entity(id)
    }
}

impl From<ComponentId> for Target {
    fn from(id: ComponentId) -> Self {
        Self::Component(id)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entity(id) => id.fmt(f),
            Self::Component(id) => id.fmt(f),
        }
    }
}

/// A live component as returned by [`App::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    pub id: ComponentId,
    pub entity: EntityId,
    pub key: TypeKey,
}

/// Read-only view of a live entity.
pub struct EntityRef<'a> {
    record: &'a EntityRecord,
}

impl EntityRef<'_> {
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.record.id
    }

    /// The entity type, or `None` for a bare entity.
    #[must_use]
    pub fn kind(&self) -> Option<TypeKey> {
        self.record.kind
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.record.name
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.record.tag.as_deref()
    }

    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.tag().is_some_and(|t| tag::has_label(t, label))
    }

    #[must_use]
    pub fn components(&self) -> &[ComponentId] {
        &self.record.components
    }

    #[must_use]
    pub fn services(&self) -> &[TypeKey] {
        &self.record.services
    }
}

/// Construction plan for one component of an entity being instantiated.
struct Plan {
    request: ComponentRequest,
    name: &'static str,
    hooks: Hooks,
    order: i32,
    requires: Vec<TypeKey>,
    services: Vec<TypeKey>,
    factory: BehaviourFactory,
}

const BARE_ENTITY: &str = "<bare>";

/// The application registry.
pub struct App {
    metadata: Metadata,
    ids: IdAllocator,
    entities: Vec<EntityRecord>,
    components: Vec<ComponentRecord>,
    services: Services,
    /// Entity types instantiated once by [`App::boot`].
    bootstrap: Vec<TypeKey>,
    events: Vec<DomainEvent>,
    policy: HookFailurePolicy,
}

impl App {
    /// Create an application over a fully populated metadata table.
    #[must_use]
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            ids: IdAllocator::new(),
            entities: Vec::new(),
            components: Vec::new(),
            services: Services::new(),
            bootstrap: Vec::new(),
            events: Vec::new(),
            policy: HookFailurePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_hook_failures(mut self, policy: HookFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_hook_failures(&mut self, policy: HookFailurePolicy) {
        self.policy = policy;
    }

    #[must_use]
    pub fn hook_failures(&self) -> HookFailurePolicy {
        self.policy
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Instantiate an entity with its declared and requested components and
    /// services.
    ///
    /// By the time this returns every dependency is resolved and every
    /// `on_awake`/`on_start` hook has run. On error nothing is left in the
    /// live collections (services created along the way persist, as all
    /// services do).
    pub fn instantiate(&mut self, spawn: Spawn) -> Result<EntityId, RuntimeError> {
        let Spawn {
            kind,
            mut fields,
            components: requested,
            services: requested_services,
            properties,
        } = spawn;

        let (name, options, factory) = match kind {
            Some(key) => {
                let meta = self.metadata.expect(key, Kind::Entity)?;
                (meta.name, meta.options.clone(), meta.behaviour_factory())
            }
            None => (BARE_ENTITY, Options::default(), None),
        };

        let mut requests: Vec<ComponentRequest> = options
            .components
            .iter()
            .map(|&key| ComponentRequest::keyed(key))
            .collect();
        for request in requested {
            merge_request(&mut requests, request);
        }

        let plans = requests
            .into_iter()
            .map(|request| self.plan(request))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_requirements(name, &plans)?;

        let mut services = options.services.clone();
        let component_services = plans.iter().flat_map(|plan| plan.services.iter().copied());
        for key in requested_services.into_iter().chain(component_services) {
            if !services.contains(&key) {
                services.push(key);
            }
        }
        for &key in &services {
            self.resolve_service(key)?;
        }

        let tag = match fields.remove("tag") {
            Some(Value::String(tag)) => Some(tag),
            Some(other) => {
                debug!(entity_type = name, value = %other, "ignoring non-string tag override");
                options.tag.clone()
            }
            None => options.tag.clone(),
        };
        let behaviour = match factory {
            Some(factory) => Some(factory(&[&fields])?),
            None => {
                if !fields.is_empty() {
                    debug!(fields = fields.len(), "bare entity has no fields to override");
                }
                None
            }
        };

        let mut instances = Vec::with_capacity(plans.len());
        for plan in &plans {
            let mut layers: Vec<&Fields> = vec![&plan.request.fields];
            layers.extend(
                properties
                    .iter()
                    .filter(|p| p.matches(plan.request.key, plan.request.id.as_deref()))
                    .map(|p| &p.fields),
            );
            instances.push((plan.factory)(&layers)?);
        }

        let entity = self.ids.entity();
        let mut owned = Vec::with_capacity(plans.len());
        for (plan, instance) in plans.into_iter().zip(instances) {
            let id = self.ids.component();
            owned.push(id);
            self.components.push(ComponentRecord {
                id,
                key: plan.request.key,
                name: plan.name,
                entity,
                correlation: plan.request.id,
                hooks: plan.hooks,
                order: plan.order,
                phase: Phase::Pending,
                instance: Some(instance),
            });
        }
        self.entities.push(EntityRecord {
            id: entity,
            kind,
            name,
            tag,
            components: owned.clone(),
            services,
            hooks: options.hooks,
            order: options.order.unwrap_or(0),
            phase: Phase::Pending,
            behaviour,
        });

        let targets: Vec<Target> = std::iter::once(Target::Entity(entity))
            .chain(owned.into_iter().map(Target::Component))
            .collect();
        if let Err(err) = self.awaken(&targets) {
            self.discard(entity);
            return Err(err);
        }

        self.commit(entity);
        debug!(entity = %entity, entity_type = name, "instantiated");
        Ok(entity)
    }

    /// Attach one more component to an existing entity.
    ///
    /// Required siblings are not re-validated here.
    pub fn add_component(
        &mut self,
        entity: EntityId,
        request: ComponentRequest,
    ) -> Result<ComponentId, RuntimeError> {
        let phase = self
            .entity_record(entity)
            .map(|record| record.phase)
            .ok_or(RuntimeError::DeadEntity(entity))?;

        let plan = self.plan(request)?;
        for &key in &plan.services {
            self.resolve_service(key)?;
        }
        let instance = (plan.factory)(&[&plan.request.fields])?;

        let id = self.ids.component();
        self.components.push(ComponentRecord {
            id,
            key: plan.request.key,
            name: plan.name,
            entity,
            correlation: plan.request.id.clone(),
            hooks: plan.hooks,
            order: plan.order,
            phase,
            instance: Some(instance),
        });
        if let Some(record) = self.entity_record_mut(entity) {
            record.components.push(id);
            for &key in &plan.services {
                if !record.services.contains(&key) {
                    record.services.push(key);
                }
            }
        }

        if let Err(err) = self.awaken(&[Target::Component(id)]) {
            self.components.retain(|c| c.id != id);
            if let Some(record) = self.entity_record_mut(entity) {
                record.components.retain(|c| *c != id);
            }
            return Err(err);
        }

        debug!(entity = %entity, component = plan.name, "component added");
        Ok(id)
    }

    /// Attach service `S` to an entity, creating the singleton if needed.
    ///
    /// Unlike [`App::add_component`] no hooks run: services carry no
    /// lifecycle hooks, and the singleton is shared by every entity that
    /// references it.
    pub fn add_service<S: ServiceType>(&mut self, entity: EntityId) -> Result<(), RuntimeError> {
        self.add_service_key(entity, S::type_key())
    }

    pub fn add_service_key(&mut self, entity: EntityId, key: TypeKey) -> Result<(), RuntimeError> {
        if self.entity_record(entity).is_none() {
            return Err(RuntimeError::DeadEntity(entity));
        }
        self.resolve_service(key)?;
        if let Some(record) = self.entity_record_mut(entity) {
            if !record.services.contains(&key) {
                record.services.push(key);
            }
        }
        Ok(())
    }

    /// Queue an entity type for [`App::boot`].
    pub fn bootstrap<T: EntityType>(&mut self) {
        self.bootstrap.push(T::type_key());
    }

    /// Instantiate every queued bootstrap type once, in queue order.
    pub fn boot(&mut self) -> Result<Vec<EntityId>, RuntimeError> {
        let pending = std::mem::take(&mut self.bootstrap);
        pending
            .into_iter()
            .map(|key| self.instantiate(Spawn::keyed(key)))
            .collect()
    }

    fn plan(&self, request: ComponentRequest) -> Result<Plan, RuntimeError> {
        let meta = self.metadata.expect(request.key, Kind::Component)?;
        let factory = meta
            .behaviour_factory()
            .ok_or_else(|| RuntimeError::UnknownType(meta.name.to_string()))?;
        Ok(Plan {
            name: meta.name,
            hooks: meta.options.hooks,
            order: meta.options.order.unwrap_or(0),
            requires: meta.options.requires.clone(),
            services: meta.options.services.clone(),
            factory,
            request,
        })
    }

    fn check_requirements(&self, entity: &str, plans: &[Plan]) -> Result<(), RuntimeError> {
        for plan in plans {
            for required in &plan.requires {
                if !plans.iter().any(|p| p.request.key == *required) {
                    return Err(RuntimeError::MissingRequirement {
                        entity: entity.to_string(),
                        component: plan.name,
                        missing: self.metadata.name_of(*required),
                    });
                }
            }
        }
        Ok(())
    }

    fn resolve_service(&mut self, key: TypeKey) -> Result<(), RuntimeError> {
        let mut chain = Vec::new();
        self.resolve_service_in(key, &mut chain)
    }

    /// Find-or-create with dependencies first. `chain` holds the services
    /// currently being resolved.
    fn resolve_service_in(
        &mut self,
        key: TypeKey,
        chain: &mut Vec<TypeKey>,
    ) -> Result<(), RuntimeError> {
        if self.services.contains(key) {
            return Ok(());
        }

        let meta = self.metadata.expect(key, Kind::Service)?;
        let name = meta.name;
        let dependencies = meta.options.services.clone();
        let factory = meta
            .service_factory()
            .ok_or_else(|| RuntimeError::UnknownType(name.to_string()))?;

        if chain.contains(&key) {
            let mut names: Vec<&'static str> = chain
                .iter()
                .filter_map(|k| self.metadata.lookup(*k))
                .map(|m| m.name)
                .collect();
            names.push(name);
            return Err(RuntimeError::ServiceCycle(names));
        }

        chain.push(key);
        for dependency in dependencies {
            self.resolve_service_in(dependency, chain)?;
        }
        chain.pop();

        let service = factory(&self.services)
            .map_err(|source| RuntimeError::ServiceConstruction { name, source })?;
        self.services.insert(key, service);
        debug!(service = name, "service created");
        Ok(())
    }

    fn awaken(&mut self, targets: &[Target]) -> Result<(), RuntimeError> {
        for &target in targets {
            self.run_hook(target, Hooks::AWAKE, "on_awake", |b, ctx| b.on_awake(ctx))?;
        }
        for &target in targets {
            self.run_hook(target, Hooks::START, "on_start", |b, ctx| b.on_start(ctx))?;
        }
        Ok(())
    }

    fn commit(&mut self, entity: EntityId) {
        let Some(record) = self.entities.iter_mut().find(|r| r.id == entity) else {
            debug!(entity = %entity, "entity destroyed during start-up");
            return;
        };
        record.phase = Phase::Live;
        for component in &mut self.components {
            if component.entity == entity {
                component.phase = Phase::Live;
            }
        }
    }

    /// Drop a pending entity without running any hooks.
    fn discard(&mut self, entity: EntityId) {
        self.entities.retain(|r| r.id != entity);
        self.components.retain(|c| c.entity != entity);
        debug!(entity = %entity, "discarded partially constructed entity");
    }

    // ---------------------------------------------------------------------
    // Destruction
    // ---------------------------------------------------------------------

    /// Destroy an entity (with all its components, never its services) or a
    /// single component.
    ///
    /// Returns `Ok(false)` if the target was already gone. Removal always
    /// completes; a failing `on_destroy` hook is reported afterwards under
    /// [`HookFailurePolicy::Propagate`].
    pub fn destroy(&mut self, target: impl Into<Target>) -> Result<bool, RuntimeError> {
        match target.into() {
            Target::Entity(id) => self.destroy_entity(id),
            Target::Component(id) => self.destroy_component(id),
        }
    }

    fn destroy_entity(&mut self, id: EntityId) -> Result<bool, RuntimeError> {
        if self.entity_record(id).is_none() {
            return Ok(false);
        }

        let hook = self.run_hook(Target::Entity(id), Hooks::DESTROY, "on_destroy", |b, ctx| {
            b.on_destroy(ctx)
        });

        let owned = match self.entities.iter().position(|r| r.id == id) {
            Some(index) => self.entities.remove(index).components,
            None => Vec::new(),
        };

        let mut first_error = hook.err();
        for component in owned {
            if let Err(err) = self.destroy_component(component) {
                first_error.get_or_insert(err);
            }
        }

        debug!(entity = %id, "entity destroyed");
        first_error.map_or(Ok(true), Err)
    }

    fn destroy_component(&mut self, id: ComponentId) -> Result<bool, RuntimeError> {
        let Some((entity, name)) = self.component_record(id).map(|c| (c.entity, c.name)) else {
            return Ok(false);
        };

        let hook = self.run_hook(Target::Component(id), Hooks::DESTROY, "on_destroy", |b, ctx| {
            b.on_destroy(ctx)
        });

        self.components.retain(|c| c.id != id);
        if let Some(record) = self.entity_record_mut(entity) {
            record.components.retain(|c| *c != id);
        }

        debug!(component = %id, type_name = name, entity = %entity, "component destroyed");
        hook.map(|()| true)
    }

    // ---------------------------------------------------------------------
    // Ticks
    // ---------------------------------------------------------------------

    /// Run `on_fixed_update` on every live entity and component declaring it.
    pub fn fixed_tick(&mut self, dt: f32) -> Result<(), RuntimeError> {
        for target in self.tick_targets(Hooks::FIXED_UPDATE) {
            self.run_hook(target, Hooks::FIXED_UPDATE, "on_fixed_update", |b, ctx| {
                b.on_fixed_update(ctx, dt)
            })?;
        }
        Ok(())
    }

    /// Clear the surface, then run every `on_update`, then every
    /// `on_late_update`.
    pub fn render_tick(&mut self, surface: &mut dyn Surface) -> Result<(), RuntimeError> {
        surface.clear();
        for target in self.tick_targets(Hooks::UPDATE) {
            self.run_hook(target, Hooks::UPDATE, "on_update", |b, ctx| {
                b.on_update(ctx, &mut *surface)
            })?;
        }
        for target in self.tick_targets(Hooks::LATE_UPDATE) {
            self.run_hook(target, Hooks::LATE_UPDATE, "on_late_update", |b, ctx| {
                b.on_late_update(ctx, &mut *surface)
            })?;
        }
        Ok(())
    }

    /// Deliver a collision transition to the owner entity's hooks.
    pub fn notify_collision(
        &mut self,
        phase: CollisionPhase,
        collision: Collision,
    ) -> Result<(), RuntimeError> {
        self.run_hook(
            Target::Entity(collision.owner),
            Hooks::COLLISION,
            phase.hook_name(),
            |b, ctx| match phase {
                CollisionPhase::Enter => b.on_collision_enter(ctx, &collision),
                CollisionPhase::Stay => b.on_collision_stay(ctx, &collision),
                CollisionPhase::Exit => b.on_collision_exit(ctx, &collision),
            },
        )
    }

    /// Snapshot of live targets declaring `hook`: entities, then components,
    /// each in registration order, stable-sorted by ordering hint.
    ///
    /// Ticks iterate this snapshot, so destruction during a tick never
    /// disturbs the pass; destroyed targets are skipped when reached.
    fn tick_targets(&self, hook: Hooks) -> Vec<Target> {
        let entities = self
            .entities
            .iter()
            .filter(|r| r.phase == Phase::Live && r.hooks.contains(hook))
            .map(|r| (r.order, Target::Entity(r.id)));
        let components = self
            .components
            .iter()
            .filter(|c| c.phase == Phase::Live && c.hooks.contains(hook))
            .map(|c| (c.order, Target::Component(c.id)));

        let mut targets: Vec<(i32, Target)> = entities.chain(components).collect();
        targets.sort_by_key(|(order, _)| *order);
        targets.into_iter().map(|(_, target)| target).collect()
    }

    // ---------------------------------------------------------------------
    // Hook dispatch
    // ---------------------------------------------------------------------

    /// Check the target out, run `f` against it, check it back in.
    ///
    /// Targets that are gone, already running, or do not declare `hook` are
    /// skipped.
    fn run_hook<F>(
        &mut self,
        target: Target,
        hook: Hooks,
        name: &'static str,
        f: F,
    ) -> Result<(), RuntimeError>
    where
        F: FnOnce(&mut dyn Behaviour, &mut Context<'_>) -> HookResult,
    {
        let Some((entity, hooks, mut instance)) = self.check_out(target, hook) else {
            return Ok(());
        };

        let result = {
            let component = match target {
                Target::Component(id) => Some(id),
                Target::Entity(_) => None,
            };
            let mut ctx = Context::new(self, entity, component);
            f(&mut *instance, &mut ctx)
        };

        let returned = self.check_in(target, entity, hook, hooks, instance);
        match result {
            Ok(()) => returned,
            Err(source) => {
                self.hook_failed(name, target, source)?;
                returned
            }
        }
    }

    fn check_out(
        &mut self,
        target: Target,
        hook: Hooks,
    ) -> Option<(EntityId, Hooks, Box<dyn Behaviour>)> {
        match target {
            Target::Entity(id) => {
                let record = self.entity_record_mut(id)?;
                if !record.hooks.contains(hook) {
                    return None;
                }
                let behaviour = record.behaviour.take()?;
                Some((id, record.hooks, behaviour))
            }
            Target::Component(id) => {
                let record = self.component_record_mut(id)?;
                if !record.hooks.contains(hook) {
                    return None;
                }
                let instance = record.instance.take()?;
                Some((record.entity, record.hooks, instance))
            }
        }
    }

    /// Return a checked-out object. If it was destroyed while its hook ran,
    /// its `on_destroy` runs now instead.
    fn check_in(
        &mut self,
        target: Target,
        entity: EntityId,
        running: Hooks,
        hooks: Hooks,
        mut instance: Box<dyn Behaviour>,
    ) -> Result<(), RuntimeError> {
        let slot = match target {
            Target::Entity(id) => self.entity_record_mut(id).map(|r| &mut r.behaviour),
            Target::Component(id) => self.component_record_mut(id).map(|r| &mut r.instance),
        };
        if let Some(slot) = slot {
            *slot = Some(instance);
            return Ok(());
        }

        if running == Hooks::DESTROY || !hooks.contains(Hooks::DESTROY) {
            return Ok(());
        }
        let component = match target {
            Target::Component(id) => Some(id),
            Target::Entity(_) => None,
        };
        let result = {
            let mut ctx = Context::new(self, entity, component);
            instance.on_destroy(&mut ctx)
        };
        match result {
            Ok(()) => Ok(()),
            Err(source) => self.hook_failed("on_destroy", target, source),
        }
    }

    fn hook_failed(
        &self,
        hook: &'static str,
        target: Target,
        source: anyhow::Error,
    ) -> Result<(), RuntimeError> {
        match self.policy {
            HookFailurePolicy::Isolate => {
                error!(hook, owner = %target, error = %format!("{source:#}"), "hook failed, continuing");
                Ok(())
            }
            HookFailurePolicy::Propagate => Err(RuntimeError::Hook {
                hook,
                owner: target.to_string(),
                source,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------

    fn entity_record(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.iter().find(|r| r.id == id)
    }

    fn entity_record_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.entities.iter_mut().find(|r| r.id == id)
    }

    fn component_record(&self, id: ComponentId) -> Option<&ComponentRecord> {
        self.components.iter().find(|c| c.id == id)
    }

    fn component_record_mut(&mut self, id: ComponentId) -> Option<&mut ComponentRecord> {
        self.components.iter_mut().find(|c| c.id == id)
    }

    /// The entity's own behaviour, if it is of type `T`.
    #[must_use]
    pub fn behaviour<T: EntityType>(&self, entity: EntityId) -> Option<&T> {
        self.entity_record(entity)
            .filter(|r| r.kind == Some(T::type_key()))
            .and_then(|r| r.behaviour.as_deref())
            .and_then(|b| b.as_any().downcast_ref::<T>())
    }

    pub fn behaviour_mut<T: EntityType>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entity_record_mut(entity)
            .filter(|r| r.kind == Some(T::type_key()))
            .and_then(|r| r.behaviour.as_deref_mut())
            .and_then(|b| b.as_any_mut().downcast_mut::<T>())
    }

    /// All live components of type `T`, in registration order.
    #[must_use]
    pub fn find<T: Component>(&self) -> Vec<ComponentRef> {
        self.find_key(T::type_key())
    }

    #[must_use]
    pub fn find_key(&self, key: TypeKey) -> Vec<ComponentRef> {
        self.components
            .iter()
            .filter(|c| c.phase == Phase::Live && c.key == key)
            .map(ComponentRecord::to_ref)
            .collect()
    }

    /// A component by id, if it exists and is a `T`.
    #[must_use]
    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.component_record(id)
            .filter(|c| c.key == T::type_key())
            .and_then(|c| downcast_ref::<T>(&c.instance))
    }

    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.component_record_mut(id)
            .filter(|c| c.key == T::type_key())
            .and_then(|c| downcast_mut::<T>(&mut c.instance))
    }

    #[must_use]
    pub fn component_ref(&self, id: ComponentId) -> Option<ComponentRef> {
        self.component_record(id).map(ComponentRecord::to_ref)
    }

    /// First component of type `T` on `entity`.
    #[must_use]
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        let key = T::type_key();
        self.components
            .iter()
            .filter(|c| c.entity == entity && c.key == key)
            .find_map(|c| downcast_ref::<T>(&c.instance))
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        let key = T::type_key();
        self.components
            .iter_mut()
            .filter(|c| c.entity == entity && c.key == key)
            .find_map(|c| downcast_mut::<T>(&mut c.instance))
    }

    /// Every component of type `T` on `entity`.
    #[must_use]
    pub fn get_components<T: Component>(&self, entity: EntityId) -> Vec<&T> {
        let key = T::type_key();
        self.components
            .iter()
            .filter(|c| c.entity == entity && c.key == key)
            .filter_map(|c| downcast_ref::<T>(&c.instance))
            .collect()
    }

    /// The component of type `T` on `entity` with correlation id `id`.
    #[must_use]
    pub fn get_component_by_id<T: Component>(&self, entity: EntityId, id: &str) -> Option<&T> {
        let key = T::type_key();
        self.components
            .iter()
            .filter(|c| c.entity == entity && c.key == key && c.correlation.as_deref() == Some(id))
            .find_map(|c| downcast_ref::<T>(&c.instance))
    }

    #[must_use]
    pub fn component_id<T: Component>(&self, entity: EntityId) -> Option<ComponentId> {
        let key = T::type_key();
        self.components
            .iter()
            .find(|c| c.entity == entity && c.key == key)
            .map(|c| c.id)
    }

    /// Service `S`, if `entity` references it.
    #[must_use]
    pub fn get_service<S: ServiceType>(&self, entity: EntityId) -> Option<&S> {
        let record = self.entity_record(entity)?;
        if !record.services.contains(&S::type_key()) {
            return None;
        }
        self.services.get::<S>()
    }

    pub fn get_service_mut<S: ServiceType>(&mut self, entity: EntityId) -> Option<&mut S> {
        let record = self.entity_record(entity)?;
        if !record.services.contains(&S::type_key()) {
            return None;
        }
        self.services.get_mut::<S>()
    }

    /// The services `entity` references.
    #[must_use]
    pub fn get_services(&self, entity: EntityId) -> &[TypeKey] {
        self.entity_record(entity)
            .map(|record| record.services.as_slice())
            .unwrap_or_default()
    }

    /// Service `S` regardless of which entities reference it.
    #[must_use]
    pub fn service<S: ServiceType>(&self) -> Option<&S> {
        self.services.get::<S>()
    }

    pub fn service_mut<S: ServiceType>(&mut self) -> Option<&mut S> {
        self.services.get_mut::<S>()
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<EntityRef<'_>> {
        self.entity_record(id)
            .filter(|r| r.phase == Phase::Live)
            .map(|record| EntityRef { record })
    }

    /// Live entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.entities
            .iter()
            .filter(|r| r.phase == Phase::Live)
            .map(|record| EntityRef { record })
    }

    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entity(id).is_some()
    }

    /// Tag of an entity, including one still being instantiated.
    #[must_use]
    pub fn tag_of(&self, id: EntityId) -> Option<&str> {
        self.entity_record(id).and_then(|r| r.tag.as_deref())
    }

    /// Live entities whose tag carries `label`.
    #[must_use]
    pub fn entities_tagged(&self, label: &str) -> Vec<EntityId> {
        self.entities()
            .filter(|e| e.has_label(label))
            .map(|e| e.id())
            .collect()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.iter().filter(|r| r.phase == Phase::Live).count()
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components
            .iter()
            .filter(|c| c.phase == Phase::Live)
            .count()
    }

    // ---------------------------------------------------------------------
    // Outbound events
    // ---------------------------------------------------------------------

    /// Queue an event not attributed to any entity.
    pub fn emit<P: Serialize>(&mut self, topic: &str, payload: &P) -> Result<(), RuntimeError> {
        self.emit_from(None, topic, payload)
    }

    pub fn emit_from<P: Serialize>(
        &mut self,
        source: Option<EntityId>,
        topic: &str,
        payload: &P,
    ) -> Result<(), RuntimeError> {
        let payload = serde_json::to_value(payload).map_err(|source| RuntimeError::Event {
            topic: topic.to_string(),
            source,
        })?;
        self.events.push(DomainEvent {
            topic: topic.to_string(),
            source,
            payload,
        });
        Ok(())
    }

    /// Take every queued event.
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("entities", &self.entity_count())
            .field("components", &self.component_count())
            .field("services", &self.services)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn merge_request(requests: &mut Vec<ComponentRequest>, request: ComponentRequest) {
    match requests.iter_mut().find(|r| r.same_instance(&request)) {
        Some(existing) => existing.fields.extend(request.fields),
        None => requests.push(request),
    }
}

fn downcast_ref<T: Component>(slot: &Option<Box<dyn Behaviour>>) -> Option<&T> {
    slot.as_deref().and_then(|b| b.as_any().downcast_ref::<T>())
}

fn downcast_mut<T: Component>(slot: &mut Option<Box<dyn Behaviour>>) -> Option<&mut T> {
    slot.as_deref_mut()
        .and_then(|b| b.as_any_mut().downcast_mut::<T>())
}
