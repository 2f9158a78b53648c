//! # arcade_core
//!
//! The object runtime for small 2D arcade games: entities own components and
//! reference application-wide services, a metadata registry records what each
//! type needs, and the [`App`] resolves those needs, runs lifecycle hooks and
//! dispatches fixed and render ticks.
//!
//! This crate provides:
//!
//! - [`Behaviour`], [`Component`], [`EntityType`], [`ServiceType`] — the
//!   contracts user types implement.
//! - [`Metadata`] — the type table populated before the app is built.
//! - [`App`] — the registry: instantiation, destruction, lookups, ticks.
//! - [`Context`] — what a running hook sees of the registry.
//! - [`Scheduler`] — tokio-driven fixed and render loops.
//! - [`Surface`] and [`CommandBuffer`] — the render target abstraction.

pub mod app;
pub mod collision;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod id;
pub mod metadata;
pub mod object;
pub mod overrides;
pub mod scheduler;
pub mod services;
pub mod spawn;
pub mod surface;
pub mod tag;
pub mod type_key;

pub use app::{App, ComponentRef, EntityRef, Target};
pub use collision::{Collision, CollisionPhase};
pub use config::{HookFailurePolicy, SchedulerConfig};
pub use context::Context;
pub use error::RuntimeError;
pub use event::DomainEvent;
pub use id::{ComponentId, EntityId, IdAllocator};
pub use metadata::{Hooks, Kind, Metadata, Options, TypeMeta};
pub use object::{AsAny, Behaviour, Component, EntityType, HookResult, Service, ServiceType};
pub use overrides::Fields;
pub use scheduler::Scheduler;
pub use services::Services;
pub use spawn::{ComponentRequest, PropertyOverride, Spawn};
pub use surface::{Color, CommandBuffer, DrawCommand, Surface};
pub use tag::{has_label, labels};
pub use type_key::TypeKey;
