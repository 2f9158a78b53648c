//! Collider components and the collision state machine.
//!
//! Every collider keeps the set of entities it currently overlaps. Each fixed
//! tick it:
//!
//! 1. re-tests every recorded pair and fires `on_collision_exit` on its
//!    entity for pairs that stopped overlapping or whose other entity is gone;
//! 2. tests every other entity with a [`Rigidbody`] and a collider, firing
//!    `on_collision_enter` for new overlaps and `on_collision_stay` for
//!    continuing ones.
//!
//! Pair sets are per collider. When two colliders overlap, each one records
//! and reports the pair from its own side.

use std::collections::HashSet;

use arcade_core::{
    App, Behaviour, Collision, CollisionPhase, Component, ComponentId, Context, EntityId,
    HookResult, Hooks, Options,
};
use serde::{Deserialize, Serialize};

use crate::rigidbody::{self, Rigidbody};
use crate::shape::{Shape, ShapeKind};
use crate::transform::{Transform, world_position};

/// Colliders test after every rigidbody has integrated.
pub const ORDER: i32 = rigidbody::ORDER + 100;

/// One recorded overlap, seen from the owning collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pair {
    other: EntityId,
    other_body: ComponentId,
}

/// A circle centred on the transform's bounds, radius half their width.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CircleCollider {
    #[serde(skip)]
    pairs: Vec<Pair>,
}

/// The transform's bounds as an axis-aligned box.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RectCollider {
    #[serde(skip)]
    pairs: Vec<Pair>,
}

impl CircleCollider {
    /// Entities this collider currently overlaps.
    pub fn overlapping(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.pairs.iter().map(|pair| pair.other)
    }
}

impl RectCollider {
    pub fn overlapping(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.pairs.iter().map(|pair| pair.other)
    }
}

impl Behaviour for CircleCollider {
    fn on_fixed_update(&mut self, ctx: &mut Context<'_>, _dt: f32) -> HookResult {
        detect(&mut self.pairs, ShapeKind::Circle, ctx)
    }
}

impl Behaviour for RectCollider {
    fn on_fixed_update(&mut self, ctx: &mut Context<'_>, _dt: f32) -> HookResult {
        detect(&mut self.pairs, ShapeKind::Rect, ctx)
    }
}

fn collider_options() -> Options {
    Options::new()
        .requires::<Transform>()
        .requires::<Rigidbody>()
        .hooks(Hooks::FIXED_UPDATE)
        .order(ORDER)
}

impl Component for CircleCollider {
    const TYPE_NAME: &'static str = "CircleCollider";

    fn options() -> Options {
        collider_options()
    }
}

impl Component for RectCollider {
    const TYPE_NAME: &'static str = "RectCollider";

    fn options() -> Options {
        collider_options()
    }
}

/// The collider kind an entity carries, if any. Circles win when an entity
/// has both.
fn collider_kind(app: &App, entity: EntityId) -> Option<ShapeKind> {
    if app.component_id::<CircleCollider>(entity).is_some() {
        Some(ShapeKind::Circle)
    } else if app.component_id::<RectCollider>(entity).is_some() {
        Some(ShapeKind::Rect)
    } else {
        None
    }
}

fn world_shape(app: &App, entity: EntityId, kind: ShapeKind) -> Option<Shape> {
    let id = app.component_id::<Transform>(entity)?;
    let bounds = app.component::<Transform>(id)?.dimensions;
    Some(kind.shape(bounds, world_position(app, id)?))
}

fn other_shape(app: &App, entity: EntityId) -> Option<Shape> {
    world_shape(app, entity, collider_kind(app, entity)?)
}

fn detect(pairs: &mut Vec<Pair>, kind: ShapeKind, ctx: &mut Context<'_>) -> HookResult {
    let owner = ctx.entity();
    let Some(owner_body) = ctx.component_id::<Rigidbody>() else {
        return Ok(());
    };
    let own = world_shape(ctx.app(), owner, kind);
    let overlaps = |app: &App, other: EntityId| {
        own.zip(other_shape(app, other))
            .is_some_and(|(a, b)| a.intersects(&b))
    };

    let mut exited = Vec::new();
    pairs.retain(|pair| {
        let still = ctx.app().is_alive(pair.other) && overlaps(ctx.app(), pair.other);
        if !still {
            exited.push(*pair);
        }
        still
    });
    // Every dropped pair gets its exit, even when an earlier one fails.
    let mut first_error = None;
    for pair in exited {
        let collision = Collision::new(owner, pair.other, owner_body, pair.other_body);
        if let Err(err) = ctx.app_mut().notify_collision(CollisionPhase::Exit, collision) {
            first_error.get_or_insert(err);
        }
    }
    if let Some(err) = first_error {
        return Err(err.into());
    }

    let mut candidates = ctx.find::<Rigidbody>();
    let mut seen = HashSet::new();
    candidates.retain(|candidate| candidate.entity != owner && seen.insert(candidate.entity));

    for candidate in candidates {
        if !overlaps(ctx.app(), candidate.entity) {
            continue;
        }
        let collision = Collision::new(owner, candidate.entity, owner_body, candidate.id);
        let phase = if pairs.iter().any(|pair| pair.other == candidate.entity) {
            CollisionPhase::Stay
        } else {
            pairs.push(Pair {
                other: candidate.entity,
                other_body: candidate.id,
            });
            CollisionPhase::Enter
        };
        ctx.app_mut().notify_collision(phase, collision)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use arcade_core::{ComponentRequest, Metadata, Spawn};
    use arcade_math::{Rect, Vec2};
    use serde_json::json;

    use super::*;

    /// Counts the collision hooks it receives.
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Probe {
        enters: u32,
        stays: u32,
        exits: u32,
        fail_exit: bool,
    }

    impl Behaviour for Probe {
        fn on_collision_enter(&mut self, _ctx: &mut Context<'_>, _collision: &Collision) -> HookResult {
            self.enters += 1;
            Ok(())
        }

        fn on_collision_stay(&mut self, _ctx: &mut Context<'_>, _collision: &Collision) -> HookResult {
            self.stays += 1;
            Ok(())
        }

        fn on_collision_exit(&mut self, _ctx: &mut Context<'_>, collision: &Collision) -> HookResult {
            self.exits += 1;
            if self.fail_exit {
                anyhow::bail!("exit from {} rejected", collision.other);
            }
            Ok(())
        }
    }

    impl arcade_core::EntityType for Probe {
        const TYPE_NAME: &'static str = "Probe";

        fn options() -> Options {
            Options::new()
                .component::<Transform>()
                .component::<Rigidbody>()
                .hooks(Hooks::COLLISION)
        }
    }

    fn app() -> App {
        let mut meta = Metadata::new();
        crate::register(&mut meta).unwrap();
        meta.define_entity::<Probe>().unwrap();
        App::new(meta)
    }

    /// A probe whose collider spans 50x50, so two circles have a combined
    /// radius of 50.
    fn spawn<C: Component>(app: &mut App, x: f32) -> EntityId {
        app.instantiate(
            Spawn::of::<Probe>()
                .with(
                    ComponentRequest::of::<Transform>()
                        .set("position", json!([x, 0.0]))
                        .set("dimensions", json!(Rect::centered(50.0, 50.0))),
                )
                .with_component::<C>(),
        )
        .unwrap()
    }

    fn move_to(app: &mut App, entity: EntityId, x: f32) {
        app.get_component_mut::<Transform>(entity).unwrap().position = Vec2::new(x, 0.0);
    }

    fn counts(app: &App, entity: EntityId) -> (u32, u32, u32) {
        let probe = app.behaviour::<Probe>(entity).unwrap();
        (probe.enters, probe.stays, probe.exits)
    }

    #[test]
    fn test_enter_stay_exit() {
        let mut app = app();
        let a = spawn::<CircleCollider>(&mut app, 0.0);
        let b = spawn::<CircleCollider>(&mut app, 100.0);

        app.fixed_tick(0.1).unwrap();
        assert_eq!(counts(&app, a), (0, 0, 0));

        move_to(&mut app, b, 30.0);
        app.fixed_tick(0.1).unwrap();
        assert_eq!(counts(&app, a), (1, 0, 0));
        assert_eq!(counts(&app, b), (1, 0, 0));

        for _ in 0..5 {
            app.fixed_tick(0.1).unwrap();
        }
        assert_eq!(counts(&app, a), (1, 5, 0));

        move_to(&mut app, b, 100.0);
        app.fixed_tick(0.1).unwrap();
        assert_eq!(counts(&app, a), (1, 5, 1));
        assert_eq!(counts(&app, b), (1, 5, 1));

        app.fixed_tick(0.1).unwrap();
        assert_eq!(counts(&app, a), (1, 5, 1));
    }

    #[test]
    fn test_destroyed_other_exits() {
        let mut app = app();
        let a = spawn::<CircleCollider>(&mut app, 0.0);
        let b = spawn::<RectCollider>(&mut app, 10.0);

        app.fixed_tick(0.1).unwrap();
        assert_eq!(counts(&app, a), (1, 0, 0));

        app.destroy(b).unwrap();
        app.fixed_tick(0.1).unwrap();
        assert_eq!(counts(&app, a), (1, 0, 1));
        let collider = app.get_component::<CircleCollider>(a).unwrap();
        assert_eq!(collider.overlapping().count(), 0);
    }

    #[test]
    fn test_failing_exit_still_fires_every_exit() {
        let mut app = app();
        app.set_hook_failures(arcade_core::HookFailurePolicy::Propagate);
        let a = app
            .instantiate(
                Spawn::of::<Probe>()
                    .set("fail_exit", json!(true))
                    .with(
                        ComponentRequest::of::<Transform>()
                            .set("dimensions", json!(Rect::centered(50.0, 50.0))),
                    )
                    .with_component::<CircleCollider>(),
            )
            .unwrap();
        let b = spawn::<CircleCollider>(&mut app, 10.0);
        let c = spawn::<CircleCollider>(&mut app, -10.0);

        app.fixed_tick(0.1).unwrap();
        assert_eq!(counts(&app, a), (2, 0, 0));

        move_to(&mut app, b, 200.0);
        move_to(&mut app, c, -200.0);
        assert!(app.fixed_tick(0.1).is_err());

        assert_eq!(counts(&app, a), (2, 0, 2));
        let collider = app.get_component::<CircleCollider>(a).unwrap();
        assert_eq!(collider.overlapping().count(), 0);
    }

    #[test]
    fn test_rect_colliders_overlap() {
        let mut app = app();
        let a = spawn::<RectCollider>(&mut app, 0.0);
        let b = spawn::<RectCollider>(&mut app, 45.0);
        let c = spawn::<RectCollider>(&mut app, 90.0);

        app.fixed_tick(0.1).unwrap();

        assert_eq!(counts(&app, a), (1, 0, 0));
        assert_eq!(counts(&app, b), (2, 0, 0));
        assert_eq!(counts(&app, c), (1, 0, 0));
        let overlapping: Vec<_> = app.get_component::<RectCollider>(b).unwrap().overlapping().collect();
        assert_eq!(overlapping, vec![a, c]);
    }

    #[test]
    fn test_entities_without_collider_are_ignored() {
        let mut app = app();
        let a = spawn::<CircleCollider>(&mut app, 0.0);
        app.instantiate(
            Spawn::of::<Probe>().with(
                ComponentRequest::of::<Transform>()
                    .set("dimensions", json!(Rect::centered(40.0, 40.0))),
            ),
        )
        .unwrap();

        app.fixed_tick(0.1).unwrap();
        assert_eq!(counts(&app, a), (0, 0, 0));
    }

    #[test]
    fn test_collider_requires_rigidbody() {
        let mut app = app();
        let err = app
            .instantiate(
                Spawn::bare()
                    .with_component::<Transform>()
                    .with_component::<CircleCollider>(),
            )
            .unwrap_err();
        assert!(matches!(err, arcade_core::RuntimeError::MissingRequirement { .. }));
    }
}
