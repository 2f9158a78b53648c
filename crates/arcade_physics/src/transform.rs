//! Spatial component and the transform tree.
//!
//! A [`Transform`] holds a local position and rotation. When it has a parent,
//! its world position and rotation are the parent's plus the local values.
//! Parent links are component ids, so a destroyed parent simply stops
//! resolving; the tree is kept consistent by [`set_parent`] and by the
//! transform's own destroy hook.

use arcade_core::{App, Behaviour, Component, ComponentId, Context, HookResult, Hooks, Options, RuntimeError};
use arcade_math::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound on parent walks.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Position relative to the parent, or world position without one.
    pub position: Vec2,
    /// Rotation in radians, relative to the parent.
    pub rotation: f32,
    /// Local bounds, relative to `position`.
    pub dimensions: Rect,
    /// Only [`set_parent`] writes the link, so overrides cannot set it.
    #[serde(skip)]
    parent: Option<ComponentId>,
    #[serde(skip)]
    children: Vec<ComponentId>,
}

impl Transform {
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Rect) -> Self {
        self.dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }
}

impl Behaviour for Transform {
    /// Detach from the tree: orphan the children and leave the parent.
    fn on_destroy(&mut self, ctx: &mut Context<'_>) -> HookResult {
        let Some(me) = ctx.component() else {
            return Ok(());
        };
        let app = ctx.app_mut();
        for child in self.children.drain(..) {
            if let Some(transform) = app.component_mut::<Transform>(child) {
                transform.parent = None;
            }
        }
        if let Some(parent) = self.parent.take() {
            if let Some(transform) = app.component_mut::<Transform>(parent) {
                transform.children.retain(|c| *c != me);
            }
        }
        Ok(())
    }
}

impl Component for Transform {
    const TYPE_NAME: &'static str = "Transform";

    fn options() -> Options {
        Options::new().hooks(Hooks::DESTROY)
    }
}

/// Attach `child` under `parent`, or detach it with `None`.
///
/// Fails if either transform is gone, or if `parent` is `child` or one of its
/// descendants.
pub fn set_parent(
    app: &mut App,
    child: ComponentId,
    parent: Option<ComponentId>,
) -> Result<(), RuntimeError> {
    let previous = app
        .component::<Transform>(child)
        .ok_or(RuntimeError::DeadComponent(child))?
        .parent;

    if let Some(parent) = parent {
        if app.component::<Transform>(parent).is_none() {
            return Err(RuntimeError::DeadComponent(parent));
        }
        if ancestry(app, parent).any(|ancestor| ancestor == child) {
            return Err(RuntimeError::TransformCycle { child, parent });
        }
    }

    if let Some(old) = previous {
        if let Some(transform) = app.component_mut::<Transform>(old) {
            transform.children.retain(|c| *c != child);
        }
    }
    if let Some(new) = parent {
        if let Some(transform) = app.component_mut::<Transform>(new) {
            if !transform.children.contains(&child) {
                transform.children.push(child);
            }
        }
    }
    if let Some(transform) = app.component_mut::<Transform>(child) {
        transform.parent = parent;
    }
    Ok(())
}

/// `id` followed by each of its ancestors, at most [`MAX_DEPTH`] of them.
fn ancestry(app: &App, id: ComponentId) -> impl Iterator<Item = ComponentId> + '_ {
    std::iter::successors(Some(id), move |current| {
        app.component::<Transform>(*current)
            .and_then(|transform| transform.parent)
    })
    .take(MAX_DEPTH + 1)
}

/// World-space position of a transform.
#[must_use]
pub fn world_position(app: &App, id: ComponentId) -> Option<Vec2> {
    fold_ancestry(app, id, |transform| transform.position)
}

/// World-space rotation of a transform, in radians.
#[must_use]
pub fn world_rotation(app: &App, id: ComponentId) -> Option<f32> {
    fold_ancestry(app, id, |transform| transform.rotation)
}

fn fold_ancestry<T>(app: &App, id: ComponentId, local: impl Fn(&Transform) -> T) -> Option<T>
where
    T: std::ops::Add<Output = T>,
{
    let mut chain = ancestry(app, id).filter_map(|ancestor| app.component::<Transform>(ancestor));
    let mut total = local(chain.next()?);
    let mut depth = 0;
    for ancestor in chain {
        total = total + local(ancestor);
        depth += 1;
    }
    if depth == MAX_DEPTH {
        warn!(transform = %id, "transform chain hit the depth limit");
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use arcade_core::{ComponentRequest, Spawn};

    use super::*;

    fn app() -> App {
        let mut meta = arcade_core::Metadata::new();
        crate::register(&mut meta).unwrap();
        App::new(meta)
    }

    fn spawn_at(app: &mut App, x: f32, y: f32) -> ComponentId {
        let entity = app
            .instantiate(
                Spawn::bare().with(
                    ComponentRequest::of::<Transform>()
                        .set("position", serde_json::json!([x, y])),
                ),
            )
            .unwrap();
        app.component_id::<Transform>(entity).unwrap()
    }

    #[test]
    fn test_world_position_composes_parents() {
        let mut app = app();
        let root = spawn_at(&mut app, 10.0, 0.0);
        let mid = spawn_at(&mut app, 5.0, 5.0);
        let leaf = spawn_at(&mut app, 1.0, 1.0);
        set_parent(&mut app, mid, Some(root)).unwrap();
        set_parent(&mut app, leaf, Some(mid)).unwrap();

        assert_eq!(world_position(&app, leaf), Some(Vec2::new(16.0, 6.0)));
        assert_eq!(world_position(&app, root), Some(Vec2::new(10.0, 0.0)));
        assert_eq!(app.component::<Transform>(root).unwrap().children(), &[mid]);
    }

    #[test]
    fn test_world_rotation_composes_parents() {
        let mut app = app();
        let root = spawn_at(&mut app, 0.0, 0.0);
        let child = spawn_at(&mut app, 0.0, 0.0);
        app.component_mut::<Transform>(root).unwrap().rotation = 0.5;
        app.component_mut::<Transform>(child).unwrap().rotation = 0.25;
        set_parent(&mut app, child, Some(root)).unwrap();

        assert_eq!(world_rotation(&app, child), Some(0.75));
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut app = app();
        let a = spawn_at(&mut app, 0.0, 0.0);
        let b = spawn_at(&mut app, 0.0, 0.0);
        set_parent(&mut app, b, Some(a)).unwrap();

        let err = set_parent(&mut app, a, Some(b)).unwrap_err();
        assert!(matches!(err, RuntimeError::TransformCycle { .. }));
        let err = set_parent(&mut app, a, Some(a)).unwrap_err();
        assert!(matches!(err, RuntimeError::TransformCycle { .. }));
        assert_eq!(app.component::<Transform>(a).unwrap().parent(), None);
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut app = app();
        let a = spawn_at(&mut app, 0.0, 0.0);
        let b = spawn_at(&mut app, 0.0, 0.0);
        let child = spawn_at(&mut app, 0.0, 0.0);
        set_parent(&mut app, child, Some(a)).unwrap();
        set_parent(&mut app, child, Some(b)).unwrap();

        assert!(app.component::<Transform>(a).unwrap().children().is_empty());
        assert_eq!(app.component::<Transform>(b).unwrap().children(), &[child]);

        set_parent(&mut app, child, None).unwrap();
        assert!(app.component::<Transform>(b).unwrap().children().is_empty());
    }

    #[test]
    fn test_destroying_parent_orphans_children() {
        let mut app = app();
        let parent = spawn_at(&mut app, 10.0, 10.0);
        let child = spawn_at(&mut app, 1.0, 1.0);
        set_parent(&mut app, child, Some(parent)).unwrap();

        app.destroy(parent).unwrap();

        let transform = app.component::<Transform>(child).unwrap();
        assert_eq!(transform.parent(), None);
        assert_eq!(world_position(&app, child), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_parent_link_ignores_overrides() {
        let mut app = app();
        let root = spawn_at(&mut app, 10.0, 0.0);
        let entity = app
            .instantiate(
                Spawn::bare().with(
                    ComponentRequest::of::<Transform>()
                        .set("position", serde_json::json!([1.0, 0.0]))
                        .set("parent", serde_json::json!(root)),
                ),
            )
            .unwrap();
        let child = app.component_id::<Transform>(entity).unwrap();

        assert_eq!(app.component::<Transform>(child).unwrap().parent(), None);
        assert!(app.component::<Transform>(root).unwrap().children().is_empty());
        assert_eq!(world_position(&app, child), Some(Vec2::new(1.0, 0.0)));

        set_parent(&mut app, child, Some(root)).unwrap();
        assert_eq!(app.component::<Transform>(child).unwrap().parent(), Some(root));
        assert_eq!(app.component::<Transform>(root).unwrap().children(), &[child]);
    }

    #[test]
    fn test_missing_transform() {
        let mut app = app();
        let a = spawn_at(&mut app, 0.0, 0.0);
        let ghost = ComponentId(9999);
        assert!(matches!(
            set_parent(&mut app, a, Some(ghost)),
            Err(RuntimeError::DeadComponent(_))
        ));
        assert_eq!(world_position(&app, ghost), None);
    }
}
