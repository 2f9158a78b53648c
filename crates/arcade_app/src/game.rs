//! Demo game objects: a ship on autopilot and a field of drifting asteroids.

use std::f32::consts::TAU;

use arcade_core::{
    Behaviour, Collision, Color, Component, ComponentRequest, Context, EntityType, HookResult,
    Hooks, Metadata, Options, RuntimeError, Service, ServiceType, Services, Spawn, Surface,
    has_label,
};
use arcade_math::{Rect, Vec2, direction};
use arcade_physics::{CircleCollider, RectCollider, Rigidbody, Transform};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

pub const WIDTH: f32 = 800.0;
pub const HEIGHT: f32 = 600.0;

/// Define every demo type.
pub fn register(metadata: &mut Metadata) -> Result<(), RuntimeError> {
    metadata.define_service::<Score>()?;
    metadata.define_component::<Autopilot>()?;
    metadata.define_component::<Wrap>()?;
    metadata.define_entity::<Ship>()?;
    metadata.define_entity::<Asteroid>()?;
    metadata.define_entity::<AsteroidField>()?;
    Ok(())
}

fn center() -> Vec2 {
    Vec2::new(WIDTH / 2.0, HEIGHT / 2.0)
}

/// Running tally of asteroid hits.
#[derive(Debug, Default)]
pub struct Score {
    pub hits: u32,
}

impl Service for Score {}

impl ServiceType for Score {
    const TYPE_NAME: &'static str = "Score";

    fn create(_services: &Services) -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}

/// Pushes its rigidbody forward along the transform's heading while turning.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Autopilot {
    pub thrust: f32,
    pub turn: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            thrust: 40.0,
            turn: 0.6,
        }
    }
}

impl Behaviour for Autopilot {
    fn on_fixed_update(&mut self, ctx: &mut Context<'_>, _dt: f32) -> HookResult {
        let heading = ctx.get_component::<Transform>().map_or(0.0, |t| t.rotation);
        if let Some(body) = ctx.get_component_mut::<Rigidbody>() {
            body.add_force(direction(heading) * self.thrust);
            body.add_torque(self.turn);
        }
        Ok(())
    }
}

impl Component for Autopilot {
    const TYPE_NAME: &'static str = "Autopilot";

    fn options() -> Options {
        Options::new()
            .requires::<Rigidbody>()
            .hooks(Hooks::FIXED_UPDATE)
            .order(-10)
    }
}

/// Keeps its transform on screen, wrapping at the edges.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Wrap;

impl Behaviour for Wrap {
    fn on_fixed_update(&mut self, ctx: &mut Context<'_>, _dt: f32) -> HookResult {
        if let Some(transform) = ctx.get_component_mut::<Transform>() {
            transform.position.x = transform.position.x.rem_euclid(WIDTH);
            transform.position.y = transform.position.y.rem_euclid(HEIGHT);
        }
        Ok(())
    }
}

impl Component for Wrap {
    const TYPE_NAME: &'static str = "Wrap";

    fn options() -> Options {
        Options::new().requires::<Transform>().hooks(Hooks::FIXED_UPDATE).order(50)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ship {
    pub hits: u32,
}

impl Behaviour for Ship {
    fn on_awake(&mut self, ctx: &mut Context<'_>) -> HookResult {
        if let Some(transform) = ctx.get_component_mut::<Transform>() {
            transform.position = center();
            transform.dimensions = Rect::centered(30.0, 30.0);
        }
        if let Some(body) = ctx.get_component_mut::<Rigidbody>() {
            body.friction = 0.5;
            body.max_velocity = Some(120.0);
            body.max_angular_velocity = Some(1.5);
        }
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context<'_>, surface: &mut dyn Surface) -> HookResult {
        if let Some(transform) = ctx.get_component::<Transform>() {
            surface.save();
            surface.translate(transform.position);
            surface.rotate(transform.rotation);
            surface.arc(Vec2::ZERO, transform.dimensions.width / 2.0, 0.0, TAU, Color::WHITE);
            surface.restore();
        }
        Ok(())
    }

    fn on_collision_enter(&mut self, ctx: &mut Context<'_>, collision: &Collision) -> HookResult {
        let asteroid = ctx
            .app()
            .tag_of(collision.other)
            .is_some_and(|tag| has_label(tag, "asteroid"));
        if !asteroid {
            return Ok(());
        }

        self.hits += 1;
        if let Some(score) = ctx.get_service_mut::<Score>() {
            score.hits += 1;
        }
        info!(ship = %collision.owner, asteroid = %collision.other, hits = self.hits, "ship hit");
        ctx.emit(
            "ship.hit",
            &json!({ "asteroid": collision.other, "hits": self.hits }),
        )?;
        Ok(())
    }
}

impl EntityType for Ship {
    const TYPE_NAME: &'static str = "Ship";

    fn options() -> Options {
        Options::new()
            .component::<Transform>()
            .component::<Rigidbody>()
            .component::<CircleCollider>()
            .component::<Autopilot>()
            .component::<Wrap>()
            .service::<Score>()
            .hooks(Hooks::AWAKE | Hooks::UPDATE | Hooks::COLLISION)
            .tag("player|ship")
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Asteroid;

impl Behaviour for Asteroid {
    fn on_update(&mut self, ctx: &mut Context<'_>, surface: &mut dyn Surface) -> HookResult {
        if let Some(transform) = ctx.get_component::<Transform>() {
            let bounds = transform.dimensions.translated(transform.position);
            surface.fill_rect(bounds, Color::rgb(140, 120, 100));
        }
        Ok(())
    }
}

impl EntityType for Asteroid {
    const TYPE_NAME: &'static str = "Asteroid";

    fn options() -> Options {
        Options::new()
            .component::<Transform>()
            .component::<Rigidbody>()
            .component::<RectCollider>()
            .component::<Wrap>()
            .hooks(Hooks::UPDATE)
            .tag("enemy:asteroid")
    }
}

/// Spawns `count` asteroids on a ring around the centre, drifting inwards.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AsteroidField {
    pub count: u32,
    pub radius: f32,
    pub speed: f32,
}

impl Default for AsteroidField {
    fn default() -> Self {
        Self {
            count: 8,
            radius: 260.0,
            speed: 25.0,
        }
    }
}

impl Behaviour for AsteroidField {
    fn on_start(&mut self, ctx: &mut Context<'_>) -> HookResult {
        for i in 0..self.count {
            let angle = TAU * i as f32 / self.count as f32;
            let position = center() + direction(angle) * self.radius;
            let velocity = -direction(angle + 0.3) * self.speed;
            let size = 20.0 + 10.0 * (i % 3) as f32;
            ctx.instantiate(
                Spawn::of::<Asteroid>()
                    .with(
                        ComponentRequest::of::<Transform>()
                            .set("position", json!(position))
                            .set("dimensions", json!(Rect::centered(size, size))),
                    )
                    .with(ComponentRequest::of::<Rigidbody>().set("velocity", json!(velocity))),
            )?;
        }
        info!(count = self.count, "asteroid field spawned");
        Ok(())
    }
}

impl EntityType for AsteroidField {
    const TYPE_NAME: &'static str = "AsteroidField";

    fn options() -> Options {
        Options::new().hooks(Hooks::START)
    }
}

#[cfg(test)]
mod tests {
    use arcade_core::{App, CommandBuffer, DrawCommand};

    use super::*;

    fn app() -> App {
        let mut metadata = Metadata::new();
        arcade_physics::register(&mut metadata).unwrap();
        register(&mut metadata).unwrap();
        App::new(metadata)
    }

    #[test]
    fn test_field_spawns_asteroids() {
        let mut app = app();
        app.instantiate(Spawn::of::<AsteroidField>().set("count", json!(5)))
            .unwrap();
        assert_eq!(app.entities_tagged("asteroid").len(), 5);
        assert_eq!(app.find::<RectCollider>().len(), 5);
    }

    #[test]
    fn test_ship_counts_asteroid_hits() {
        let mut app = app();
        let ship = app.instantiate(Spawn::of::<Ship>()).unwrap();
        app.instantiate(
            Spawn::of::<Asteroid>().with(
                ComponentRequest::of::<Transform>()
                    .set("position", json!(center()))
                    .set("dimensions", json!(Rect::centered(20.0, 20.0))),
            ),
        )
        .unwrap();

        app.fixed_tick(0.05).unwrap();

        assert_eq!(app.behaviour::<Ship>(ship).unwrap().hits, 1);
        assert_eq!(app.get_service::<Score>(ship).unwrap().hits, 1);
        let events = app.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic, "ship.hit");
        assert_eq!(events[0].source, Some(ship));
    }

    #[test]
    fn test_wrap_keeps_objects_on_screen() {
        let mut app = app();
        let asteroid = app
            .instantiate(
                Spawn::of::<Asteroid>()
                    .with(ComponentRequest::of::<Transform>().set("position", json!([799.0, 10.0])))
                    .with(ComponentRequest::of::<Rigidbody>().set("velocity", json!([20.0, -40.0]))),
            )
            .unwrap();

        app.fixed_tick(0.5).unwrap();

        let position = app.get_component::<Transform>(asteroid).unwrap().position;
        assert!((0.0..WIDTH).contains(&position.x));
        assert!((0.0..HEIGHT).contains(&position.y));
    }

    #[test]
    fn test_render_draws_every_object() {
        let mut app = app();
        app.instantiate(Spawn::of::<Ship>()).unwrap();
        app.instantiate(Spawn::of::<AsteroidField>().set("count", json!(3)))
            .unwrap();
        let mut surface = CommandBuffer::new(WIDTH, HEIGHT);

        app.render_tick(&mut surface).unwrap();

        let commands = surface.commands();
        assert_eq!(commands[0], DrawCommand::Clear);
        let rects = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillRect { .. }))
            .count();
        let arcs = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Arc { .. }))
            .count();
        assert_eq!(rects, 3);
        assert_eq!(arcs, 1);
    }
}
