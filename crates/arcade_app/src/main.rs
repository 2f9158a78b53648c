//! # arcade_app — headless demo host
//!
//! Registers the physics components and the demo game types, boots a ship
//! and an asteroid field, then runs the fixed and render loops against a
//! [`CommandBuffer`] until Ctrl-C or the configured tick limit.
//!
//! ## Configuration
//!
//! Scheduler settings come from an optional JSON file (`--config`), then any
//! command-line overrides. Log verbosity follows `RUST_LOG`.

mod game;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use arcade_core::{App, CommandBuffer, Metadata, Scheduler, SchedulerConfig, Spawn};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use game::{AsteroidField, HEIGHT, Score, Ship, WIDTH};

#[derive(Parser)]
#[command(name = "arcade_app", about = "Headless arcade demo: a ship in an asteroid field")]
struct Args {
    /// JSON scheduler configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed (physics) ticks per second
    #[arg(long)]
    fixed_hz: Option<f64>,

    /// Render ticks per second
    #[arg(long)]
    render_hz: Option<f64>,

    /// Stop after this many fixed ticks (0 = run until Ctrl-C)
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Number of asteroids to spawn
    #[arg(short, long, default_value_t = 8)]
    asteroids: u32,
}

fn load_config(path: Option<&Path>) -> Result<SchedulerConfig> {
    let Some(path) = path else {
        return Ok(SchedulerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "cannot listen for Ctrl-C, running until the tick limit");
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("arcade_app=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(rate) = args.fixed_hz {
        config.fixed_rate = rate;
    }
    if let Some(rate) = args.render_hz {
        config.render_rate = rate;
    }
    if let Some(ticks) = args.max_ticks {
        config.max_fixed_ticks = ticks;
    }
    config.validate().context("invalid scheduler configuration")?;

    let mut metadata = Metadata::new();
    arcade_physics::register(&mut metadata)?;
    game::register(&mut metadata)?;
    info!(types = metadata.len(), "metadata registered");

    let mut app = App::new(metadata).with_hook_failures(config.hook_failures);
    app.bootstrap::<Ship>();
    app.boot()?;
    app.instantiate(Spawn::of::<AsteroidField>().set("count", json!(args.asteroids)))?;
    info!(entities = app.entity_count(), components = app.component_count(), "world ready");

    let mut surface = CommandBuffer::new(WIDTH, HEIGHT);
    let mut scheduler = Scheduler::new(config);
    scheduler.run(&mut app, &mut surface, shutdown_signal()).await?;

    let events = app.drain_events();
    let hits = app.service::<Score>().map_or(0, |score| score.hits);
    info!(
        fixed_ticks = scheduler.fixed_ticks(),
        render_ticks = scheduler.render_ticks(),
        events = events.len(),
        hits,
        last_frame = surface.commands().len(),
        "arcade demo finished"
    );
    Ok(())
}
