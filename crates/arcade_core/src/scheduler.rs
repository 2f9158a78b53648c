//! Fixed and render tick loops.
//!
//! Two independent tokio intervals drive the [`App`]: the fixed tick at
//! [`SchedulerConfig::fixed_rate`] and the render tick at
//! [`SchedulerConfig::render_rate`]. Both run on the caller's task, so hooks
//! never execute concurrently. When both are due, the fixed tick goes first.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::app::App;
use crate::config::SchedulerConfig;
use crate::error::RuntimeError;
use crate::surface::Surface;

/// Drives an [`App`] at the configured rates.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    fixed_ticks: u64,
    render_ticks: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            fixed_ticks: 0,
            render_ticks: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Fixed ticks run so far.
    #[must_use]
    pub fn fixed_ticks(&self) -> u64 {
        self.fixed_ticks
    }

    #[must_use]
    pub fn render_ticks(&self) -> u64 {
        self.render_ticks
    }

    /// Run one fixed tick with the given delta time.
    pub fn fixed_step(&mut self, app: &mut App, dt: f32) -> Result<(), RuntimeError> {
        self.fixed_ticks += 1;
        let start = Instant::now();
        debug!(tick = self.fixed_ticks, dt, "fixed tick");

        app.fixed_tick(dt)?;

        if let Ok(budget) = self.config.fixed_period() {
            over_budget("fixed", self.fixed_ticks, start, budget);
        }
        Ok(())
    }

    /// Run one render tick against `surface`.
    pub fn render_step(
        &mut self,
        app: &mut App,
        surface: &mut dyn Surface,
    ) -> Result<(), RuntimeError> {
        self.render_ticks += 1;
        let start = Instant::now();

        app.render_tick(surface)?;

        if let Ok(budget) = self.config.render_period() {
            over_budget("render", self.render_ticks, start, budget);
        }
        Ok(())
    }

    /// Run both loops until `shutdown` resolves, the fixed tick limit is
    /// reached, or a hook error propagates. Fails up front on an invalid
    /// configuration.
    ///
    /// The delta time handed to each fixed tick is the measured time since
    /// the previous one, capped at [`SchedulerConfig::max_delta`]. The first
    /// tick gets the nominal period.
    pub async fn run<F>(
        &mut self,
        app: &mut App,
        surface: &mut dyn Surface,
        shutdown: F,
    ) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()>,
    {
        self.config.validate()?;
        app.set_hook_failures(self.config.hook_failures);

        let fixed_period = self.config.fixed_period()?;
        let mut fixed = interval(fixed_period);
        fixed.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut render = interval(self.config.render_period()?);
        render.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        let mut last_fixed: Option<Instant> = None;

        info!(
            fixed_rate = self.config.fixed_rate,
            render_rate = self.config.render_rate,
            max_fixed_ticks = self.config.max_fixed_ticks,
            "starting scheduler"
        );

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!(fixed_ticks = self.fixed_ticks, "shutdown requested");
                    break;
                }
                now = fixed.tick() => {
                    let elapsed = last_fixed.map_or(fixed_period, |last| now - last);
                    last_fixed = Some(now);
                    let dt = elapsed.as_secs_f32().min(self.config.max_delta);

                    self.fixed_step(app, dt)?;

                    let limit = self.config.max_fixed_ticks;
                    if limit > 0 && self.fixed_ticks >= limit {
                        info!(fixed_ticks = self.fixed_ticks, "tick limit reached");
                        break;
                    }
                }
                _ = render.tick() => {
                    self.render_step(app, surface)?;
                }
            }
        }

        info!(
            fixed_ticks = self.fixed_ticks,
            render_ticks = self.render_ticks,
            "scheduler stopped"
        );
        Ok(())
    }
}

fn over_budget(loop_name: &'static str, tick: u64, start: Instant, budget: Duration) {
    let elapsed = start.elapsed();
    if elapsed > budget {
        warn!(
            loop_name,
            tick,
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64,
            "tick exceeded time budget"
        );
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::config::HookFailurePolicy;
    use crate::context::Context;
    use crate::metadata::{Hooks, Metadata, Options};
    use crate::object::{Behaviour, Component, HookResult};
    use crate::spawn::Spawn;
    use crate::surface::CommandBuffer;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Clock {
        elapsed: f32,
        frames: u32,
    }

    impl Behaviour for Clock {
        fn on_fixed_update(&mut self, _ctx: &mut Context<'_>, dt: f32) -> HookResult {
            self.elapsed += dt;
            Ok(())
        }

        fn on_update(&mut self, _ctx: &mut Context<'_>, _surface: &mut dyn Surface) -> HookResult {
            self.frames += 1;
            Ok(())
        }
    }

    impl Component for Clock {
        const TYPE_NAME: &'static str = "Clock";

        fn options() -> Options {
            Options::new().hooks(Hooks::FIXED_UPDATE | Hooks::UPDATE)
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Faulty;

    impl Behaviour for Faulty {
        fn on_fixed_update(&mut self, _ctx: &mut Context<'_>, _dt: f32) -> HookResult {
            Err(anyhow!("faulty"))
        }
    }

    impl Component for Faulty {
        const TYPE_NAME: &'static str = "Faulty";

        fn options() -> Options {
            Options::new().hooks(Hooks::FIXED_UPDATE)
        }
    }

    fn app() -> App {
        let mut meta = Metadata::new();
        meta.define_component::<Clock>().unwrap();
        meta.define_component::<Faulty>().unwrap();
        App::new(meta)
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_tick_limit() {
        let mut app = app();
        let entity = app.instantiate(Spawn::bare().with_component::<Clock>()).unwrap();
        let mut surface = CommandBuffer::new(320.0, 240.0);
        let config = SchedulerConfig::default()
            .with_fixed_rate(10.0)
            .with_render_rate(5.0)
            .with_max_fixed_ticks(5);
        let mut scheduler = Scheduler::new(config);

        scheduler
            .run(&mut app, &mut surface, std::future::pending())
            .await
            .unwrap();

        assert_eq!(scheduler.fixed_ticks(), 5);
        assert!(scheduler.render_ticks() >= 1);
        let clock = app.get_component::<Clock>(entity).unwrap();
        assert!((clock.elapsed - 0.5).abs() < 1e-3, "elapsed {}", clock.elapsed);
        assert_eq!(u64::from(clock.frames), scheduler.render_ticks());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let mut app = app();
        let mut surface = CommandBuffer::new(320.0, 240.0);
        let mut scheduler = Scheduler::new(SchedulerConfig::default().with_fixed_rate(10.0));

        scheduler
            .run(
                &mut app,
                &mut surface,
                tokio::time::sleep(Duration::from_millis(250)),
            )
            .await
            .unwrap();

        assert_eq!(scheduler.fixed_ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_propagates_hook_errors() {
        let mut app = app();
        app.instantiate(Spawn::bare().with_component::<Faulty>())
            .unwrap();
        let mut surface = CommandBuffer::new(320.0, 240.0);
        let config = SchedulerConfig::default()
            .with_max_fixed_ticks(3)
            .with_hook_failures(HookFailurePolicy::Propagate);
        let mut scheduler = Scheduler::new(config);

        let err = scheduler
            .run(&mut app, &mut surface, std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Hook { .. }));
        assert_eq!(scheduler.fixed_ticks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_failures_keep_running() {
        let mut app = app();
        app.instantiate(Spawn::bare().with_component::<Faulty>())
            .unwrap();
        let mut surface = CommandBuffer::new(320.0, 240.0);
        let mut scheduler = Scheduler::new(SchedulerConfig::default().with_max_fixed_ticks(3));

        scheduler
            .run(&mut app, &mut surface, std::future::pending())
            .await
            .unwrap();
        assert_eq!(scheduler.fixed_ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_rejects_zero_rate() {
        let mut app = app();
        let mut surface = CommandBuffer::new(320.0, 240.0);
        let mut scheduler = Scheduler::new(SchedulerConfig::default().with_render_rate(0.0));

        let err = scheduler
            .run(&mut app, &mut surface, std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig { field: "render_rate", .. }));
        assert_eq!(scheduler.fixed_ticks(), 0);
    }

    #[test]
    fn test_manual_steps() {
        let mut app = app();
        let entity = app.instantiate(Spawn::bare().with_component::<Clock>()).unwrap();
        let mut surface = CommandBuffer::new(320.0, 240.0);
        let mut scheduler = Scheduler::new(SchedulerConfig::default());

        scheduler.fixed_step(&mut app, 0.1).unwrap();
        scheduler.fixed_step(&mut app, 0.1).unwrap();
        scheduler.render_step(&mut app, &mut surface).unwrap();

        assert_eq!(scheduler.fixed_ticks(), 2);
        assert_eq!(scheduler.render_ticks(), 1);
        let clock = app.get_component::<Clock>(entity).unwrap();
        assert!((clock.elapsed - 0.2).abs() < 1e-6);
        assert_eq!(clock.frames, 1);
    }
}
