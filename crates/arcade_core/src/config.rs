//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// What happens when a lifecycle hook returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookFailurePolicy {
    /// Log the failure and carry on with the remaining entities. One broken
    /// entity cannot halt the simulation.
    #[default]
    Isolate,
    /// Abort the current operation and return the error to the caller.
    Propagate,
}

/// Rates and limits for the two tick loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed (physics) ticks per second.
    pub fixed_rate: f64,
    /// Render ticks per second.
    pub render_rate: f64,
    /// Stop after this many fixed ticks (0 = unlimited).
    pub max_fixed_ticks: u64,
    /// Upper bound on the delta time handed to a fixed tick, in seconds.
    pub max_delta: f32,
    pub hook_failures: HookFailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_rate: 18.0,
            render_rate: 6.0,
            max_fixed_ticks: 0,
            max_delta: 0.25,
            hook_failures: HookFailurePolicy::default(),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_fixed_rate(mut self, rate: f64) -> Self {
        self.fixed_rate = rate;
        self
    }

    #[must_use]
    pub fn with_render_rate(mut self, rate: f64) -> Self {
        self.render_rate = rate;
        self
    }

    #[must_use]
    pub fn with_max_fixed_ticks(mut self, ticks: u64) -> Self {
        self.max_fixed_ticks = ticks;
        self
    }

    #[must_use]
    pub fn with_hook_failures(mut self, policy: HookFailurePolicy) -> Self {
        self.hook_failures = policy;
        self
    }

    /// Time between fixed ticks.
    pub fn fixed_period(&self) -> Result<Duration, RuntimeError> {
        period("fixed_rate", self.fixed_rate)
    }

    pub fn render_period(&self) -> Result<Duration, RuntimeError> {
        period("render_rate", self.render_rate)
    }

    /// Check every rate and limit before the loops start.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        self.fixed_period()?;
        self.render_period()?;
        if !(self.max_delta.is_finite() && self.max_delta > 0.0) {
            return Err(RuntimeError::InvalidConfig {
                field: "max_delta",
                value: f64::from(self.max_delta),
                reason: "must be a positive number of seconds",
            });
        }
        Ok(())
    }
}

/// The period of a loop running `rate` times per second. Rates so high that
/// the period rounds to zero are rejected along with non-positive ones.
fn period(field: &'static str, rate: f64) -> Result<Duration, RuntimeError> {
    let invalid = |reason| RuntimeError::InvalidConfig {
        field,
        value: rate,
        reason,
    };
    if !(rate.is_finite() && rate > 0.0) {
        return Err(invalid("must be a positive, finite rate"));
    }
    Duration::try_from_secs_f64(rate.recip())
        .ok()
        .filter(|period| !period.is_zero())
        .ok_or_else(|| invalid("period is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.fixed_rate, 18.0);
        assert_eq!(config.render_rate, 6.0);
        assert_eq!(config.hook_failures, HookFailurePolicy::Isolate);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "fixed_rate": 60.0, "hook_failures": "propagate" }"#).unwrap();
        assert_eq!(config.fixed_rate, 60.0);
        assert_eq!(config.render_rate, 6.0);
        assert_eq!(config.hook_failures, HookFailurePolicy::Propagate);
    }

    #[test]
    fn test_periods() {
        let config = SchedulerConfig::default().with_fixed_rate(50.0);
        assert_eq!(config.fixed_period().unwrap(), Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unusable_rates() {
        for rate in [0.0, -5.0, f64::NAN, f64::INFINITY, 1e300] {
            let config = SchedulerConfig::default().with_fixed_rate(rate);
            assert!(
                matches!(
                    config.validate(),
                    Err(RuntimeError::InvalidConfig { field: "fixed_rate", .. })
                ),
                "fixed rate {rate} accepted"
            );
        }

        let config = SchedulerConfig::default().with_render_rate(0.0);
        assert!(matches!(
            config.render_period(),
            Err(RuntimeError::InvalidConfig { field: "render_rate", .. })
        ));

        let config = SchedulerConfig {
            max_delta: 0.0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RuntimeError::InvalidConfig { field: "max_delta", .. })
        ));
    }
}
