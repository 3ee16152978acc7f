//! Configuration for the Filament runtime
//!
//! Explicit defaults, validated against the limits in [`crate::constants`].

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum live actor instances in this process
    #[serde(default = "default_max_live_actors")]
    pub max_live_actors_count: usize,

    /// Idle time before an instance is deactivated (milliseconds)
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Interval between idle-deactivation sweeps (milliseconds)
    #[serde(default = "default_idle_sweep_interval_ms")]
    pub idle_sweep_interval_ms: u64,

    /// Whether the background idle sweeper is started with the runtime
    #[serde(default = "default_idle_sweep_enabled")]
    pub idle_sweep_enabled: bool,
}

fn default_max_live_actors() -> usize {
    100_000
}

fn default_idle_timeout_ms() -> u64 {
    ACTOR_IDLE_TIMEOUT_MS_DEFAULT
}

fn default_idle_sweep_interval_ms() -> u64 {
    IDLE_SWEEP_INTERVAL_MS_DEFAULT
}

fn default_idle_sweep_enabled() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_live_actors_count: default_max_live_actors(),
            idle_timeout_ms: default_idle_timeout_ms(),
            idle_sweep_interval_ms: default_idle_sweep_interval_ms(),
            idle_sweep_enabled: default_idle_sweep_enabled(),
        }
    }
}

impl RuntimeConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_live_actors_count == 0 || self.max_live_actors_count > ACTOR_LIVE_COUNT_MAX {
            return Err(Error::InvalidConfiguration {
                field: "max_live_actors_count".into(),
                reason: format!(
                    "{} outside range 1..={}",
                    self.max_live_actors_count, ACTOR_LIVE_COUNT_MAX
                ),
            });
        }

        if self.idle_timeout_ms == 0 || self.idle_timeout_ms > ACTOR_IDLE_TIMEOUT_MS_MAX {
            return Err(Error::InvalidConfiguration {
                field: "idle_timeout_ms".into(),
                reason: format!(
                    "{} outside range 1..={}",
                    self.idle_timeout_ms, ACTOR_IDLE_TIMEOUT_MS_MAX
                ),
            });
        }

        if self.idle_sweep_interval_ms == 0 {
            return Err(Error::InvalidConfiguration {
                field: "idle_sweep_interval_ms".into(),
                reason: "must be positive".into(),
            });
        }

        Ok(())
    }
}
