//! Engine runtime settings.
//!
//! These control the host loop and logging, not the graph or the state
//! machine. They live in the `[engine]` table of a session file so a
//! session can carry its own tick rate and run duration.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default engine tick rate in Hz
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Highest accepted tick rate in Hz
pub const MAX_TICK_RATE_HZ: u32 = 10_000;

/// Default `tracing` filter directive
pub const DEFAULT_LOG_FILTER: &str = "info,neurograph=debug";

/// Settings for the engine runner and logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Host loop rate in Hz
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    /// `tracing` filter directive; `RUST_LOG` takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    /// Directory for daily rolling log files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Stop the session after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_duration_secs: Option<f64>,

    /// Stop the session as soon as an exit state becomes active
    #[serde(default = "default_true")]
    pub stop_on_exit_state: bool,
}

fn default_tick_rate_hz() -> u32 {
    DEFAULT_TICK_RATE_HZ
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            log_filter: None,
            log_dir: None,
            run_duration_secs: None,
            stop_on_exit_state: true,
        }
    }
}

impl EngineConfig {
    /// Effective log filter directive
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Run duration, if a positive finite one is configured
    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration_secs
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Tick interval at the configured rate
    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.tick_rate_hz.max(1) as u64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(EngineError::Config(format!(
                "tick_rate_hz must be in 1..={}, got {}",
                MAX_TICK_RATE_HZ, self.tick_rate_hz
            )));
        }
        if let Some(secs) = self.run_duration_secs {
            if secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() {
                return Err(EngineError::Config(format!(
                    "run_duration_secs must be a positive representable duration, got {}",
                    secs
                )));
            }
        }
        Ok(())
    }
}
