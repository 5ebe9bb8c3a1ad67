//! System configuration parameters
//!
//! All tunable parameters for the filling console.  Every field has a
//! default, so a JSON config file only needs to name what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Targets;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Controller link ---
    /// `host:port` of the fill controller's REST API
    pub controller_addr: String,
    /// Status poll interval (milliseconds)
    pub poll_interval_ms: u32,
    /// Connect / read / write timeout for one request (milliseconds)
    pub request_timeout_ms: u32,
    /// Consecutive failed polls before the link is declared down
    pub disconnect_after_failures: u32,

    // --- Fill process ---
    /// Targets in force at startup
    pub default_targets: Targets,
    /// Fraction of a source's target at which coarse fill drops to fine
    pub fine_switch_fraction: f64,
    /// Relative deviation of the previous fill that requires confirmation
    pub deviation_tolerance: f64,
    /// IBC capacity (kg), used for the fill gauge
    pub max_capacity_kg: f64,

    // --- Local simulation ---
    /// Fill-advance timer period (milliseconds)
    pub fill_tick_ms: u32,
    /// Weight added per fill tick in coarse mode (kg)
    pub coarse_rate_kg: f64,
    /// Weight added per fill tick in fine mode (kg)
    pub fine_rate_kg: f64,
    /// Temperature drift timer period (milliseconds)
    pub temperature_tick_ms: u32,
    /// Full width of one random-walk temperature step (°C)
    pub temperature_step_c: f64,
    /// Temperature at startup (°C)
    pub initial_temperature_c: f64,
    /// Lower bound of the simulated temperature (°C)
    pub temperature_min_c: f64,
    /// Upper bound of the simulated temperature (°C)
    pub temperature_max_c: f64,
    /// Seed for the simulator RNG; `None` seeds from the OS
    pub sim_seed: Option<u64>,

    // --- Alarms ---
    /// Tank temperature above which a warning is raised (°C)
    pub temperature_warning_c: f64,

    // --- Timing ---
    /// Console main loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Controller link
            controller_addr: "127.0.0.1:5000".to_string(),
            poll_interval_ms: 200,
            request_timeout_ms: 1000,
            disconnect_after_failures: 1,

            // Fill process
            default_targets: Targets::default(),
            fine_switch_fraction: 0.9,
            deviation_tolerance: 0.05,
            max_capacity_kg: 1000.0,

            // Local simulation
            fill_tick_ms: 100,
            coarse_rate_kg: 5.0,
            fine_rate_kg: 0.5,
            temperature_tick_ms: 2000,
            temperature_step_c: 0.2,
            initial_temperature_c: 22.5,
            temperature_min_c: -20.0,
            temperature_max_c: 80.0,
            sim_seed: None,

            // Alarms
            temperature_warning_c: 30.0,

            // Timing
            control_loop_interval_ms: 50,
        }
    }
}

impl SystemConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the process logic meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.controller_addr.trim().is_empty() {
            return Err(Error::Config("controller_addr must not be empty"));
        }
        if self.poll_interval_ms == 0 || self.fill_tick_ms == 0 || self.temperature_tick_ms == 0 {
            return Err(Error::Config("timer periods must be non-zero"));
        }
        if self.control_loop_interval_ms == 0 {
            return Err(Error::Config("control_loop_interval_ms must be non-zero"));
        }
        if self.disconnect_after_failures == 0 {
            return Err(Error::Config("disconnect_after_failures must be at least 1"));
        }
        if !self.default_targets.is_valid() {
            return Err(Error::Config("default targets must be non-negative"));
        }
        if !(self.fine_switch_fraction > 0.0 && self.fine_switch_fraction <= 1.0) {
            return Err(Error::Config("fine_switch_fraction must be in (0, 1]"));
        }
        if !(self.deviation_tolerance >= 0.0 && self.deviation_tolerance.is_finite()) {
            return Err(Error::Config("deviation_tolerance must be non-negative"));
        }
        if !(self.coarse_rate_kg > 0.0 && self.fine_rate_kg > 0.0) {
            return Err(Error::Config("fill rates must be positive"));
        }
        if self.fine_rate_kg > self.coarse_rate_kg {
            return Err(Error::Config("fine_rate_kg must not exceed coarse_rate_kg"));
        }
        if !(self.temperature_step_c >= 0.0) {
            return Err(Error::Config("temperature_step_c must be non-negative"));
        }
        if !(self.temperature_min_c <= self.initial_temperature_c
            && self.initial_temperature_c <= self.temperature_max_c)
        {
            return Err(Error::Config(
                "initial_temperature_c must lie within the simulated temperature band",
            ));
        }
        if !(self.max_capacity_kg > 0.0) {
            return Err(Error::Config("max_capacity_kg must be positive"));
        }
        Ok(())
    }
}
