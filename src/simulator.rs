//! Local process simulator.
//!
//! Stands in for the fill controller while no controller is reachable.  Two
//! periodic timers drive it:
//!
//! ```text
//!   temperature timer (2 s)  ──▶ bounded random walk of the tank temperature
//!   fill timer      (100 ms) ──▶ +coarse/fine rate on the active source,
//!                                then the FSM evaluates coarse→fine and stop
//! ```
//!
//! The simulator holds no process state of its own.  It reads and writes
//! through the [`SimulatedPlant`] port, so suspending and resuming it
//! never loses or resets a fill in progress.

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::app::ports::{SimulatedPlant, TimerDelegate};
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::fsm::FillMode;
use crate::timer::{TimerId, TimerSet};

/// Rates, periods and bounds of the simulated process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub fill_tick_ms: u64,
    pub coarse_rate_kg: f64,
    pub fine_rate_kg: f64,
    pub temperature_tick_ms: u64,
    pub temperature_step_c: f64,
    pub temperature_min_c: f64,
    pub temperature_max_c: f64,
}

impl From<&SystemConfig> for SimParams {
    fn from(c: &SystemConfig) -> Self {
        Self {
            fill_tick_ms: u64::from(c.fill_tick_ms),
            coarse_rate_kg: c.coarse_rate_kg,
            fine_rate_kg: c.fine_rate_kg,
            temperature_tick_ms: u64::from(c.temperature_tick_ms),
            temperature_step_c: c.temperature_step_c,
            temperature_min_c: c.temperature_min_c,
            temperature_max_c: c.temperature_max_c,
        }
    }
}

impl SimParams {
    /// Weight added per fill tick in `mode`.
    pub fn rate(&self, mode: FillMode) -> f64 {
        match mode {
            FillMode::Idle => 0.0,
            FillMode::Coarse => self.coarse_rate_kg,
            FillMode::Fine => self.fine_rate_kg,
        }
    }
}

/// Timer-driven stand-in for the absent physical process.
pub struct LocalSimulator {
    params: SimParams,
    timers: TimerSet,
    temperature_timer: TimerId,
    fill_timer: TimerId,
    rng: ChaCha8Rng,
    running: bool,
}

impl LocalSimulator {
    /// Build a running simulator.  `seed = None` seeds from the OS.
    pub fn new(params: SimParams, seed: Option<u64>) -> Result<Self> {
        let mut timers = TimerSet::new();
        let temperature_timer = timers
            .add("temperature", params.temperature_tick_ms)
            .ok_or(Error::Config("temperature_tick_ms must be non-zero"))?;
        let fill_timer = timers
            .add("fill", params.fill_tick_ms)
            .ok_or(Error::Config("fill_tick_ms must be non-zero"))?;
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            params,
            timers,
            temperature_timer,
            fill_timer,
            rng,
            running: true,
        })
    }

    pub fn from_config(config: &SystemConfig) -> Result<Self> {
        Self::new(SimParams::from(config), config.sim_seed)
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop both timers as a unit.
    pub fn suspend(&mut self) {
        if !self.running {
            return;
        }
        self.timers.set_enabled(self.temperature_timer, false);
        self.timers.set_enabled(self.fill_timer, false);
        self.running = false;
        info!("Simulator: suspended");
    }

    /// Restart both timers with a fresh phase.  Weights are untouched.
    pub fn resume(&mut self) {
        if self.running {
            return;
        }
        for id in [self.temperature_timer, self.fill_timer] {
            self.timers.reset_phase(id);
            self.timers.set_enabled(id, true);
        }
        self.running = true;
        info!("Simulator: resumed");
    }

    /// Advance simulated time.  Returns the number of timer fires.
    pub fn advance(&mut self, elapsed_ms: u64, plant: &mut impl SimulatedPlant) -> usize {
        if !self.running {
            return 0;
        }
        let Self {
            params,
            timers,
            temperature_timer,
            fill_timer,
            rng,
            ..
        } = self;
        let mut driver = PlantDriver {
            plant,
            rng,
            params,
            temperature_timer: *temperature_timer,
            fill_timer: *fill_timer,
        };
        timers.advance(elapsed_ms, &mut driver)
    }
}

// ───────────────────────────────────────────────────────────────
// Timer delegate
// ───────────────────────────────────────────────────────────────

struct PlantDriver<'a, P: SimulatedPlant> {
    plant: &'a mut P,
    rng: &'a mut ChaCha8Rng,
    params: &'a SimParams,
    temperature_timer: TimerId,
    fill_timer: TimerId,
}

impl<P: SimulatedPlant> PlantDriver<'_, P> {
    fn drift_temperature(&mut self) {
        let half = self.params.temperature_step_c / 2.0;
        let step = self.rng.gen_range(-half..=half);
        let next = (self.plant.temperature() + step)
            .clamp(self.params.temperature_min_c, self.params.temperature_max_c);
        self.plant.set_temperature(next);
    }

    fn advance_fill(&mut self) {
        let mode = self.plant.fill_mode();
        let rate = self.params.rate(mode);
        if rate > 0.0 {
            debug!("Simulator: +{:.2} kg ({})", rate, mode);
            self.plant.add_fill_weight(rate);
        }
    }
}

impl<P: SimulatedPlant> TimerDelegate for PlantDriver<'_, P> {
    fn on_timer_fired(&mut self, timer: TimerId) {
        if timer == self.temperature_timer {
            self.drift_temperature();
        } else if timer == self.fill_timer {
            self.advance_fill();
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
