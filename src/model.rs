//! Process data model shared by the FSM, the simulator and the gateway.
//!
//! [`ProcessState`] is the single operator-facing view of the station.  Only
//! [`FillService`](crate::app::service::FillService) writes it, through the
//! FSM handlers or the telemetry mirror, never by ad hoc field writes from
//! adapters.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::fsm::FillMode;

// ---------------------------------------------------------------------------
// Sources and actuators
// ---------------------------------------------------------------------------

/// One of the two material sources feeding the IBC.
///
/// "No source" is expressed as `Option<FillSource>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillSource {
    /// Liquid tank: pump + solenoid valve.
    Tank,
    /// Dry-bulk silo: damper.
    Silo,
}

impl FillSource {
    pub const ALL: [FillSource; 2] = [FillSource::Tank, FillSource::Silo];

    /// The other source (used for mutual-exclusion checks).
    pub fn other(self) -> Self {
        match self {
            Self::Tank => Self::Silo,
            Self::Silo => Self::Tank,
        }
    }

    /// Lowercase wire name, as used in controller URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tank => "tank",
            Self::Silo => "silo",
        }
    }
}

impl fmt::Display for FillSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display status of a single actuator.
///
/// [`ProcessState`] only ever stores `Running` or `Idle`.  `Stopped` is the
/// transient "just turned off by command" value produced by the dashboard
/// view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentStatus {
    Running,
    Stopped,
    #[default]
    Idle,
}

impl EquipmentStatus {
    pub fn from_energised(on: bool) -> Self {
        if on { Self::Running } else { Self::Idle }
    }

    pub fn is_active(self) -> bool {
        self != Self::Idle
    }
}

/// Status of every actuator on the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actuators {
    /// Tank transfer pump.
    pub pump: EquipmentStatus,
    /// Tank solenoid valve.
    pub valve: EquipmentStatus,
    /// Silo 5/2 damper.
    pub damper: EquipmentStatus,
    /// IBC vibrator, toggled by the operator during a fill.  Belongs to
    /// neither source.
    pub vibrator: EquipmentStatus,
}

impl Actuators {
    /// All actuators quiescent.
    pub fn all_idle() -> Self {
        Self::default()
    }

    /// The actuator set that feeds `source`, energised.
    pub fn feeding(source: FillSource) -> Self {
        match source {
            FillSource::Tank => Self {
                pump: EquipmentStatus::Running,
                valve: EquipmentStatus::Running,
                damper: EquipmentStatus::Idle,
                vibrator: EquipmentStatus::Idle,
            },
            FillSource::Silo => Self {
                pump: EquipmentStatus::Idle,
                valve: EquipmentStatus::Idle,
                damper: EquipmentStatus::Running,
                vibrator: EquipmentStatus::Idle,
            },
        }
    }

    /// Whether any actuator belonging to `source` is non-idle.
    pub fn source_active(&self, source: FillSource) -> bool {
        match source {
            FillSource::Tank => self.pump.is_active() || self.valve.is_active(),
            FillSource::Silo => self.damper.is_active(),
        }
    }

    /// Whether any source actuator is non-idle.  The vibrator is not
    /// counted: it never feeds material.
    pub fn any_active(&self) -> bool {
        self.source_active(FillSource::Tank) || self.source_active(FillSource::Silo)
    }

    /// `self` with the vibrator set to `vibrator`.
    pub fn with_vibrator(self, vibrator: EquipmentStatus) -> Self {
        Self { vibrator, ..self }
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// Operator-editable fill targets, all in kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub tank_target: f64,
    pub silo_target: f64,
    /// Material still in flight after the tank stops (pipe run-on).
    pub tank_overrun: f64,
    /// Material still in flight after the damper closes.
    pub silo_overrun: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            tank_target: 500.0,
            silo_target: 500.0,
            tank_overrun: 5.0,
            silo_overrun: 5.0,
        }
    }
}

impl Targets {
    pub fn target(&self, source: FillSource) -> f64 {
        match source {
            FillSource::Tank => self.tank_target,
            FillSource::Silo => self.silo_target,
        }
    }

    pub fn overrun(&self, source: FillSource) -> f64 {
        match source {
            FillSource::Tank => self.tank_overrun,
            FillSource::Silo => self.silo_overrun,
        }
    }

    /// Weight at which a fill from `source` is stopped: `target - overrun`,
    /// never below zero.
    pub fn stop_threshold(&self, source: FillSource) -> f64 {
        (self.target(source) - self.overrun(source)).max(0.0)
    }

    /// Weight at which a coarse fill from `source` drops to fine.
    pub fn fine_threshold(&self, source: FillSource, fraction: f64) -> f64 {
        self.target(source) * fraction
    }

    /// Combined target for the container.
    pub fn total(&self) -> f64 {
        self.tank_target + self.silo_target
    }

    /// True when every field is a finite, non-negative weight.
    pub fn is_valid(&self) -> bool {
        [
            self.tank_target,
            self.silo_target,
            self.tank_overrun,
            self.silo_overrun,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
    }
}

// ---------------------------------------------------------------------------
// Connectivity and authority
// ---------------------------------------------------------------------------

/// Link state towards the fill controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Connectivity {
    pub is_connected: bool,
    /// True when the controller drives real relays and load cells, false
    /// when it runs its own simulation.
    pub on_hardware: bool,
}

/// Which writer currently owns [`ProcessState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Remote controller telemetry is mirrored.
    Controller,
    /// The in-process simulator advances the state.
    LocalSimulation,
}

impl Authority {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            Self::Controller
        } else {
            Self::LocalSimulation
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller => f.write_str("controller"),
            Self::LocalSimulation => f.write_str("local simulation"),
        }
    }
}

// ---------------------------------------------------------------------------
// Process state
// ---------------------------------------------------------------------------

/// The operator-facing state of the station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessState {
    pub fill_mode: FillMode,
    pub active_source: Option<FillSource>,
    pub actuators: Actuators,
    /// Material delivered from the tank into the current IBC (kg).
    pub tank_weight: f64,
    /// Material delivered from the silo into the current IBC (kg).
    pub silo_weight: f64,
    /// Tank temperature (°C).
    pub temperature: f64,
    pub connectivity: Connectivity,
}

impl ProcessState {
    pub fn new(initial_temperature: f64) -> Self {
        Self {
            fill_mode: FillMode::Idle,
            active_source: None,
            actuators: Actuators::all_idle(),
            tank_weight: 0.0,
            silo_weight: 0.0,
            temperature: initial_temperature,
            connectivity: Connectivity::default(),
        }
    }

    pub fn weight(&self, source: FillSource) -> f64 {
        match source {
            FillSource::Tank => self.tank_weight,
            FillSource::Silo => self.silo_weight,
        }
    }

    pub fn weight_mut(&mut self, source: FillSource) -> &mut f64 {
        match source {
            FillSource::Tank => &mut self.tank_weight,
            FillSource::Silo => &mut self.silo_weight,
        }
    }

    /// Total weight in the container.
    pub fn current_weight(&self) -> f64 {
        self.tank_weight + self.silo_weight
    }

    pub fn is_idle(&self) -> bool {
        self.fill_mode == FillMode::Idle
    }

    /// `active_source == None` ⇔ `fill_mode == Idle` ⇔ all source actuators
    /// idle, never both sources' actuators at once, and no vibrator while idle.
    pub fn is_consistent(&self) -> bool {
        let idle_agrees = self.active_source.is_none() == self.is_idle()
            && self.is_idle() == !self.actuators.any_active();
        let exclusive = !(self.actuators.source_active(FillSource::Tank)
            && self.actuators.source_active(FillSource::Silo));
        let vibrator_ok = !(self.is_idle() && self.actuators.vibrator.is_active());
        idle_agrees && exclusive && vibrator_ok
    }
}

// ---------------------------------------------------------------------------
// Fill history
// ---------------------------------------------------------------------------

/// Outcome of the most recent completed fill from one source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    /// Weight actually delivered when the fill stopped (kg).
    pub weight: f64,
    /// Target that was in force for that fill (kg).
    pub target: f64,
}

impl FillResult {
    /// Relative deviation `|weight - target| / target`.
    /// `None` when the target is zero: there is nothing to deviate from.
    pub fn deviation(&self) -> Option<f64> {
        (self.target > 0.0).then(|| (self.weight - self.target).abs() / self.target)
    }
}

/// Last completed fill per source.  Overwritten on each completion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FillHistory {
    tank: Option<FillResult>,
    silo: Option<FillResult>,
}

impl FillHistory {
    pub fn last(&self, source: FillSource) -> Option<FillResult> {
        match source {
            FillSource::Tank => self.tank,
            FillSource::Silo => self.silo,
        }
    }

    pub fn record(&mut self, source: FillSource, result: FillResult) {
        match source {
            FillSource::Tank => self.tank = Some(result),
            FillSource::Silo => self.silo = Some(result),
        }
    }
}
