//! Dashboard view model.
//!
//! Everything a front end needs to draw one frame, computed from the
//! process state.  Rendering itself lives outside the crate.

use core::fmt;

use crate::fsm::FillMode;
use crate::model::{Authority, Connectivity, EquipmentStatus, FillSource, ProcessState, Targets};

/// One frame of the operator dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub fill_mode: FillMode,
    pub active_source: Option<FillSource>,
    pub pump: EquipmentStatus,
    pub valve: EquipmentStatus,
    pub damper: EquipmentStatus,
    pub vibrator: EquipmentStatus,
    /// Vibrator button is only live while a fill runs.
    pub vibrator_enabled: bool,
    /// "Start" indicator per source: running while that source fills.
    pub tank_start: EquipmentStatus,
    pub silo_start: EquipmentStatus,
    /// Start buttons are only live while idle and nothing is parked.
    pub start_enabled: bool,
    /// Emergency-stop indicator: `Stopped` while a fill can be stopped.
    pub emergency: EquipmentStatus,
    pub tank_weight: f64,
    pub silo_weight: f64,
    pub current_weight: f64,
    pub total_target: f64,
    /// `current_weight / capacity`, clamped to `[0, 1]`.
    pub fill_fraction: f64,
    /// `total_target / capacity`, clamped to `[0, 1]`.
    pub target_fraction: f64,
    pub temperature: f64,
    pub temperature_warning: bool,
    pub connectivity: Connectivity,
    pub authority: Authority,
    pub pending_confirmation: Option<FillSource>,
}

impl DashboardView {
    pub fn build(
        state: &ProcessState,
        targets: &Targets,
        authority: Authority,
        pending_confirmation: Option<FillSource>,
        capacity_kg: f64,
        temperature_warning: bool,
    ) -> Self {
        let filling = state.fill_mode != FillMode::Idle;
        let start_for = |s: FillSource| {
            EquipmentStatus::from_energised(filling && state.active_source == Some(s))
        };
        let fraction = |kg: f64| {
            if capacity_kg > 0.0 {
                (kg / capacity_kg).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };
        let current_weight = state.current_weight();
        let total_target = targets.total();

        Self {
            fill_mode: state.fill_mode,
            active_source: state.active_source,
            pump: state.actuators.pump,
            valve: state.actuators.valve,
            damper: state.actuators.damper,
            vibrator: state.actuators.vibrator,
            vibrator_enabled: filling,
            tank_start: start_for(FillSource::Tank),
            silo_start: start_for(FillSource::Silo),
            start_enabled: !filling && pending_confirmation.is_none(),
            emergency: if filling {
                EquipmentStatus::Stopped
            } else {
                EquipmentStatus::Idle
            },
            tank_weight: state.tank_weight,
            silo_weight: state.silo_weight,
            current_weight,
            total_target,
            fill_fraction: fraction(current_weight),
            target_fraction: fraction(total_target),
            temperature: state.temperature,
            temperature_warning,
            connectivity: state.connectivity,
            authority,
            pending_confirmation,
        }
    }
}

fn status_char(s: EquipmentStatus) -> char {
    match s {
        EquipmentStatus::Running => '●',
        EquipmentStatus::Stopped => '■',
        EquipmentStatus::Idle => '○',
    }
}

impl fmt::Display for DashboardView {
    /// One-line status for the console.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{mode:<6} {src:<4} | tank {tw:>6.1} kg  silo {sw:>6.1} kg  total {cw:>6.1}/{tt:.0} kg ({pct:>3.0} %) | \
             pump {p} valve {v} damper {d} vib {vb} | {temp:.1} °C{warn} | {auth}{hw}",
            mode = self.fill_mode,
            src = self.active_source.map_or("-", FillSource::as_str),
            tw = self.tank_weight,
            sw = self.silo_weight,
            cw = self.current_weight,
            tt = self.total_target,
            pct = self.fill_fraction * 100.0,
            p = status_char(self.pump),
            v = status_char(self.valve),
            d = status_char(self.damper),
            vb = status_char(self.vibrator),
            temp = self.temperature,
            warn = if self.temperature_warning { " (!)" } else { "" },
            auth = self.authority,
            hw = if self.connectivity.is_connected && self.connectivity.on_hardware {
                " (hardware)"
            } else {
                ""
            },
        )?;
        if let Some(s) = self.pending_confirmation {
            write!(f, " | {s} start awaiting confirmation")?;
        }
        Ok(())
    }
}
