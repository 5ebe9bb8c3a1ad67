//! Controller wire types.
//!
//! Status document served by the controller:
//! ```text
//! {
//!   "weight": 512.0, "temperature": 22.4,
//!   "relays": { "pump": true, "valve": true, "damper": false },
//!   "state": {
//!     "filling": true, "fill_source": "tank", "fill_mode": "coarse",
//!     "tank_target": 500, "silo_target": 500,
//!     "tank_overrun": 5, "silo_overrun": 5,
//!     "tank_weight": 312.0, "silo_weight": 200.0
//!   },
//!   "on_raspberry_pi": true
//! }
//! ```
//!
//! Pushed updates may carry only part of this document; the gateway merges
//! them onto the last full one with [`merge_json`] before decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fsm::FillMode;
use crate::model::{Actuators, EquipmentStatus, FillSource, Targets};

/// Energised state of the three relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelayStates {
    #[serde(default)]
    pub pump: bool,
    #[serde(default)]
    pub valve: bool,
    #[serde(default)]
    pub damper: bool,
}

impl RelayStates {
    pub fn actuators(&self) -> Actuators {
        Actuators {
            pump: EquipmentStatus::from_energised(self.pump),
            valve: EquipmentStatus::from_energised(self.valve),
            damper: EquipmentStatus::from_energised(self.damper),
            // Not a controller relay; the service keeps the console's own state.
            vibrator: EquipmentStatus::Idle,
        }
    }
}

/// The controller's own view of the fill process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    #[serde(default)]
    pub filling: bool,
    #[serde(default)]
    pub fill_source: Option<FillSource>,
    #[serde(default)]
    pub fill_mode: FillMode,
    pub tank_target: f64,
    pub silo_target: f64,
    pub tank_overrun: f64,
    pub silo_overrun: f64,
    #[serde(default)]
    pub tank_weight: f64,
    #[serde(default)]
    pub silo_weight: f64,
}

impl ControllerState {
    /// The run the controller reports, normalised so that mode and source
    /// agree.  The controller leaves `fill_source` set after a stop, so a
    /// run only counts while `filling` is set, a source is named and the
    /// mode is not idle.
    pub fn run(&self) -> (FillMode, Option<FillSource>) {
        match self.fill_source {
            Some(source) if self.filling && self.fill_mode != FillMode::Idle => {
                (self.fill_mode, Some(source))
            }
            _ => (FillMode::Idle, None),
        }
    }

    pub fn weight(&self, source: FillSource) -> f64 {
        match source {
            FillSource::Tank => self.tank_weight,
            FillSource::Silo => self.silo_weight,
        }
    }

    pub fn targets(&self) -> Targets {
        Targets {
            tank_target: self.tank_target,
            silo_target: self.silo_target,
            tank_overrun: self.tank_overrun,
            silo_overrun: self.silo_overrun,
        }
    }
}

/// One full status snapshot from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Combined load-cell reading (kg).
    pub weight: f64,
    pub temperature: f64,
    pub relays: RelayStates,
    pub state: ControllerState,
    /// True when the controller drives real hardware.
    #[serde(rename = "on_raspberry_pi", default)]
    pub on_hardware: bool,
}

/// Body of `POST /api/settings`.  Absent keys are left unchanged by the
/// controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tank_target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silo_target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tank_overrun: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silo_overrun: Option<f64>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the present keys on top of `base`.
    pub fn apply_to(&self, base: Targets) -> Targets {
        Targets {
            tank_target: self.tank_target.unwrap_or(base.tank_target),
            silo_target: self.silo_target.unwrap_or(base.silo_target),
            tank_overrun: self.tank_overrun.unwrap_or(base.tank_overrun),
            silo_overrun: self.silo_overrun.unwrap_or(base.silo_overrun),
        }
    }
}

impl From<&Targets> for SettingsPatch {
    fn from(t: &Targets) -> Self {
        Self {
            tank_target: Some(t.tank_target),
            silo_target: Some(t.silo_target),
            tank_overrun: Some(t.tank_overrun),
            silo_overrun: Some(t.silo_overrun),
        }
    }
}

/// Recursively merge `patch` into `base`.
///
/// Objects merge key by key; any other value (including `null`) replaces
/// what was there.
pub fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                let nested = value.is_object() && base_map.get(&key).is_some_and(Value::is_object);
                if !nested {
                    base_map.insert(key, value);
                } else if let Some(slot) = base_map.get_mut(&key) {
                    merge_json(slot, value);
                }
            }
        }
        (base, patch) => *base = patch,
    }
}
