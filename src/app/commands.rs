//! Inbound operator commands and their outcomes.
//!
//! Commands come from the presentation layer (the console adapter, or a
//! test).  The [`FillService`](super::service::FillService) never blocks on
//! the controller: the outcome only says what the service did right now.

use crate::interlock::StartRejection;
use crate::model::{FillSource, Targets};

/// Commands that the operator can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    /// Start a fill from one source (subject to the start interlock).
    StartFill(FillSource),

    /// Proceed with a start parked behind the deviation gate.
    ConfirmStart,

    /// Discard a start parked behind the deviation gate.
    CancelStart,

    /// Stop the running fill.
    StopFill,

    /// Kill every actuator immediately, regardless of the controller.
    EmergencyStop,

    /// Zero both weights and return to idle.
    Reset,

    /// Replace the targets/overruns in force.
    UpdateSettings(Targets),

    /// Switch the IBC vibrator on or off (only while a fill runs).
    ToggleVibrator,
}

/// What the service did with a command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    /// Handled locally, without a controller round trip.
    Applied,
    /// Forwarded to the controller; the effect arrives with telemetry.
    Sent,
    /// Start parked until the operator confirms or cancels.
    AwaitingConfirmation,
    /// Start refused by the interlock; nothing changed.
    Rejected(StartRejection),
    /// Nothing to do (stop while idle, confirm/cancel with nothing parked,
    /// vibrator toggle while idle).
    Ignored,
    /// The controller could not be reached.  Any local part of the command
    /// (emergency idle, new targets) was still applied.
    TransportFailed,
}

impl CommandOutcome {
    /// True when the command had an effect or was handed to the controller.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Applied | Self::Sent | Self::AwaitingConfirmation)
    }
}
