//! Outbound application events.
//!
//! The [`FillService`](super::service::FillService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them: log them, render them on a console, or
//! record them in a test.

use crate::fsm::FillMode;
use crate::interlock::StartRejection;
use crate::model::{Authority, FillResult, FillSource};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries the initial authority).
    Started(Authority),

    /// The fill mode changed, locally or through mirrored telemetry.
    ModeChanged {
        from: FillMode,
        to: FillMode,
        source: Option<FillSource>,
    },

    /// The writer of the process state changed.  Emitted once per
    /// connectivity transition.
    AuthorityChanged {
        authority: Authority,
        on_hardware: bool,
    },

    /// A start is parked behind the deviation gate.
    ConfirmationRequired {
        source: FillSource,
        deviation: f64,
        last: FillResult,
    },

    /// A run reached its stop threshold and was recorded in the history.
    FillCompleted { source: FillSource, result: FillResult },

    /// An operator-facing notice.
    Notice(Notice),
}

/// How loudly a notice should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

/// Operator-facing notices.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    FillStarted(FillSource),
    StartRejected(StartRejection),
    StartCancelled(FillSource),
    SwitchedToFine(FillSource),
    FillStopped,
    EmergencyStop,
    ResetDone,
    SettingsSaved,
    VibratorOn,
    VibratorOff,
    /// Vibrator toggle refused: no fill is running.
    VibratorUnavailable,
    /// A command could not be delivered to the controller.
    CommandFailed {
        command: &'static str,
        reason: String,
    },
    /// New targets apply locally but the controller did not take them.
    SettingsNotPushed(String),
    TemperatureHigh(f64),
    TemperatureNormal(f64),
}

impl Notice {
    pub fn severity(&self) -> Severity {
        match self {
            Self::FillStarted(_) | Self::SettingsSaved | Self::VibratorOn => Severity::Success,
            Self::StartCancelled(_)
            | Self::SwitchedToFine(_)
            | Self::FillStopped
            | Self::ResetDone
            | Self::VibratorOff
            | Self::TemperatureNormal(_) => Severity::Info,
            Self::StartRejected(StartRejection::OtherSourceActive { .. })
            | Self::CommandFailed { .. } => Severity::Error,
            Self::StartRejected(_)
            | Self::VibratorUnavailable
            | Self::SettingsNotPushed(_)
            | Self::TemperatureHigh(_) => Severity::Warning,
            Self::EmergencyStop => Severity::Critical,
        }
    }
}
