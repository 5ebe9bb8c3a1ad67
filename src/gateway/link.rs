//! Controller link abstraction.
//!
//! Concrete implementations:
//! - [`HttpLink`](super::http::HttpLink): the controller's REST API
//! - [`NullLink`]: no controller at all (offline console)
//!
//! The [`Gateway`](super::Gateway) is generic over `ControllerLink`, so
//! connectivity tracking and telemetry merging never see a socket.

use serde_json::Value;

use super::telemetry::SettingsPatch;
use crate::error::TransportError;
use crate::model::FillSource;

/// A command for the fill controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerCommand {
    StartFill(FillSource),
    StopFill,
    Reset,
    UpdateSettings(SettingsPatch),
    EmergencyStop,
}

impl ControllerCommand {
    /// Short name for logs and operator notices.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartFill(_) => "start fill",
            Self::StopFill => "stop fill",
            Self::Reset => "reset",
            Self::UpdateSettings(_) => "update settings",
            Self::EmergencyStop => "emergency stop",
        }
    }

    /// REST endpoint that carries this command.
    pub fn path(&self) -> String {
        match self {
            Self::StartFill(source) => format!("/api/start-fill/{source}"),
            Self::StopFill => "/api/stop-fill".into(),
            Self::Reset => "/api/reset".into(),
            Self::UpdateSettings(_) => "/api/settings".into(),
            Self::EmergencyStop => "/api/emergency-stop".into(),
        }
    }

    /// JSON request body, if the command carries one.
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::UpdateSettings(patch) => serde_json::to_value(patch).ok(),
            _ => None,
        }
    }
}

/// Request/response channel to the fill controller.
pub trait ControllerLink {
    /// Fetch the current status document (full or partial).
    fn fetch_status(&mut self) -> Result<Value, TransportError>;

    /// Deliver one command.  `Ok` only means the controller accepted it.
    fn send(&mut self, command: &ControllerCommand) -> Result<(), TransportError>;
}

impl<T: ControllerLink + ?Sized> ControllerLink for Box<T> {
    fn fetch_status(&mut self) -> Result<Value, TransportError> {
        (**self).fetch_status()
    }

    fn send(&mut self, command: &ControllerCommand) -> Result<(), TransportError> {
        (**self).send(command)
    }
}

/// A link with nothing on the other end.  Every call fails with
/// [`TransportError::Offline`], so the console stays on local simulation.
pub struct NullLink;

impl ControllerLink for NullLink {
    fn fetch_status(&mut self) -> Result<Value, TransportError> {
        Err(TransportError::Offline)
    }

    fn send(&mut self, _command: &ControllerCommand) -> Result<(), TransportError> {
        Err(TransportError::Offline)
    }
}
