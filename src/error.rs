//! Unified error types for the filling-station console.
//!
//! Operator-facing refusals (mutual exclusion, pending confirmation, idle
//! stop) are *not* errors: they are returned as [`CommandOutcome`] values.
//! The types here cover the things that can genuinely fail: the controller
//! link, configuration loading, and console input parsing.
//!
//! [`CommandOutcome`]: crate::app::commands::CommandOutcome

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation outside the domain core funnels into this type.
#[derive(Debug, Error)]
pub enum Error {
    /// The controller link failed.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    /// Configuration is invalid.
    #[error("config: {0}")]
    Config(&'static str),
    /// Reading a file or stream failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// A JSON document could not be parsed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures of the link to the fill controller.
///
/// None of these are fatal.  A failed poll counts towards the gateway's
/// disconnect threshold; a failed command is reported to the operator as a
/// transient notice and leaves the process state untouched.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No answer at the socket level (refused, reset, timed out, bad address).
    #[error("controller unreachable: {0}")]
    Unreachable(#[from] ureq::Transport),
    /// The controller answered with a non-success HTTP status.
    #[error("controller answered HTTP {0}")]
    Status(u16),
    /// The response body was not the expected JSON document.
    #[error("undecodable controller payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// No controller is configured (offline console).
    #[error("no controller configured")]
    Offline,
}

impl From<ureq::Error> for TransportError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, _) => Self::Status(code),
            ureq::Error::Transport(t) => Self::Unreachable(t),
        }
    }
}

// ---------------------------------------------------------------------------
// Console input errors
// ---------------------------------------------------------------------------

/// Errors raised while parsing an operator console line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),
    #[error("expected 'tank' or 'silo', got '{0}'")]
    UnknownSource(String),
    #[error("bad setting '{0}' (use key=<kg>, e.g. tank=500)")]
    BadSetting(String),
    #[error("weights must be non-negative numbers: '{0}'")]
    BadWeight(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
