//! Start interlock.
//!
//! Evaluated on every start request **before** the FSM is touched:
//!
//! 1. Mutual exclusion: the other source must be quiescent, and the
//!    requested source must not already be filling.
//! 2. Pending gate: while a confirmation is outstanding, no new start is
//!    accepted.
//! 3. Headroom: the requested source must still be below its stop
//!    threshold, or the first fill increment would overshoot a met target.
//! 4. Deviation gate: if the previous run from the *same* source stopped
//!    more than `tolerance` away from its target, the start is parked until
//!    the operator confirms or cancels.
//!
//! Rejections are plain values, never errors.

use core::fmt;

use log::{info, warn};

use crate::model::{FillHistory, FillResult, FillSource, ProcessState, Targets};

/// Why a start request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejection {
    /// The other source is running.
    OtherSourceActive {
        requested: FillSource,
        active: FillSource,
    },
    /// The requested source is already running.
    AlreadyFilling(FillSource),
    /// A start from this source is waiting for the operator.
    ConfirmationPending(FillSource),
    /// The source already holds `target - overrun` or more.
    TargetReached(FillSource),
}

impl fmt::Display for StartRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OtherSourceActive { requested, active } => write!(
                f,
                "cannot start {requested} fill while {active} fill is running"
            ),
            Self::AlreadyFilling(s) => write!(f, "{s} fill is already running"),
            Self::ConfirmationPending(s) => {
                write!(f, "{s} start is waiting for confirmation")
            }
            Self::TargetReached(s) => {
                write!(f, "{s} target already reached; reset before filling again")
            }
        }
    }
}

/// Result of a start request that passed mutual exclusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartCheck {
    /// Start may proceed immediately.
    Clear,
    /// Start is parked until the operator confirms.
    NeedsConfirmation { deviation: f64, last: FillResult },
}

/// Mutual-exclusion and deviation gate for fill starts.
pub struct StartInterlock {
    tolerance: f64,
    /// Source whose start is parked behind the deviation gate.
    pending: Option<FillSource>,
}

impl StartInterlock {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            pending: None,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn pending(&self) -> Option<FillSource> {
        self.pending
    }

    /// Mutual-exclusion check alone.  Used again on confirmation, since the
    /// process may have changed while the operator was deciding.
    pub fn check_exclusion(
        state: &ProcessState,
        requested: FillSource,
    ) -> Result<(), StartRejection> {
        let other = requested.other();
        if state.active_source == Some(other) || state.actuators.source_active(other) {
            return Err(StartRejection::OtherSourceActive {
                requested,
                active: other,
            });
        }
        if state.active_source == Some(requested) || state.actuators.source_active(requested) {
            return Err(StartRejection::AlreadyFilling(requested));
        }
        Ok(())
    }

    /// Headroom check alone.  Also re-run on confirmation.
    pub fn check_headroom(
        state: &ProcessState,
        targets: &Targets,
        requested: FillSource,
    ) -> Result<(), StartRejection> {
        let weight = state.weight(requested);
        let stop_at = targets.stop_threshold(requested);
        if weight >= stop_at {
            warn!(
                "Interlock: {} already at {:.1} kg, stop threshold {:.1} kg",
                requested, weight, stop_at
            );
            return Err(StartRejection::TargetReached(requested));
        }
        Ok(())
    }

    /// Evaluate a start request.  Parks it when the deviation gate trips.
    pub fn evaluate(
        &mut self,
        requested: FillSource,
        state: &ProcessState,
        targets: &Targets,
        history: &FillHistory,
    ) -> Result<StartCheck, StartRejection> {
        if let Some(parked) = self.pending {
            warn!("Interlock: start {} refused, {} awaiting confirmation", requested, parked);
            return Err(StartRejection::ConfirmationPending(parked));
        }

        if let Err(rejection) = Self::check_exclusion(state, requested) {
            warn!("Interlock: {}", rejection);
            return Err(rejection);
        }
        Self::check_headroom(state, targets, requested)?;

        let Some(last) = history.last(requested) else {
            return Ok(StartCheck::Clear);
        };
        match last.deviation() {
            Some(deviation) if deviation > self.tolerance => {
                info!(
                    "Interlock: last {} fill {:.1}/{:.1} kg deviates {:.1} %, confirmation required",
                    requested,
                    last.weight,
                    last.target,
                    deviation * 100.0
                );
                self.pending = Some(requested);
                Ok(StartCheck::NeedsConfirmation { deviation, last })
            }
            _ => Ok(StartCheck::Clear),
        }
    }

    /// Release the parked start for execution.
    pub fn take_pending(&mut self) -> Option<FillSource> {
        self.pending.take()
    }

    /// Drop the parked start, if any.
    pub fn cancel(&mut self) -> Option<FillSource> {
        let dropped = self.pending.take();
        if let Some(s) = dropped {
            info!("Interlock: pending {} start discarded", s);
        }
        dropped
    }
}
