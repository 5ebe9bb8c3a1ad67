//! Shared mutable context threaded through every FSM handler.
//!
//! `FillContext` is the blackboard the state handlers read from and write
//! to: the operator-facing [`ProcessState`], the targets in force, the
//! coarse→fine switch fraction, and two hand-off slots between the
//! service and the handlers (the source requested for the next run, and the
//! record of a run that just completed).

use crate::model::{FillResult, FillSource, ProcessState, Targets};

/// A fill run that reached its stop threshold during the last tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub source: FillSource,
    pub result: FillResult,
}

/// The shared context passed to every state handler function.
pub struct FillContext {
    // -- Timing --
    /// Fill ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total fill tick count.
    pub total_ticks: u64,

    // -- Process --
    /// Operator-facing process state.
    pub process: ProcessState,
    /// Targets and overruns in force.
    pub targets: Targets,
    /// Fraction of the target at which coarse drops to fine.
    pub fine_switch_fraction: f64,

    // -- Hand-off --
    /// Source to energise when `Coarse` is entered from `Idle`.
    pub requested_source: Option<FillSource>,
    /// Set by a handler when a run hits its stop threshold; drained by the
    /// service after the tick.
    pub completed: Option<Completion>,
}

impl FillContext {
    pub fn new(process: ProcessState, targets: Targets, fine_switch_fraction: f64) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            process,
            targets,
            fine_switch_fraction,
            requested_source: None,
            completed: None,
        }
    }

    /// Weight delivered so far by the active source, if any.
    pub fn active_weight(&self) -> Option<(FillSource, f64)> {
        self.process
            .active_source
            .map(|s| (s, self.process.weight(s)))
    }

    /// True once the active source has reached `target - overrun`.
    pub fn stop_reached(&self) -> bool {
        self.active_weight()
            .is_some_and(|(s, w)| w >= self.targets.stop_threshold(s))
    }

    /// True once the active source has reached the fine-fill threshold.
    pub fn fine_reached(&self) -> bool {
        self.active_weight().is_some_and(|(s, w)| {
            w >= self.targets.fine_threshold(s, self.fine_switch_fraction)
        })
    }

    /// Record the active run as completed at its current weight.
    pub fn mark_completed(&mut self) {
        if let Some((source, weight)) = self.active_weight() {
            self.completed = Some(Completion {
                source,
                result: FillResult {
                    weight,
                    target: self.targets.target(source),
                },
            });
        }
    }
}
