//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌──────────┬───────────┬──────────┬───────────────────┐ │
//! │  │ FillMode │ on_enter  │ on_exit  │ on_update         │ │
//! │  ├──────────┼───────────┼──────────┼───────────────────┤ │
//! │  │ Idle     │ fn(ctx)   │    -     │ fn(ctx)->Option<> │ │
//! │  │ Coarse   │ fn(ctx)   │    -     │ fn(ctx)->Option<> │ │
//! │  │ Fine     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │ │
//! │  └──────────┴───────────┴──────────┴───────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each fill tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next)`, the engine runs `on_exit` for the current
//! state, then `on_enter` for the next.  Operator commands and mirrored
//! telemetry use [`Fsm::force_transition`] instead, which runs the same
//! enter/exit actions.

pub mod context;
pub mod states;

use core::fmt;

use context::FillContext;
use log::info;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Fill phase of the station.  Doubles as the FSM state identity.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FillMode {
    #[default]
    Idle = 0,
    Coarse = 1,
    Fine = 2,
}

impl FillMode {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `FillMode`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Coarse,
            2 => Self::Fine,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Coarse => "coarse",
            Self::Fine => "fine",
        }
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FillContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FillContext) -> Option<FillMode>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: FillMode,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table; the mutable [`FillContext`] is passed in on every
/// call so the service can share it with the telemetry mirror.
pub struct Fsm {
    table: [StateDescriptor; FillMode::COUNT],
    current: usize,
    tick_count: u64,
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; FillMode::COUNT], initial: FillMode) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FillContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one fill tick.
    ///
    /// Returns the `(from, to)` pair when the tick caused a transition.
    pub fn tick(&mut self, ctx: &mut FillContext) -> Option<(FillMode, FillMode)> {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let from = self.current_state();
        let next = (self.table[self.current].on_update)(ctx)?;
        self.transition(next, ctx);
        Some((from, next))
    }

    /// Force an immediate transition.  A no-op when already in `next`.
    ///
    /// Returns the `(from, to)` pair when a transition happened.
    pub fn force_transition(
        &mut self,
        next: FillMode,
        ctx: &mut FillContext,
    ) -> Option<(FillMode, FillMode)> {
        let from = self.current_state();
        if next == from {
            return None;
        }
        self.transition(next, ctx);
        Some((from, next))
    }

    pub fn current_state(&self) -> FillMode {
        FillMode::from_index(self.current)
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: FillMode, ctx: &mut FillContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
