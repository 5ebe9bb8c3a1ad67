//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch.
//!
//! ```text
//!  IDLE ──[start]──▶ COARSE ──[w ≥ 90 % target]──▶ FINE
//!    ▲                  │                            │
//!    │          [w ≥ target − overrun]    [w ≥ target − overrun]
//!    └──────────────────┴────────────────────────────┘
//!
//!  Any state ──[stop / emergency stop / reset]──▶ IDLE
//! ```
//!
//! Only fill ticks of the local simulation call `on_update`.  While the
//! controller is authoritative the service drives the table exclusively
//! through forced transitions mirrored from telemetry.

use super::context::FillContext;
use super::{FillMode, StateDescriptor};
use crate::model::Actuators;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; FillMode::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: FillMode::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Coarse
        StateDescriptor {
            id: FillMode::Coarse,
            name: "Coarse",
            on_enter: Some(coarse_enter),
            on_exit: None,
            on_update: coarse_update,
        },
        // Index 2: Fine
        StateDescriptor {
            id: FillMode::Fine,
            name: "Fine",
            on_enter: Some(fine_enter),
            on_exit: Some(fine_exit),
            on_update: fine_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FillContext) {
    ctx.process.fill_mode = FillMode::Idle;
    ctx.process.active_source = None;
    ctx.process.actuators = Actuators::all_idle();
    ctx.requested_source = None;
    info!(
        "IDLE: all actuators off (tank {:.1} kg, silo {:.1} kg)",
        ctx.process.tank_weight, ctx.process.silo_weight
    );
}

fn idle_update(_ctx: &mut FillContext) -> Option<FillMode> {
    // Idle is left only by an operator start or a telemetry mirror.
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  COARSE state: bulk fill at the high rate
// ═══════════════════════════════════════════════════════════════════════════

fn coarse_enter(ctx: &mut FillContext) {
    ctx.process.fill_mode = FillMode::Coarse;
    if let Some(source) = ctx.requested_source.take() {
        ctx.process.active_source = Some(source);
    }
    match ctx.process.active_source {
        Some(source) => {
            ctx.process.actuators = Actuators::feeding(source);
            info!(
                "COARSE: filling from {} (fine at {:.1} kg, stop at {:.1} kg)",
                source,
                ctx.targets.fine_threshold(source, ctx.fine_switch_fraction),
                ctx.targets.stop_threshold(source)
            );
        }
        None => warn!("COARSE: entered without a source"),
    }
}

fn coarse_update(ctx: &mut FillContext) -> Option<FillMode> {
    if ctx.process.active_source.is_none() {
        return Some(FillMode::Idle);
    }

    // Stop rule takes precedence: a large overrun can put the stop
    // threshold below the fine threshold.
    if ctx.stop_reached() {
        ctx.mark_completed();
        info!("COARSE: stop threshold reached");
        return Some(FillMode::Idle);
    }

    if ctx.fine_reached() {
        return Some(FillMode::Fine);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FINE state: precision fill at the low rate
// ═══════════════════════════════════════════════════════════════════════════

fn fine_enter(ctx: &mut FillContext) {
    ctx.process.fill_mode = FillMode::Fine;
    if let Some((source, weight)) = ctx.active_weight() {
        info!("FINE: {} at {:.1} kg, switching to fine fill", source, weight);
    }
}

fn fine_exit(ctx: &mut FillContext) {
    if let Some(done) = ctx.completed {
        info!(
            "FINE: {} stopped at {:.1} kg (target {:.1} kg)",
            done.source, done.result.weight, done.result.target
        );
    }
}

fn fine_update(ctx: &mut FillContext) -> Option<FillMode> {
    if ctx.process.active_source.is_none() {
        return Some(FillMode::Idle);
    }

    // One-way: fine never reverts to coarse within a run.
    if ctx.stop_reached() {
        ctx.mark_completed();
        return Some(FillMode::Idle);
    }

    None
}
