//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FillService (domain)
//! ```
//!
//! Driven adapters (controller gateway, event sinks, the local simulator's
//! view of the plant) implement these traits.  The
//! [`FillService`](super::service::FillService) consumes them via generics,
//! so the domain core never touches a socket directly.

use crate::error::TransportError;
use crate::fsm::FillMode;
use crate::model::{FillSource, Targets};

// ───────────────────────────────────────────────────────────────
// Controller port (driven adapter: domain → fill controller)
// ───────────────────────────────────────────────────────────────

/// Command primitives of the remote fill controller.
///
/// Every call is fire-and-forget: success only means the controller
/// accepted the request.  Its effect is observed through the next
/// telemetry snapshot, never through the return value.
pub trait ControllerPort {
    fn start_fill(&mut self, source: FillSource) -> Result<(), TransportError>;

    fn stop_fill(&mut self) -> Result<(), TransportError>;

    fn reset(&mut self) -> Result<(), TransportError>;

    /// Push the full target/overrun set.
    fn update_settings(&mut self, targets: &Targets) -> Result<(), TransportError>;

    fn emergency_stop(&mut self) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → log / display)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, console, a
/// test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Simulated plant (simulator → domain)
// ───────────────────────────────────────────────────────────────

/// What the local simulator may read and write while it is the authority.
///
/// The service implements this over its own state, so every simulated
/// weight increment passes through the FSM's coarse/fine and stop rules.
pub trait SimulatedPlant {
    fn fill_mode(&self) -> FillMode;

    fn temperature(&self) -> f64;

    fn set_temperature(&mut self, celsius: f64);

    /// Add `kg` to the active source (unless it already sits at its stop
    /// threshold) and evaluate the fill rules.
    fn add_fill_weight(&mut self, kg: f64);
}

// ───────────────────────────────────────────────────────────────
// Timer delegate (decouples timers from what they drive)
// ───────────────────────────────────────────────────────────────

/// Callback trait that a [`TimerSet`](crate::timer::TimerSet) invokes
/// when one of its timers fires.
pub trait TimerDelegate {
    fn on_timer_fired(&mut self, timer: crate::timer::TimerId);
}
