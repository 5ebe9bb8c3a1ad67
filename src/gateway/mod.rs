//! Connection gateway to the fill controller.
//!
//! ```text
//!                ┌──────────────────────────────────────┐
//!  poll() ──────▶│ Gateway<L: ControllerLink>           │──▶ GatewayEvent
//!                │  connectivity edge tracking          │     Connected
//!                │  partial-document merge              │     Telemetry
//!                │  failure counting                    │     Disconnected
//!  ControllerPort│                                      │
//!  commands ────▶│  send(), never touches connectivity  │──▶ Result
//!                └──────────────────────────────────────┘
//! ```
//!
//! Connectivity flips only on poll results: a successful poll while
//! disconnected yields `Connected`, and `disconnect_after_failures`
//! consecutive failed polls while connected yield one `Disconnected`.
//! Retrying is simply the next poll.

pub mod http;
pub mod link;
pub mod telemetry;

use log::{debug, info, warn};
use serde_json::Value;

use crate::app::ports::ControllerPort;
use crate::error::TransportError;
use crate::model::{Connectivity, FillSource, Targets};
use link::{ControllerCommand, ControllerLink};
use telemetry::{SettingsPatch, Telemetry, merge_json};

/// What one poll observed, in delivery order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GatewayEvent {
    /// The link came up.  Fired once per disconnected→connected edge.
    Connected { on_hardware: bool },
    /// A decoded snapshot (partial updates already merged).
    Telemetry(Telemetry),
    /// The link went down.  Fired once per connected→disconnected edge.
    Disconnected,
}

/// Most events a single poll can produce: an edge plus a snapshot.
pub const MAX_POLL_EVENTS: usize = 2;

/// Events from one poll.
pub type PollEvents = heapless::Vec<GatewayEvent, MAX_POLL_EVENTS>;

/// Append to a poll's events.  Overflow means a poll produced more than
/// [`MAX_POLL_EVENTS`], which is a bug.
fn push_event(events: &mut PollEvents, event: GatewayEvent) {
    let pushed = events.push(event);
    debug_assert!(pushed.is_ok(), "poll produced more than {MAX_POLL_EVENTS} events");
}

/// Connectivity tracker and command channel for one controller.
pub struct Gateway<L: ControllerLink> {
    link: L,
    connectivity: Connectivity,
    consecutive_failures: u32,
    disconnect_after: u32,
    /// Last merged status document.
    document: Option<Value>,
    last: Option<Telemetry>,
}

impl<L: ControllerLink> Gateway<L> {
    /// `disconnect_after` is clamped to at least one failure.
    pub fn new(link: L, disconnect_after: u32) -> Self {
        Self {
            link,
            connectivity: Connectivity::default(),
            consecutive_failures: 0,
            disconnect_after: disconnect_after.max(1),
            document: None,
            last: None,
        }
    }

    /// Initial handshake: one poll, logged as such.
    pub fn connect(&mut self) -> PollEvents {
        info!("Gateway: connecting to controller");
        let events = self.poll();
        if !self.connectivity.is_connected {
            warn!("Gateway: controller not reachable, staying on local simulation");
        }
        events
    }

    /// Poll the controller once.
    pub fn poll(&mut self) -> PollEvents {
        let mut events = PollEvents::new();
        match self.fetch() {
            Ok(snapshot) => {
                self.consecutive_failures = 0;
                self.connectivity.on_hardware = snapshot.on_hardware;
                if !self.connectivity.is_connected {
                    self.connectivity.is_connected = true;
                    info!(
                        "Gateway: connected ({})",
                        if snapshot.on_hardware {
                            "hardware"
                        } else {
                            "controller simulation"
                        }
                    );
                    push_event(
                        &mut events,
                        GatewayEvent::Connected {
                            on_hardware: snapshot.on_hardware,
                        },
                    );
                }
                push_event(&mut events, GatewayEvent::Telemetry(snapshot));
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.connectivity.is_connected {
                    if self.consecutive_failures >= self.disconnect_after {
                        warn!("Gateway: connection lost ({})", e);
                        self.connectivity = Connectivity::default();
                        push_event(&mut events, GatewayEvent::Disconnected);
                    } else {
                        warn!(
                            "Gateway: poll failed ({}/{}): {}",
                            self.consecutive_failures, self.disconnect_after, e
                        );
                    }
                } else {
                    debug!("Gateway: poll failed while disconnected: {}", e);
                }
            }
        }
        events
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn is_connected(&self) -> bool {
        self.connectivity.is_connected
    }

    /// Last decoded snapshot, kept across disconnects.
    pub fn last_telemetry(&self) -> Option<&Telemetry> {
        self.last.as_ref()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    // ── Internal ──────────────────────────────────────────────

    fn fetch(&mut self) -> Result<Telemetry, TransportError> {
        let update = self.link.fetch_status()?;
        let mut doc = self.document.clone().unwrap_or(Value::Null);
        merge_json(&mut doc, update);
        let snapshot: Telemetry = serde_json::from_value(doc.clone())?;
        self.document = Some(doc);
        self.last = Some(snapshot);
        Ok(snapshot)
    }

    fn dispatch(&mut self, command: ControllerCommand) -> Result<(), TransportError> {
        match self.link.send(&command) {
            Ok(()) => {
                info!("Gateway: sent {}", command.name());
                Ok(())
            }
            Err(e) => {
                warn!("Gateway: {} failed: {}", command.name(), e);
                Err(e)
            }
        }
    }
}

impl<L: ControllerLink> ControllerPort for Gateway<L> {
    fn start_fill(&mut self, source: FillSource) -> Result<(), TransportError> {
        self.dispatch(ControllerCommand::StartFill(source))
    }

    fn stop_fill(&mut self) -> Result<(), TransportError> {
        self.dispatch(ControllerCommand::StopFill)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.dispatch(ControllerCommand::Reset)
    }

    fn update_settings(&mut self, targets: &Targets) -> Result<(), TransportError> {
        self.dispatch(ControllerCommand::UpdateSettings(SettingsPatch::from(targets)))
    }

    fn emergency_stop(&mut self) -> Result<(), TransportError> {
        self.dispatch(ControllerCommand::EmergencyStop)
    }
}
