//! Application service: the hexagonal core.
//!
//! [`FillService`] owns the FSM, the fill context, the start interlock, the
//! fill history and the local simulator.  It is the **only** writer of the
//! [`ProcessState`], and exactly one authority feeds it at a time:
//!
//! ```text
//!                      ┌──────────────────────────────┐
//!  GatewayEvent ──────▶│          FillService          │──▶ EventSink
//!  (Controller auth.)  │  FSM · Interlock · History    │
//!                      │                               │
//!  tick(elapsed) ─────▶│  LocalSimulator               │
//!  (Local auth.)       │    └─▶ SimulatedPlant ─▶ FSM  │
//!                      │                               │
//!  OperatorCommand ───▶│  arbitration                  │──▶ ControllerPort
//!                      └──────────────────────────────┘
//! ```
//!
//! Authority follows the gateway's connectivity edges.  Switching authority
//! never touches the weights: the simulator resumes from whatever the last
//! telemetry left behind.

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::error::{Result, TransportError};
use crate::fsm::context::FillContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, FillMode};
use crate::gateway::GatewayEvent;
use crate::gateway::telemetry::Telemetry;
use crate::interlock::{StartCheck, StartInterlock};
use crate::model::{
    Actuators, Authority, Connectivity, EquipmentStatus, FillHistory, FillResult, FillSource,
    ProcessState, Targets,
};
use crate::simulator::LocalSimulator;

use super::commands::{CommandOutcome, OperatorCommand};
use super::events::{AppEvent, Notice};
use super::ports::{ControllerPort, EventSink, SimulatedPlant};
use super::view::DashboardView;

// ───────────────────────────────────────────────────────────────
// FillService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct FillService {
    fsm: Fsm,
    ctx: FillContext,
    simulator: LocalSimulator,
    interlock: StartInterlock,
    history: FillHistory,
    alarm: TemperatureAlarm,
    authority: Authority,
    /// Set when the operator ended the controller's current run, so its
    /// end is not recorded as a completed fill.
    stop_requested: bool,
    /// Set on the switch to controller authority until the first snapshot
    /// has been mirrored.  A local run cut short by the switch never
    /// completed.
    awaiting_first_snapshot: bool,
    max_capacity_kg: f64,
}

impl FillService {
    /// Construct the service from configuration, on local simulation.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: &SystemConfig) -> Result<Self> {
        let process = ProcessState::new(config.initial_temperature_c);
        let ctx = FillContext::new(process, config.default_targets, config.fine_switch_fraction);
        Ok(Self {
            fsm: Fsm::new(build_state_table(), FillMode::Idle),
            ctx,
            simulator: LocalSimulator::from_config(config)?,
            interlock: StartInterlock::new(config.deviation_tolerance),
            history: FillHistory::default(),
            alarm: TemperatureAlarm::new(config.temperature_warning_c),
            authority: Authority::LocalSimulation,
            stop_requested: false,
            awaiting_first_snapshot: false,
            max_capacity_kg: config.max_capacity_kg,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.authority));
        info!("FillService started on {}", self.authority);
    }

    // ── Authority: controller side ────────────────────────────

    /// Apply one gateway observation.
    pub fn on_gateway_event(&mut self, event: &GatewayEvent, sink: &mut impl EventSink) {
        match event {
            GatewayEvent::Connected { on_hardware } => {
                self.ctx.process.connectivity = Connectivity {
                    is_connected: true,
                    on_hardware: *on_hardware,
                };
                if self.authority != Authority::Controller {
                    self.authority = Authority::Controller;
                    self.simulator.suspend();
                    self.stop_requested = false;
                    self.awaiting_first_snapshot = true;
                    info!("Authority -> controller");
                    sink.emit(&AppEvent::AuthorityChanged {
                        authority: Authority::Controller,
                        on_hardware: *on_hardware,
                    });
                }
            }
            GatewayEvent::Disconnected => {
                self.ctx.process.connectivity = Connectivity::default();
                if self.authority != Authority::LocalSimulation {
                    self.authority = Authority::LocalSimulation;
                    self.resync_actuators();
                    self.simulator.resume();
                    warn!(
                        "Authority -> local simulation (tank {:.1} kg, silo {:.1} kg, {})",
                        self.ctx.process.tank_weight,
                        self.ctx.process.silo_weight,
                        self.fsm.current_state()
                    );
                    sink.emit(&AppEvent::AuthorityChanged {
                        authority: Authority::LocalSimulation,
                        on_hardware: false,
                    });
                }
            }
            GatewayEvent::Telemetry(snapshot) => {
                if self.authority == Authority::Controller {
                    self.apply_telemetry(snapshot, sink);
                } else {
                    debug!("Telemetry ignored: local simulation is authoritative");
                }
            }
        }
    }

    /// Mirror one controller snapshot into the process state, as a unit.
    fn apply_telemetry(&mut self, t: &Telemetry, sink: &mut impl EventSink) {
        let (mode, source) = t.state.run();
        let prev_mode = self.fsm.current_state();
        let prev_source = self.ctx.process.active_source;

        // A controller run that ended without an operator stop completed.
        let completed = match prev_source {
            Some(s)
                if prev_mode != FillMode::Idle
                    && source != Some(s)
                    && !self.stop_requested
                    && !self.awaiting_first_snapshot =>
            {
                Some((
                    s,
                    FillResult {
                        weight: t.state.weight(s),
                        target: self.ctx.targets.target(s),
                    },
                ))
            }
            _ => None,
        };

        if prev_mode == FillMode::Idle {
            self.ctx.requested_source = source;
        }
        if let Some((from, to)) = self.fsm.force_transition(mode, &mut self.ctx) {
            announce_transition(from, to, source.or(prev_source), sink);
        }

        let p = &mut self.ctx.process;
        let vibrator = if mode == FillMode::Idle {
            EquipmentStatus::Idle
        } else {
            p.actuators.vibrator
        };
        p.fill_mode = mode;
        p.active_source = source;
        p.actuators = t.relays.actuators().with_vibrator(vibrator);
        p.tank_weight = t.state.tank_weight;
        p.silo_weight = t.state.silo_weight;
        p.temperature = t.temperature;
        p.connectivity = Connectivity {
            is_connected: true,
            on_hardware: t.on_hardware,
        };
        self.ctx.targets = t.state.targets();
        self.ctx.requested_source = None;

        if let Some((s, result)) = completed {
            record_completion(&mut self.history, s, result, sink);
        }
        if mode == FillMode::Idle {
            self.stop_requested = false;
        }
        self.awaiting_first_snapshot = false;
        self.alarm.check(t.temperature, sink);
    }

    // ── Authority: local side ─────────────────────────────────

    /// Advance local simulated time.  A no-op under controller authority.
    pub fn tick(&mut self, elapsed_ms: u64, sink: &mut impl EventSink) {
        if self.authority != Authority::LocalSimulation {
            return;
        }
        let Self {
            fsm,
            ctx,
            simulator,
            history,
            alarm,
            ..
        } = self;
        let mut plant = LocalPlant {
            fsm,
            ctx,
            history,
            alarm,
            sink,
        };
        simulator.advance(elapsed_ms, &mut plant);
    }

    // ── Command handling ──────────────────────────────────────

    /// Arbitrate one operator command.
    pub fn handle_command(
        &mut self,
        cmd: OperatorCommand,
        controller: &mut impl ControllerPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        info!("Command: {:?} ({})", cmd, self.authority);
        match cmd {
            OperatorCommand::StartFill(source) => self.request_start(source, controller, sink),
            OperatorCommand::ConfirmStart => self.confirm_start(controller, sink),
            OperatorCommand::CancelStart => match self.interlock.cancel() {
                Some(source) => {
                    sink.emit(&AppEvent::Notice(Notice::StartCancelled(source)));
                    CommandOutcome::Applied
                }
                None => CommandOutcome::Ignored,
            },
            OperatorCommand::StopFill => self.stop(controller, sink),
            OperatorCommand::EmergencyStop => self.emergency_stop(controller, sink),
            OperatorCommand::Reset => self.reset(controller, sink),
            OperatorCommand::UpdateSettings(targets) => {
                self.update_settings(targets, controller, sink)
            }
            OperatorCommand::ToggleVibrator => self.toggle_vibrator(sink),
        }
    }

    fn request_start(
        &mut self,
        source: FillSource,
        controller: &mut impl ControllerPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        match self.interlock.evaluate(
            source,
            &self.ctx.process,
            &self.ctx.targets,
            &self.history,
        ) {
            Err(rejection) => {
                sink.emit(&AppEvent::Notice(Notice::StartRejected(rejection)));
                CommandOutcome::Rejected(rejection)
            }
            Ok(StartCheck::NeedsConfirmation { deviation, last }) => {
                sink.emit(&AppEvent::ConfirmationRequired {
                    source,
                    deviation,
                    last,
                });
                CommandOutcome::AwaitingConfirmation
            }
            Ok(StartCheck::Clear) => self.execute_start(source, controller, sink),
        }
    }

    fn confirm_start(
        &mut self,
        controller: &mut impl ControllerPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        let Some(source) = self.interlock.take_pending() else {
            return CommandOutcome::Ignored;
        };
        // The process may have moved on while the operator decided.
        let still_clear = StartInterlock::check_exclusion(&self.ctx.process, source).and_then(
            |()| StartInterlock::check_headroom(&self.ctx.process, &self.ctx.targets, source),
        );
        if let Err(rejection) = still_clear {
            warn!("Confirmed start refused: {}", rejection);
            sink.emit(&AppEvent::Notice(Notice::StartRejected(rejection)));
            return CommandOutcome::Rejected(rejection);
        }
        self.execute_start(source, controller, sink)
    }

    fn execute_start(
        &mut self,
        source: FillSource,
        controller: &mut impl ControllerPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        if self.authority == Authority::Controller {
            return match controller.start_fill(source) {
                Ok(()) => {
                    self.stop_requested = false;
                    sink.emit(&AppEvent::Notice(Notice::FillStarted(source)));
                    CommandOutcome::Sent
                }
                Err(e) => command_failed("start fill", &e, sink),
            };
        }

        self.ctx.requested_source = Some(source);
        if let Some((from, to)) = self.fsm.force_transition(FillMode::Coarse, &mut self.ctx) {
            announce_transition(from, to, Some(source), sink);
        }
        sink.emit(&AppEvent::Notice(Notice::FillStarted(source)));
        CommandOutcome::Applied
    }

    fn stop(
        &mut self,
        controller: &mut impl ControllerPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        if self.fsm.current_state() == FillMode::Idle && self.ctx.process.active_source.is_none()
        {
            debug!("Stop ignored: already idle");
            return CommandOutcome::Ignored;
        }

        if self.authority == Authority::Controller {
            return match controller.stop_fill() {
                Ok(()) => {
                    self.stop_requested = true;
                    self.ctx.process.actuators.vibrator = EquipmentStatus::Idle;
                    sink.emit(&AppEvent::Notice(Notice::FillStopped));
                    CommandOutcome::Sent
                }
                Err(e) => command_failed("stop fill", &e, sink),
            };
        }

        self.force_idle(sink);
        sink.emit(&AppEvent::Notice(Notice::FillStopped));
        CommandOutcome::Applied
    }

    fn emergency_stop(
        &mut self,
        controller: &mut impl ControllerPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        self.interlock.cancel();
        let sent = (self.authority == Authority::Controller).then(|| controller.emergency_stop());

        // Local idle never waits on the controller.
        self.force_idle(sink);
        self.stop_requested = self.authority == Authority::Controller;
        warn!("EMERGENCY STOP");
        sink.emit(&AppEvent::Notice(Notice::EmergencyStop));

        match sent {
            None => CommandOutcome::Applied,
            Some(Ok(())) => CommandOutcome::Sent,
            Some(Err(e)) => command_failed("emergency stop", &e, sink),
        }
    }

    fn reset(
        &mut self,
        controller: &mut impl ControllerPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        self.interlock.cancel();

        if self.authority == Authority::Controller {
            // Zeroed weights arrive with the next telemetry.
            return match controller.reset() {
                Ok(()) => {
                    self.stop_requested = true;
                    self.ctx.process.actuators.vibrator = EquipmentStatus::Idle;
                    sink.emit(&AppEvent::Notice(Notice::ResetDone));
                    CommandOutcome::Sent
                }
                Err(e) => command_failed("reset", &e, sink),
            };
        }

        self.force_idle(sink);
        self.ctx.process.tank_weight = 0.0;
        self.ctx.process.silo_weight = 0.0;
        sink.emit(&AppEvent::Notice(Notice::ResetDone));
        CommandOutcome::Applied
    }

    fn update_settings(
        &mut self,
        targets: Targets,
        controller: &mut impl ControllerPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        if !targets.is_valid() {
            warn!("Settings ignored: {:?} is not a valid target set", targets);
            return CommandOutcome::Ignored;
        }

        self.ctx.targets = targets;
        info!(
            "Targets: tank {:.1} (-{:.1}) kg, silo {:.1} (-{:.1}) kg",
            targets.tank_target, targets.tank_overrun, targets.silo_target, targets.silo_overrun
        );
        sink.emit(&AppEvent::Notice(Notice::SettingsSaved));

        if self.authority != Authority::Controller {
            return CommandOutcome::Applied;
        }
        match controller.update_settings(&targets) {
            Ok(()) => CommandOutcome::Sent,
            Err(e) => {
                sink.emit(&AppEvent::Notice(Notice::SettingsNotPushed(e.to_string())));
                CommandOutcome::TransportFailed
            }
        }
    }

    /// The vibrator is console-side only and runs only during a fill.
    fn toggle_vibrator(&mut self, sink: &mut impl EventSink) -> CommandOutcome {
        let p = &mut self.ctx.process;
        if p.is_idle() {
            warn!("Vibrator toggle ignored: no fill running");
            sink.emit(&AppEvent::Notice(Notice::VibratorUnavailable));
            return CommandOutcome::Ignored;
        }
        let on = !p.actuators.vibrator.is_active();
        p.actuators.vibrator = EquipmentStatus::from_energised(on);
        info!("Vibrator {}", if on { "on" } else { "off" });
        sink.emit(&AppEvent::Notice(if on {
            Notice::VibratorOn
        } else {
            Notice::VibratorOff
        }));
        CommandOutcome::Applied
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn process(&self) -> &ProcessState {
        &self.ctx.process
    }

    pub fn targets(&self) -> &Targets {
        &self.ctx.targets
    }

    pub fn mode(&self) -> FillMode {
        self.fsm.current_state()
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn history(&self) -> &FillHistory {
        &self.history
    }

    pub fn pending_confirmation(&self) -> Option<FillSource> {
        self.interlock.pending()
    }

    pub fn is_simulating(&self) -> bool {
        self.simulator.is_running()
    }

    /// Presentation snapshot of the current state.
    pub fn view(&self) -> DashboardView {
        DashboardView::build(
            &self.ctx.process,
            &self.ctx.targets,
            self.authority,
            self.interlock.pending(),
            self.max_capacity_kg,
            self.alarm.is_high(),
        )
    }

    // ── Internal ──────────────────────────────────────────────

    /// Drop to idle locally, whatever the current mode.
    fn force_idle(&mut self, sink: &mut impl EventSink) {
        let source = self.ctx.process.active_source;
        if let Some((from, to)) = self.fsm.force_transition(FillMode::Idle, &mut self.ctx) {
            announce_transition(from, to, source, sink);
        }
        // Mirrored relays may be on even when the mode already reads idle.
        self.ctx.process.active_source = None;
        self.ctx.process.actuators = Actuators::all_idle();
    }

    /// Make the actuators agree with the FSM before the simulator takes
    /// over from mirrored relay states.
    fn resync_actuators(&mut self) {
        let p = &mut self.ctx.process;
        p.actuators = match (self.fsm.current_state(), p.active_source) {
            (FillMode::Idle, _) | (_, None) => Actuators::all_idle(),
            (_, Some(source)) => Actuators::feeding(source).with_vibrator(p.actuators.vibrator),
        };
        if p.active_source.is_none() && self.fsm.current_state() != FillMode::Idle {
            self.fsm.force_transition(FillMode::Idle, &mut self.ctx);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Local plant (simulator's write path)
// ───────────────────────────────────────────────────────────────

/// Borrowed view of the service handed to the simulator for one advance.
struct LocalPlant<'a, S: EventSink> {
    fsm: &'a mut Fsm,
    ctx: &'a mut FillContext,
    history: &'a mut FillHistory,
    alarm: &'a mut TemperatureAlarm,
    sink: &'a mut S,
}

impl<S: EventSink> SimulatedPlant for LocalPlant<'_, S> {
    fn fill_mode(&self) -> FillMode {
        self.fsm.current_state()
    }

    fn temperature(&self) -> f64 {
        self.ctx.process.temperature
    }

    fn set_temperature(&mut self, celsius: f64) {
        self.ctx.process.temperature = celsius;
        self.alarm.check(celsius, self.sink);
    }

    fn add_fill_weight(&mut self, kg: f64) {
        let Some(source) = self.ctx.process.active_source else {
            return;
        };
        // A run resumed at or past its stop threshold completes without
        // another increment.
        if !self.ctx.stop_reached() {
            *self.ctx.process.weight_mut(source) += kg;
        }

        if let Some((from, to)) = self.fsm.tick(self.ctx) {
            announce_transition(from, to, Some(source), self.sink);
        }
        if let Some(done) = self.ctx.completed.take() {
            record_completion(self.history, done.source, done.result, self.sink);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Temperature alarm
// ───────────────────────────────────────────────────────────────

/// Edge-triggered high-temperature warning.
struct TemperatureAlarm {
    threshold_c: f64,
    high: bool,
}

impl TemperatureAlarm {
    fn new(threshold_c: f64) -> Self {
        Self {
            threshold_c,
            high: false,
        }
    }

    fn is_high(&self) -> bool {
        self.high
    }

    fn check(&mut self, celsius: f64, sink: &mut impl EventSink) {
        let high = celsius > self.threshold_c;
        if high == self.high {
            return;
        }
        self.high = high;
        if high {
            warn!("Tank temperature {:.1} °C above {:.1} °C", celsius, self.threshold_c);
            sink.emit(&AppEvent::Notice(Notice::TemperatureHigh(celsius)));
        } else {
            info!("Tank temperature back to {:.1} °C", celsius);
            sink.emit(&AppEvent::Notice(Notice::TemperatureNormal(celsius)));
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Shared emit helpers
// ───────────────────────────────────────────────────────────────

fn announce_transition(
    from: FillMode,
    to: FillMode,
    source: Option<FillSource>,
    sink: &mut impl EventSink,
) {
    sink.emit(&AppEvent::ModeChanged { from, to, source });
    if let (FillMode::Coarse, FillMode::Fine, Some(s)) = (from, to, source) {
        sink.emit(&AppEvent::Notice(Notice::SwitchedToFine(s)));
    }
}

fn record_completion(
    history: &mut FillHistory,
    source: FillSource,
    result: FillResult,
    sink: &mut impl EventSink,
) {
    info!(
        "Fill complete: {} {:.1}/{:.1} kg",
        source, result.weight, result.target
    );
    history.record(source, result);
    sink.emit(&AppEvent::FillCompleted { source, result });
}

fn command_failed(
    command: &'static str,
    error: &TransportError,
    sink: &mut impl EventSink,
) -> CommandOutcome {
    warn!("{} not delivered: {}", command, error);
    sink.emit(&AppEvent::Notice(Notice::CommandFailed {
        command,
        reason: error.to_string(),
    }));
    CommandOutcome::TransportFailed
}
