//! Integration tests for the FillService → FSM → controller pipeline.
//!
//! These verify the full chain from an operator command or a gateway
//! observation down to the process state, the fill history and the
//! commands that reach the controller.

use ibcfill::app::commands::{CommandOutcome, OperatorCommand};
use ibcfill::app::events::{AppEvent, Notice};
use ibcfill::app::service::FillService;
use ibcfill::config::SystemConfig;
use ibcfill::fsm::FillMode;
use ibcfill::gateway::Gateway;
use ibcfill::gateway::link::ControllerCommand;
use ibcfill::interlock::StartRejection;
use ibcfill::model::{Authority, EquipmentStatus, FillSource, Targets};

use super::mock_controller::{ControllerCall, LogSink, MockController, ScriptedLink, status_doc};

fn make_service() -> (FillService, LogSink) {
    let config = SystemConfig {
        sim_seed: Some(11),
        ..SystemConfig::default()
    };
    let mut svc = FillService::new(&config).unwrap();
    let mut sink = LogSink::new();
    svc.start(&mut sink);
    (svc, sink)
}

/// Poll the gateway once and feed everything to the service.
fn pump(svc: &mut FillService, gw: &mut Gateway<ScriptedLink>, sink: &mut LogSink) {
    for event in gw.poll() {
        svc.on_gateway_event(&event, sink);
    }
}

/// Run the local simulation one fill tick at a time until idle.
fn run_to_idle(svc: &mut FillService, sink: &mut LogSink) -> (Option<f64>, usize) {
    let mut fine_switch = None;
    let mut ticks = 0;
    while svc.mode() != FillMode::Idle {
        let before = svc.mode();
        svc.tick(100, sink);
        ticks += 1;
        if before == FillMode::Coarse && svc.mode() == FillMode::Fine {
            let p = svc.process();
            fine_switch = p.active_source.map(|s| p.weight(s));
        }
        assert!(ticks < 10_000, "fill never completed");
    }
    (fine_switch, ticks)
}

// ── Local simulation ──────────────────────────────────────────

#[test]
fn local_fill_runs_coarse_fine_to_completion() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();

    let outcome = svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
    assert_eq!(outcome, CommandOutcome::Applied);
    assert_eq!(svc.process().actuators.pump, EquipmentStatus::Running);
    assert_eq!(svc.process().actuators.valve, EquipmentStatus::Running);
    assert_eq!(svc.process().actuators.damper, EquipmentStatus::Idle);

    let (fine_at, _) = run_to_idle(&mut svc, &mut sink);
    let fine_at = fine_at.expect("fine phase was skipped");
    assert!((450.0..455.0).contains(&fine_at), "fine switch at {fine_at}");

    let done = svc.history().last(FillSource::Tank).unwrap();
    assert!((495.0..495.5).contains(&done.weight), "stopped at {}", done.weight);
    assert_eq!(done.target, 500.0);
    assert!(!svc.process().actuators.any_active());
    assert!(svc.process().is_consistent());

    // Local authority never talks to the controller.
    assert!(ctl.calls.is_empty());
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::FillCompleted { source: FillSource::Tank, .. })),
        1
    );
    assert!(sink.notices().any(|n| *n == Notice::SwitchedToFine(FillSource::Tank)));
}

#[test]
fn other_source_cannot_start_while_filling() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();
    svc.handle_command(OperatorCommand::StartFill(FillSource::Silo), &mut ctl, &mut sink);

    let outcome = svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
    assert_eq!(
        outcome,
        CommandOutcome::Rejected(StartRejection::OtherSourceActive {
            requested: FillSource::Tank,
            active: FillSource::Silo,
        })
    );
    assert_eq!(svc.process().active_source, Some(FillSource::Silo));
    assert_eq!(svc.process().actuators.pump, EquipmentStatus::Idle);
}

#[test]
fn stop_is_idempotent() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();
    svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
    svc.tick(300, &mut sink);

    assert_eq!(
        svc.handle_command(OperatorCommand::StopFill, &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
    let after_first = *svc.process();
    assert_eq!(
        svc.handle_command(OperatorCommand::StopFill, &mut ctl, &mut sink),
        CommandOutcome::Ignored
    );
    assert_eq!(*svc.process(), after_first);
    assert_eq!(svc.mode(), FillMode::Idle);
    // A stopped fill is not a completed one.
    assert!(svc.history().last(FillSource::Tank).is_none());
}

#[test]
fn reset_zeroes_weights_locally() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();
    svc.handle_command(OperatorCommand::StartFill(FillSource::Silo), &mut ctl, &mut sink);
    svc.tick(500, &mut sink);
    assert!(svc.process().silo_weight > 0.0);

    svc.handle_command(OperatorCommand::Reset, &mut ctl, &mut sink);
    assert_eq!(svc.process().silo_weight, 0.0);
    assert_eq!(svc.process().tank_weight, 0.0);
    assert_eq!(svc.mode(), FillMode::Idle);
}

#[test]
fn local_settings_change_thresholds() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();
    let targets = Targets {
        tank_target: 100.0,
        tank_overrun: 2.0,
        ..Targets::default()
    };
    assert_eq!(
        svc.handle_command(OperatorCommand::UpdateSettings(targets), &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
    svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
    let (fine_at, _) = run_to_idle(&mut svc, &mut sink);
    assert!((90.0..95.0).contains(&fine_at.unwrap()));
    assert!((98.0..98.5).contains(&svc.process().tank_weight));
}

// ── Controller authority ──────────────────────────────────────

#[test]
fn connected_service_mirrors_controller_and_forwards_commands() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Idle, None, 0.0, 0.0));
    link.push(status_doc(FillMode::Coarse, Some(FillSource::Tank), 120.0, 0.0));
    let mut gw = Gateway::new(link, 1);

    for event in gw.connect() {
        svc.on_gateway_event(&event, &mut sink);
    }
    assert_eq!(svc.authority(), Authority::Controller);
    assert!(!svc.is_simulating());

    let outcome = svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut gw, &mut sink);
    assert_eq!(outcome, CommandOutcome::Sent);
    assert_eq!(gw.link().sent, vec![ControllerCommand::StartFill(FillSource::Tank)]);
    // Nothing moves until the controller reports it.
    assert_eq!(svc.mode(), FillMode::Idle);

    pump(&mut svc, &mut gw, &mut sink);
    assert_eq!(svc.mode(), FillMode::Coarse);
    assert_eq!(svc.process().tank_weight, 120.0);
    assert_eq!(svc.process().active_source, Some(FillSource::Tank));
    assert_eq!(svc.process().actuators.pump, EquipmentStatus::Running);
    assert!(svc.process().connectivity.on_hardware);
}

#[test]
fn settings_are_pushed_as_a_full_patch() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Idle, None, 0.0, 0.0));
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);

    let targets = Targets {
        silo_target: 320.0,
        ..Targets::default()
    };
    assert_eq!(
        svc.handle_command(OperatorCommand::UpdateSettings(targets), &mut gw, &mut sink),
        CommandOutcome::Sent
    );
    let Some(ControllerCommand::UpdateSettings(patch)) = gw.link().sent.last().copied() else {
        panic!("settings not sent: {:?}", gw.link().sent);
    };
    assert_eq!(patch.silo_target, Some(320.0));
    assert_eq!(patch.tank_target, Some(500.0));
    assert_eq!(svc.targets().silo_target, 320.0);
}

#[test]
fn refused_command_reports_failure_without_state_change() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Idle, None, 0.0, 0.0));
    link.refuse_commands = true;
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);

    let outcome = svc.handle_command(OperatorCommand::StartFill(FillSource::Silo), &mut gw, &mut sink);
    assert_eq!(outcome, CommandOutcome::TransportFailed);
    assert_eq!(svc.mode(), FillMode::Idle);
    assert!(sink.notices().any(|n| matches!(n, Notice::CommandFailed { .. })));
}

#[test]
fn disconnect_mid_fill_continues_locally_from_last_weight() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Coarse, Some(FillSource::Silo), 40.0, 200.0));
    link.push_failure();
    let mut gw = Gateway::new(link, 1);

    pump(&mut svc, &mut gw, &mut sink);
    assert_eq!(svc.mode(), FillMode::Coarse);
    pump(&mut svc, &mut gw, &mut sink);

    assert_eq!(svc.authority(), Authority::LocalSimulation);
    assert!(svc.is_simulating());
    assert_eq!(svc.process().silo_weight, 200.0);
    assert_eq!(svc.process().tank_weight, 40.0);
    assert!(!svc.process().connectivity.is_connected);

    run_to_idle(&mut svc, &mut sink);
    let done = svc.history().last(FillSource::Silo).unwrap();
    assert!((495.0..495.5).contains(&done.weight));
    assert_eq!(svc.process().tank_weight, 40.0);
}

#[test]
fn emergency_stop_goes_idle_before_controller_answers() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Fine, Some(FillSource::Tank), 470.0, 0.0));
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);
    assert_eq!(svc.mode(), FillMode::Fine);

    let outcome = svc.handle_command(OperatorCommand::EmergencyStop, &mut gw, &mut sink);
    assert_eq!(outcome, CommandOutcome::Sent);
    assert_eq!(svc.mode(), FillMode::Idle);
    assert_eq!(svc.process().active_source, None);
    assert!(!svc.process().actuators.any_active());
    assert_eq!(gw.link().sent, vec![ControllerCommand::EmergencyStop]);
    assert!(sink.notices().any(|n| *n == Notice::EmergencyStop));
}

#[test]
fn emergency_stop_applies_locally_when_link_is_down() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Coarse, Some(FillSource::Tank), 100.0, 0.0));
    link.refuse_commands = true;
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);

    let outcome = svc.handle_command(OperatorCommand::EmergencyStop, &mut gw, &mut sink);
    assert_eq!(outcome, CommandOutcome::TransportFailed);
    assert_eq!(svc.mode(), FillMode::Idle);
    assert!(!svc.process().actuators.any_active());
}

// ── Deviation confirmation ────────────────────────────────────

/// Leave a 560 kg tank fill (target 500) in the history, back on local.
fn service_with_overfilled_tank() -> (FillService, LogSink) {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Fine, Some(FillSource::Tank), 550.0, 0.0));
    link.push(status_doc(FillMode::Idle, None, 560.0, 0.0));
    link.push_failure();
    let mut gw = Gateway::new(link, 1);
    for _ in 0..3 {
        pump(&mut svc, &mut gw, &mut sink);
    }
    assert_eq!(svc.authority(), Authority::LocalSimulation);
    assert_eq!(svc.history().last(FillSource::Tank).unwrap().weight, 560.0);
    svc.handle_command(OperatorCommand::Reset, &mut MockController::new(), &mut sink);
    sink.clear();
    (svc, sink)
}

#[test]
fn deviating_history_requires_confirmation() {
    let (mut svc, mut sink) = service_with_overfilled_tank();
    let mut ctl = MockController::new();

    let outcome = svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
    assert_eq!(outcome, CommandOutcome::AwaitingConfirmation);
    assert_eq!(svc.mode(), FillMode::Idle);
    assert_eq!(svc.pending_confirmation(), Some(FillSource::Tank));
    let Some(AppEvent::ConfirmationRequired { deviation, .. }) = sink.events.last() else {
        panic!("no confirmation prompt: {:?}", sink.events);
    };
    assert!((deviation - 0.12).abs() < 1e-9);

    assert_eq!(
        svc.handle_command(OperatorCommand::ConfirmStart, &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
    assert_eq!(svc.mode(), FillMode::Coarse);
    assert_eq!(svc.process().active_source, Some(FillSource::Tank));
    assert_eq!(svc.pending_confirmation(), None);
}

#[test]
fn cancelled_confirmation_stays_idle() {
    let (mut svc, mut sink) = service_with_overfilled_tank();
    let mut ctl = MockController::new();
    svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);

    assert_eq!(
        svc.handle_command(OperatorCommand::CancelStart, &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
    assert_eq!(svc.mode(), FillMode::Idle);
    assert_eq!(svc.pending_confirmation(), None);
    assert_eq!(
        svc.handle_command(OperatorCommand::ConfirmStart, &mut ctl, &mut sink),
        CommandOutcome::Ignored
    );
    assert_eq!(svc.mode(), FillMode::Idle);
}

#[test]
fn other_source_is_not_gated_by_tank_history() {
    let (mut svc, mut sink) = service_with_overfilled_tank();
    let mut ctl = MockController::new();
    assert_eq!(
        svc.handle_command(OperatorCommand::StartFill(FillSource::Silo), &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
}

#[test]
fn confirmed_start_goes_to_controller_when_connected() {
    let (mut svc, mut sink) = service_with_overfilled_tank();
    let mut ctl = MockController::new();
    svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);

    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Idle, None, 0.0, 0.0));
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);

    assert_eq!(
        svc.handle_command(OperatorCommand::ConfirmStart, &mut ctl, &mut sink),
        CommandOutcome::Sent
    );
    assert_eq!(ctl.calls, vec![ControllerCall::StartFill(FillSource::Tank)]);
}

// ── Start headroom ────────────────────────────────────────────

#[test]
fn start_at_met_target_is_rejected_without_overshoot() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();
    svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
    run_to_idle(&mut svc, &mut sink);
    let delivered = svc.process().tank_weight;
    assert!((495.0..495.5).contains(&delivered));

    let outcome = svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
    assert_eq!(
        outcome,
        CommandOutcome::Rejected(StartRejection::TargetReached(FillSource::Tank))
    );
    assert_eq!(svc.mode(), FillMode::Idle);
    assert!(!svc.process().actuators.any_active());
    svc.tick(1_000, &mut sink);
    assert_eq!(svc.process().tank_weight, delivered);
    assert!(sink.notices().any(|n| {
        *n == Notice::StartRejected(StartRejection::TargetReached(FillSource::Tank))
    }));

    // A reset gives the tank its headroom back.
    svc.handle_command(OperatorCommand::Reset, &mut ctl, &mut sink);
    assert_eq!(
        svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
}

#[test]
fn raised_target_restores_headroom() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();
    svc.handle_command(OperatorCommand::StartFill(FillSource::Silo), &mut ctl, &mut sink);
    run_to_idle(&mut svc, &mut sink);

    let raised = Targets {
        silo_target: 520.0,
        ..Targets::default()
    };
    svc.handle_command(OperatorCommand::UpdateSettings(raised), &mut ctl, &mut sink);
    assert_eq!(
        svc.handle_command(OperatorCommand::StartFill(FillSource::Silo), &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
    run_to_idle(&mut svc, &mut sink);
    let done = svc.history().last(FillSource::Silo).unwrap();
    assert!((515.0..515.5).contains(&done.weight), "stopped at {}", done.weight);
}

#[test]
fn resumed_run_past_stop_threshold_completes_without_increment() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Coarse, Some(FillSource::Tank), 497.0, 0.0));
    link.push_failure();
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);
    pump(&mut svc, &mut gw, &mut sink);
    assert_eq!(svc.authority(), Authority::LocalSimulation);
    assert_eq!(svc.mode(), FillMode::Coarse);

    svc.tick(100, &mut sink);
    assert_eq!(svc.mode(), FillMode::Idle);
    assert_eq!(svc.process().tank_weight, 497.0);
    assert_eq!(svc.history().last(FillSource::Tank).unwrap().weight, 497.0);
}

// ── Authority switch during a local run ───────────────────────

#[test]
fn local_run_cut_short_by_connect_is_not_a_completion() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();
    svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
    for _ in 0..20 {
        svc.tick(100, &mut sink);
    }
    assert_eq!(svc.process().tank_weight, 100.0);

    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Idle, None, 0.0, 0.0));
    link.push_failure();
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);

    assert_eq!(svc.authority(), Authority::Controller);
    assert_eq!(svc.mode(), FillMode::Idle);
    assert!(svc.history().last(FillSource::Tank).is_none());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::FillCompleted { .. })), 0);

    // Back on local, the next tank start is not held for confirmation.
    pump(&mut svc, &mut gw, &mut sink);
    assert_eq!(svc.authority(), Authority::LocalSimulation);
    assert_eq!(
        svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
    assert_eq!(svc.pending_confirmation(), None);
}

#[test]
fn controller_run_after_connect_still_completes() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Idle, None, 0.0, 0.0));
    link.push(status_doc(FillMode::Fine, Some(FillSource::Silo), 0.0, 480.0));
    link.push(status_doc(FillMode::Idle, None, 0.0, 496.0));
    let mut gw = Gateway::new(link, 1);
    for _ in 0..3 {
        pump(&mut svc, &mut gw, &mut sink);
    }
    let done = svc.history().last(FillSource::Silo).unwrap();
    assert_eq!(done.weight, 496.0);
    assert_eq!(done.target, 500.0);
}

// ── Vibrator ──────────────────────────────────────────────────

#[test]
fn vibrator_toggles_only_during_a_fill() {
    let (mut svc, mut sink) = make_service();
    let mut ctl = MockController::new();

    assert_eq!(
        svc.handle_command(OperatorCommand::ToggleVibrator, &mut ctl, &mut sink),
        CommandOutcome::Ignored
    );
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Idle);
    assert!(sink.notices().any(|n| *n == Notice::VibratorUnavailable));

    svc.handle_command(OperatorCommand::StartFill(FillSource::Silo), &mut ctl, &mut sink);
    assert_eq!(
        svc.handle_command(OperatorCommand::ToggleVibrator, &mut ctl, &mut sink),
        CommandOutcome::Applied
    );
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Running);
    assert!(svc.process().is_consistent());
    assert!(svc.view().vibrator_enabled);

    // Survives fill ticks, including the switch to fine.
    svc.tick(9_500, &mut sink);
    assert_eq!(svc.mode(), FillMode::Fine);
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Running);

    svc.handle_command(OperatorCommand::ToggleVibrator, &mut ctl, &mut sink);
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Idle);
    svc.handle_command(OperatorCommand::ToggleVibrator, &mut ctl, &mut sink);
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Running);

    // Completion returns it to idle with everything else.
    run_to_idle(&mut svc, &mut sink);
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Idle);
    assert!(ctl.calls.is_empty());
}

#[test]
fn stop_estop_and_reset_force_vibrator_idle() {
    let commands = [
        OperatorCommand::StopFill,
        OperatorCommand::EmergencyStop,
        OperatorCommand::Reset,
    ];
    for cmd in commands {
        let (mut svc, mut sink) = make_service();
        let mut ctl = MockController::new();
        svc.handle_command(OperatorCommand::StartFill(FillSource::Tank), &mut ctl, &mut sink);
        svc.handle_command(OperatorCommand::ToggleVibrator, &mut ctl, &mut sink);
        assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Running);

        svc.handle_command(cmd.clone(), &mut ctl, &mut sink);
        assert_eq!(
            svc.process().actuators.vibrator,
            EquipmentStatus::Idle,
            "vibrator still running after {cmd:?}"
        );
        assert!(svc.process().is_consistent());
    }
}

#[test]
fn vibrator_stays_local_under_controller_authority() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Coarse, Some(FillSource::Tank), 120.0, 0.0));
    link.push(status_doc(FillMode::Coarse, Some(FillSource::Tank), 160.0, 0.0));
    link.push(status_doc(FillMode::Coarse, Some(FillSource::Tank), 200.0, 0.0));
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);

    assert_eq!(
        svc.handle_command(OperatorCommand::ToggleVibrator, &mut gw, &mut sink),
        CommandOutcome::Applied
    );
    assert!(gw.link().sent.is_empty());

    // Mirrored snapshots keep it while the run continues.
    pump(&mut svc, &mut gw, &mut sink);
    assert_eq!(svc.process().tank_weight, 160.0);
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Running);

    // A stop sent to the controller turns it off before telemetry follows.
    assert_eq!(
        svc.handle_command(OperatorCommand::StopFill, &mut gw, &mut sink),
        CommandOutcome::Sent
    );
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Idle);
    pump(&mut svc, &mut gw, &mut sink);
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Idle);
}

#[test]
fn mirrored_idle_clears_vibrator() {
    let (mut svc, mut sink) = make_service();
    let mut link = ScriptedLink::new();
    link.push(status_doc(FillMode::Fine, Some(FillSource::Silo), 0.0, 470.0));
    link.push(status_doc(FillMode::Idle, None, 0.0, 496.0));
    let mut gw = Gateway::new(link, 1);
    pump(&mut svc, &mut gw, &mut sink);
    svc.handle_command(OperatorCommand::ToggleVibrator, &mut gw, &mut sink);
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Running);

    pump(&mut svc, &mut gw, &mut sink);
    assert_eq!(svc.mode(), FillMode::Idle);
    assert_eq!(svc.process().actuators.vibrator, EquipmentStatus::Idle);
    assert!(svc.process().is_consistent());
}
