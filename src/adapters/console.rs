//! Operator console command parser.
//!
//! ```text
//! start tank|silo      confirm      cancel      stop      estop      reset
//! vibrator
//! set tank=<kg> silo=<kg> tank-overrun=<kg> silo-overrun=<kg>   (any subset)
//! status               help         quit
//! ```

use crate::app::commands::OperatorCommand;
use crate::error::ConsoleError;
use crate::gateway::telemetry::SettingsPatch;
use crate::model::FillSource;

pub const HELP: &str = "\
commands:
  start tank|silo         start a fill
  confirm | cancel        answer a deviation warning
  stop                    stop the running fill
  estop                   emergency stop (all actuators off)
  reset                   zero both weights
  vibrator                toggle the vibrator (during a fill)
  set key=<kg> ...        keys: tank, silo, tank-overrun, silo-overrun
  status                  print the dashboard line
  help                    this text
  quit                    leave the console";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Operator(OperatorCommand),
    /// Partial target update, applied on top of the targets in force.
    Settings(SettingsPatch),
    Status,
    Help,
    Quit,
}

/// Parse one operator input line.
pub fn parse(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(ConsoleError::Empty);
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "start" => {
            let source = words.next().ok_or(ConsoleError::MissingArgument("start"))?;
            ConsoleCommand::Operator(OperatorCommand::StartFill(parse_source(source)?))
        }
        "confirm" | "yes" => ConsoleCommand::Operator(OperatorCommand::ConfirmStart),
        "cancel" | "no" => ConsoleCommand::Operator(OperatorCommand::CancelStart),
        "stop" => ConsoleCommand::Operator(OperatorCommand::StopFill),
        "estop" | "emergency" => ConsoleCommand::Operator(OperatorCommand::EmergencyStop),
        "reset" => ConsoleCommand::Operator(OperatorCommand::Reset),
        "vibrator" | "vib" => ConsoleCommand::Operator(OperatorCommand::ToggleVibrator),
        "set" => {
            let mut patch = SettingsPatch::default();
            for pair in words.by_ref() {
                apply_setting(&mut patch, pair)?;
            }
            if patch.is_empty() {
                return Err(ConsoleError::MissingArgument("set"));
            }
            ConsoleCommand::Settings(patch)
        }
        "status" | "s" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(cmd)
}

fn parse_source(word: &str) -> Result<FillSource, ConsoleError> {
    match word.to_ascii_lowercase().as_str() {
        "tank" => Ok(FillSource::Tank),
        "silo" => Ok(FillSource::Silo),
        _ => Err(ConsoleError::UnknownSource(word.to_string())),
    }
}

fn apply_setting(patch: &mut SettingsPatch, pair: &str) -> Result<(), ConsoleError> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| ConsoleError::BadSetting(pair.to_string()))?;
    let kg: f64 = value
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| ConsoleError::BadWeight(value.to_string()))?;

    let slot = match key.to_ascii_lowercase().replace('_', "-").as_str() {
        "tank" | "tank-target" => &mut patch.tank_target,
        "silo" | "silo-target" => &mut patch.silo_target,
        "tank-overrun" => &mut patch.tank_overrun,
        "silo-overrun" => &mut patch.silo_overrun,
        _ => return Err(ConsoleError::BadSetting(pair.to_string())),
    };
    *slot = Some(kg);
    Ok(())
}
