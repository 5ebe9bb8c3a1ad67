//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the `log`
//! facade (stderr through `env_logger` in the console binary).  Notice
//! severity picks the log level.

use log::{Level, info, log, warn};

use crate::app::events::{AppEvent, Notice, Severity};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted += 1;
        match event {
            AppEvent::Started(authority) => {
                info!("START | authority={}", authority);
            }
            AppEvent::ModeChanged { from, to, source } => {
                info!(
                    "MODE  | {} -> {} ({})",
                    from,
                    to,
                    source.map_or("-", |s| s.as_str())
                );
            }
            AppEvent::AuthorityChanged {
                authority,
                on_hardware,
            } => {
                warn!(
                    "LINK  | authority={}{}",
                    authority,
                    if *on_hardware { " (hardware)" } else { "" }
                );
            }
            AppEvent::ConfirmationRequired {
                source,
                deviation,
                last,
            } => {
                warn!(
                    "CONF  | last {} fill {:.1} kg vs target {:.1} kg ({:.1} % off); \
                     type 'confirm' or 'cancel'",
                    source,
                    last.weight,
                    last.target,
                    deviation * 100.0
                );
            }
            AppEvent::FillCompleted { source, result } => {
                info!(
                    "DONE  | {} fill complete: {:.1} kg (target {:.1} kg)",
                    source, result.weight, result.target
                );
            }
            AppEvent::Notice(notice) => {
                log!(level_for(notice.severity()), "NOTE  | {}", describe(notice));
            }
        }
    }
}

fn level_for(severity: Severity) -> Level {
    match severity {
        Severity::Info | Severity::Success => Level::Info,
        Severity::Warning => Level::Warn,
        Severity::Error | Severity::Critical => Level::Error,
    }
}

/// Operator wording for a notice.
pub fn describe(notice: &Notice) -> String {
    match notice {
        Notice::FillStarted(s) => format!("starting fill from {s}"),
        Notice::StartRejected(r) => r.to_string(),
        Notice::StartCancelled(s) => format!("{s} start cancelled"),
        Notice::SwitchedToFine(s) => format!("{s}: switching to fine fill"),
        Notice::FillStopped => "fill stopped".into(),
        Notice::EmergencyStop => "EMERGENCY STOP: all actuators off".into(),
        Notice::ResetDone => "system reset".into(),
        Notice::SettingsSaved => "settings saved".into(),
        Notice::VibratorOn => "vibrator started".into(),
        Notice::VibratorOff => "vibrator stopped".into(),
        Notice::VibratorUnavailable => "vibrator only runs during a fill".into(),
        Notice::CommandFailed { command, reason } => {
            format!("{command} not delivered to controller: {reason}")
        }
        Notice::SettingsNotPushed(reason) => {
            format!("settings apply locally but controller did not take them: {reason}")
        }
        Notice::TemperatureHigh(c) => format!("tank temperature high: {c:.1} °C"),
        Notice::TemperatureNormal(c) => format!("tank temperature normal: {c:.1} °C"),
    }
}
