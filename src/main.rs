//! IBC filling console: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Gateway<HttpLink | NullLink>   LogEventSink   console (stdin) │
//! │  (ControllerPort)               (EventSink)    (commands)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              FillService (pure logic)                  │    │
//! │  │  FSM · Interlock · LocalSimulator                      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TimerSet (delegate-driven controller poll)                    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};

use ibcfill::adapters::console::{self, ConsoleCommand, HELP};
use ibcfill::adapters::log_sink::LogEventSink;
use ibcfill::app::commands::OperatorCommand;
use ibcfill::app::ports::TimerDelegate;
use ibcfill::app::service::FillService;
use ibcfill::config::SystemConfig;
use ibcfill::error::ConsoleError;
use ibcfill::gateway::Gateway;
use ibcfill::gateway::http::HttpLink;
use ibcfill::gateway::link::{ControllerLink, NullLink};
use ibcfill::model::FillSource;
use ibcfill::timer::{TimerId, TimerSet};

type ConsoleGateway = Gateway<Box<dyn ControllerLink>>;

/// Operator console for the two-source IBC filling station.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file; omitted fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller address (`host:port`), overrides the config file
    #[arg(long)]
    controller: Option<String>,

    /// Run on the local simulator only, never contacting a controller
    #[arg(long)]
    offline: bool,

    /// Seed for the simulator RNG (reproducible runs)
    #[arg(long)]
    seed: Option<u64>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

// ── Poll timer delegate ───────────────────────────────────────
//
// The timer set knows nothing about the gateway; this delegate only
// records that the poll period elapsed so the loop can poll once.

struct PollDue {
    timer: TimerId,
    fired: bool,
}

impl TimerDelegate for PollDue {
    fn on_timer_fired(&mut self, timer: TimerId) {
        if timer == self.timer {
            self.fired = true;
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    // ── 1. Logging ────────────────────────────────────────────
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    info!("ibcfill v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config (file, then command-line overrides) ────────
    let mut config = match &args.config {
        Some(path) => SystemConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SystemConfig::default(),
    };
    if let Some(addr) = args.controller {
        config.controller_addr = addr;
    }
    if args.seed.is_some() {
        config.sim_seed = args.seed;
    }
    config.validate().context("invalid configuration")?;

    // ── 3. Controller link ────────────────────────────────────
    let link: Box<dyn ControllerLink> = if args.offline {
        info!("Offline: local simulation only");
        Box::new(NullLink)
    } else {
        info!("Controller at {}", config.controller_addr);
        Box::new(HttpLink::new(
            config.controller_addr.clone(),
            Duration::from_millis(u64::from(config.request_timeout_ms)),
        ))
    };
    let mut gateway: ConsoleGateway = Gateway::new(link, config.disconnect_after_failures);

    // ── 4. Service ────────────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut service = FillService::new(&config).context("building fill service")?;
    service.start(&mut sink);

    for event in gateway.connect() {
        service.on_gateway_event(&event, &mut sink);
    }

    let mut timers = TimerSet::new();
    let poll_timer = timers
        .add("controller-poll", u64::from(config.poll_interval_ms))
        .context("no free timer slot for the controller poll")?;

    let input = spawn_console_reader();
    println!("{HELP}");
    println!("{}", service.view());

    // ── 5. Main loop ──────────────────────────────────────────
    let loop_interval = Duration::from_millis(u64::from(config.control_loop_interval_ms));
    let mut last = Instant::now();

    'main: loop {
        thread::sleep(loop_interval);

        let elapsed_ms = last.elapsed().as_millis() as u64;
        last += Duration::from_millis(elapsed_ms);

        let mut due = PollDue {
            timer: poll_timer,
            fired: false,
        };
        timers.advance(elapsed_ms, &mut due);
        if due.fired {
            for event in gateway.poll() {
                service.on_gateway_event(&event, &mut sink);
            }
        }

        service.tick(elapsed_ms, &mut sink);

        loop {
            match input.try_recv() {
                Ok(line) => {
                    if !handle_line(&line, &mut service, &mut gateway, &mut sink) {
                        break 'main;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Console input closed");
                    break 'main;
                }
            }
        }
    }

    let recorded = FillSource::ALL
        .iter()
        .filter(|s| service.history().last(**s).is_some())
        .count();
    info!("Shutting down ({} events, {} sources with a recorded fill)", sink.emitted(), recorded);
    Ok(())
}

/// Handle one console line; `false` ends the session.
fn handle_line(
    line: &str,
    service: &mut FillService,
    gateway: &mut ConsoleGateway,
    sink: &mut LogEventSink,
) -> bool {
    let command = match console::parse(line) {
        Ok(c) => c,
        Err(ConsoleError::Empty) => return true,
        Err(e) => {
            warn!("{e}");
            return true;
        }
    };

    let operator = match command {
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Help => {
            println!("{HELP}");
            return true;
        }
        ConsoleCommand::Status => {
            println!("{}", service.view());
            return true;
        }
        ConsoleCommand::Settings(patch) => {
            OperatorCommand::UpdateSettings(patch.apply_to(*service.targets()))
        }
        ConsoleCommand::Operator(cmd) => cmd,
    };

    let label = format!("{operator:?}");
    let outcome = service.handle_command(operator, gateway, sink);
    debug!("{label} -> {outcome:?}");
    true
}

/// Read stdin lines on a helper thread; the channel closes at EOF.
fn spawn_console_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
