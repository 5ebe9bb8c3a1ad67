//! Gateway over a real socket: `HttpLink` against a loopback controller.
//!
//! The fake controller answers a fixed script of responses, one per
//! connection, then closes its listener so later polls fail.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ibcfill::app::commands::{CommandOutcome, OperatorCommand};
use ibcfill::app::ports::ControllerPort;
use ibcfill::app::service::FillService;
use ibcfill::config::SystemConfig;
use ibcfill::fsm::FillMode;
use ibcfill::gateway::http::HttpLink;
use ibcfill::gateway::{Gateway, GatewayEvent};
use ibcfill::model::{Authority, FillSource, Targets};

use super::mock_controller::{LogSink, status_doc};

const TIMEOUT: Duration = Duration::from_millis(500);

/// Serve `script` in order, one response per connection, and report each
/// request line plus body.
fn fake_controller(script: Vec<(&'static str, String)>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for (status, body) in script {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = tx.send(request);
        }
    });
    (addr, rx)
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(split) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..split]).to_string();
            let len = head
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= split + 4 + len {
                break;
            }
        }
    }
    let text = String::from_utf8_lossy(&buf).to_string();
    let line = text.lines().next().unwrap_or_default().to_string();
    let body = text.split("\r\n\r\n").nth(1).unwrap_or_default();
    format!("{line}\n{body}")
}

fn ok(doc: serde_json::Value) -> (&'static str, String) {
    ("200 OK", doc.to_string())
}

#[test]
fn http_gateway_connects_mirrors_and_drops() {
    let (addr, requests) = fake_controller(vec![
        ok(status_doc(FillMode::Coarse, Some(FillSource::Tank), 210.0, 0.0)),
        ok(serde_json::json!({ "state": { "tank_weight": 215.0 }, "weight": 215.0 })),
    ]);
    let mut gw = Gateway::new(HttpLink::new(addr, TIMEOUT), 1);

    let first = gw.connect();
    assert_eq!(first[0], GatewayEvent::Connected { on_hardware: true });
    assert!(requests.recv().unwrap().starts_with("GET /api/status"));

    let second = gw.poll();
    let GatewayEvent::Telemetry(t) = second[0] else {
        panic!("expected telemetry, got {second:?}");
    };
    // Partial document merged onto the first one.
    assert_eq!(t.state.tank_weight, 215.0);
    assert_eq!(t.state.fill_source, Some(FillSource::Tank));
    assert!(t.relays.pump);

    // Script exhausted: the listener is gone.
    assert_eq!(gw.poll().as_slice(), &[GatewayEvent::Disconnected]);
    assert!(!gw.is_connected());
}

#[test]
fn commands_reach_the_rest_endpoints() {
    let (addr, requests) = fake_controller(vec![
        ("200 OK", "{}".into()),
        ("200 OK", "{}".into()),
        ("200 OK", "{\"ok\":true}".into()),
    ]);
    let mut gw = Gateway::new(HttpLink::new(addr, TIMEOUT), 1);

    gw.start_fill(FillSource::Silo).unwrap();
    assert!(requests.recv().unwrap().starts_with("POST /api/start-fill/silo"));

    gw.emergency_stop().unwrap();
    assert!(requests.recv().unwrap().starts_with("POST /api/emergency-stop"));

    let targets = Targets {
        tank_target: 420.0,
        ..Targets::default()
    };
    gw.update_settings(&targets).unwrap();
    let request = requests.recv().unwrap();
    assert!(request.starts_with("POST /api/settings"));
    let body: serde_json::Value = serde_json::from_str(request.lines().nth(1).unwrap()).unwrap();
    assert_eq!(body["tank_target"], 420.0);
    assert_eq!(body["silo_overrun"], 5.0);
}

#[test]
fn controller_error_status_is_a_transport_failure() {
    let (addr, _requests) = fake_controller(vec![("503 Service Unavailable", "{}".into())]);
    let mut gw = Gateway::new(HttpLink::new(addr, TIMEOUT), 1);
    assert!(gw.stop_fill().is_err());
}

#[test]
fn service_over_http_switches_authority_and_keeps_weights() {
    let (addr, _requests) = fake_controller(vec![
        ok(status_doc(FillMode::Fine, Some(FillSource::Silo), 0.0, 460.0)),
        ("200 OK", "{}".into()),
    ]);
    let config = SystemConfig {
        sim_seed: Some(5),
        ..SystemConfig::default()
    };
    let mut svc = FillService::new(&config).unwrap();
    let mut sink = LogSink::new();
    svc.start(&mut sink);
    let mut gw = Gateway::new(HttpLink::new(addr, TIMEOUT), 1);

    for event in gw.connect() {
        svc.on_gateway_event(&event, &mut sink);
    }
    assert_eq!(svc.authority(), Authority::Controller);
    assert_eq!(svc.mode(), FillMode::Fine);
    assert_eq!(svc.process().silo_weight, 460.0);

    assert_eq!(
        svc.handle_command(OperatorCommand::StopFill, &mut gw, &mut sink),
        CommandOutcome::Sent
    );

    // The controller goes away; the console carries on locally.
    for event in gw.poll() {
        svc.on_gateway_event(&event, &mut sink);
    }
    assert_eq!(svc.authority(), Authority::LocalSimulation);
    assert_eq!(svc.process().silo_weight, 460.0);
}
