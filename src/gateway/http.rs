//! HTTP link to the controller's REST API.
//!
//! One blocking `ureq` agent per controller, with connect, read and write
//! timeouts.  Non-2xx answers surface as [`TransportError::Status`]; socket
//! failures as [`TransportError::Unreachable`].

use std::io::Read;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use super::link::{ControllerCommand, ControllerLink};
use crate::error::TransportError;

/// Maximum accepted status document size (protects against a runaway peer).
const MAX_RESPONSE: u64 = 64 * 1024;

const STATUS_PATH: &str = "/api/status";

/// Blocking HTTP client for one controller.
pub struct HttpLink {
    addr: String,
    agent: ureq::Agent,
}

impl HttpLink {
    /// `addr` is `host:port`.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            addr: addr.into(),
            agent,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<ureq::Response, TransportError> {
        let url = format!("http://{}{}", self.addr, path);
        let request = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json");
        let response = match body {
            Some(json) => request
                .set("Content-Type", "application/json")
                .send_string(json)?,
            None => request.call()?,
        };
        debug!("HTTP {} {} -> {}", method, path, response.status());
        Ok(response)
    }
}

impl ControllerLink for HttpLink {
    fn fetch_status(&mut self) -> Result<Value, TransportError> {
        let response = self.request("GET", STATUS_PATH, None)?;
        let body = response.into_reader().take(MAX_RESPONSE);
        Ok(serde_json::from_reader(body)?)
    }

    fn send(&mut self, command: &ControllerCommand) -> Result<(), TransportError> {
        let body = command.body().map(|v| v.to_string());
        self.request("POST", &command.path(), body.as_deref())?;
        Ok(())
    }
}
