//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules of the filling station:
//! authority selection between the controller and the local simulator,
//! start arbitration, and the operator-facing view.  All interaction with
//! the controller and the display happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without a network.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod view;
