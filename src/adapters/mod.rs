//! Adapters: concrete implementations at the edge of the hexagon.
//!
//! | Adapter    | Implements / provides | Connects to                 |
//! |------------|-----------------------|-----------------------------|
//! | `log_sink` | EventSink             | `log` facade (stderr)       |
//! | `console`  | OperatorCommand input | operator's terminal (stdin) |
//!
//! The controller side lives in [`crate::gateway`], which implements
//! `ControllerPort`.

pub mod console;
pub mod log_sink;
