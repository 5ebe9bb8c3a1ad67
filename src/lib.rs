//! IBC filling station console library.
//!
//! Exposes the pure-logic modules (fill FSM, interlock, simulator) and the
//! controller gateway for the console binary and for integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod gateway;
pub mod interlock;
pub mod model;
pub mod simulator;
pub mod timer;
