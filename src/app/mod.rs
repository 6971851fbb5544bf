//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the rules of the RoseCompass puzzle: command
//! parsing, the Watchtower messaging protocol, and the per-tick control
//! service. All interaction with hardware and the broker happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod protocol;
pub mod service;
