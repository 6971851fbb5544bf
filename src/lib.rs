//! RoseCompass puzzle controller library.
//!
//! Exposes the pure-logic modules (compass math, puzzle state machine,
//! protocol handling) and the host-simulated adapters for integration
//! testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod compass;
pub mod config;
pub mod error;
pub mod puzzle;
pub mod scheduler;

// Re-export the ESP-IDF-backed modules so the crate compiles on host;
// the actual implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
pub mod sensors;

mod critical_section_impl;
