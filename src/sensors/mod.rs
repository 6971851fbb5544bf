//! Sensor subsystem: signal conditioning for the compass potentiometer.
//!
//! Raw ADC access lives in the hardware adapter behind the
//! [`RawSensor`](crate::app::ports::RawSensor) port; this module only
//! turns those samples into angles.

pub mod angle;

pub use angle::AngleReader;
