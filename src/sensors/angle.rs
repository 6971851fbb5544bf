//! Potentiometer angle reader.
//!
//! Turns raw ADC counts into a compass [`Angle`]:
//!
//! 1. single-pole exponential smoothing, 50% new / 50% old,
//! 2. linear map of `0..=adc_max` onto `0..=359`,
//! 3. clamp to the closed range (guards rounding overshoot at full scale).
//!
//! The filter seeds itself from the first successful read so there is no
//! startup ramp up from zero.

use log::{debug, warn};

use crate::app::ports::RawSensor;
use crate::compass::{Angle, FULL_TURN};

/// Raw movement (counts) needed before the raw value is traced again.
const RAW_TRACE_DELTA: u16 = 10;

/// Angle reported when the sensor fails before any good sample.
pub const FALLBACK_ANGLE: Angle = Angle::MIN;

pub struct AngleReader {
    adc_max: u16,
    /// Smoothed sample; `None` until the first successful read.
    filtered: Option<u32>,
    last_traced_raw: Option<u16>,
}

impl AngleReader {
    pub fn new(adc_max: u16) -> Self {
        Self {
            adc_max: adc_max.max(1),
            filtered: None,
            last_traced_raw: None,
        }
    }

    /// Read one sample and return the smoothed angle. Never fails.
    ///
    /// On a sensor error the filter is left untouched and the last
    /// filtered angle (or [`FALLBACK_ANGLE`]) is returned.
    pub fn sample(&mut self, sensor: &mut impl RawSensor) -> Angle {
        let raw = match sensor.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Angle sensor read failed ({}), holding last angle", e);
                return self.current().unwrap_or(FALLBACK_ANGLE);
            }
        };
        self.trace_raw(raw);

        let raw = u32::from(raw);
        let previous = self.filtered.unwrap_or(raw);
        let filtered = (raw + previous) / 2;
        self.filtered = Some(filtered);

        self.map_to_angle(filtered)
    }

    /// Angle of the current filter value without taking a new sample.
    pub fn current(&self) -> Option<Angle> {
        self.filtered.map(|f| self.map_to_angle(f))
    }

    fn map_to_angle(&self, filtered: u32) -> Angle {
        let top = u32::from(FULL_TURN - 1);
        let degrees = (filtered * top / u32::from(self.adc_max)).min(top);
        Angle::from_degrees(degrees as u16)
    }

    fn trace_raw(&mut self, raw: u16) {
        let moved = self
            .last_traced_raw
            .is_none_or(|last| last.abs_diff(raw) >= RAW_TRACE_DELTA);
        if moved {
            debug!("Raw ADC: {}", raw);
            self.last_traced_raw = Some(raw);
        }
    }
}
