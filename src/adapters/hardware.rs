//! Hardware adapter. Bridges the potentiometer ADC to the [`RawSensor`] port.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the ADC1 oneshot channel configured by `hw_init`.
//! On host/test: reads from a static `AtomicU16` for injection.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::app::ports::RawSensor;
use crate::drivers::hw_init;
use crate::error::{Result, SensorError};

static SIM_POT_ADC: AtomicU16 = AtomicU16::new(0);

/// Set the simulated potentiometer reading (host builds only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_pot_adc(raw: u16) {
    SIM_POT_ADC.store(raw, Ordering::Relaxed);
}

/// The compass potentiometer on an ADC1 pin.
pub struct PotentiometerAdapter {
    gpio: u8,
    channel: u32,
}

impl PotentiometerAdapter {
    /// Configure the ADC for `gpio` and return a ready sensor.
    pub fn new(gpio: u8) -> Result<Self> {
        let channel = hw_init::adc1_channel(gpio)?;
        hw_init::init_adc(channel)?;
        Ok(Self { gpio, channel })
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }
}

impl RawSensor for PotentiometerAdapter {
    #[cfg(target_os = "espidf")]
    fn read_raw(&mut self) -> core::result::Result<u16, SensorError> {
        hw_init::adc1_read(self.channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&mut self) -> core::result::Result<u16, SensorError> {
        Ok(SIM_POT_ADC.load(Ordering::Relaxed))
    }
}
