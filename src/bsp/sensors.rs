//! Battery and die-temperature sources for the TLM frame.

use embassy_futures::block_on;
use embassy_nrf::peripherals::SAADC;
use embassy_nrf::saadc::{ChannelConfig, Config, Saadc, VddInput};
use embassy_nrf::{Peri, bind_interrupts, saadc};
use nrf_mpsl::MultiprotocolServiceLayer;

use crate::eddystone::SensorSource;
use crate::eddystone::frame::pack_temperature;

bind_interrupts!(pub struct Irqs {
    SAADC => saadc::InterruptHandler;
});

/// Internal reference voltage used by the ADC, in millivolts.
const ADC_REF_MILLIVOLTS: u32 = 600;

/// The supply rail is sampled through a 1/6 gain stage, so the conversion
/// result must be multiplied by 6 to get the actual battery voltage.
const ADC_PRESCALING_COMPENSATION: u32 = 6;

/// Full-scale count of a 12-bit conversion.
const ADC_RESOLUTION: u32 = 4096;

pub struct BeaconSensors {
    saadc: Saadc<'static, 1>,
    mpsl: &'static MultiprotocolServiceLayer<'static>,
}

impl BeaconSensors {
    pub fn new(
        saadc: Peri<'static, SAADC>,
        mpsl: &'static MultiprotocolServiceLayer<'static>,
    ) -> Self {
        let channel = ChannelConfig::single_ended(VddInput);
        let saadc = Saadc::new(saadc, Irqs, Config::default(), [channel]);
        BeaconSensors { saadc, mpsl }
    }
}

impl SensorSource for BeaconSensors {
    fn battery_millivolts(&mut self) -> u16 {
        let mut samples = [0i16; 1];
        // One-shot conversion; waiting it out stays well inside the tick
        // latency budget.
        block_on(self.saadc.sample(&mut samples));
        let counts = samples[0].max(0) as u32;
        ((counts * ADC_REF_MILLIVOLTS * ADC_PRESCALING_COMPENSATION) / ADC_RESOLUTION) as u16
    }

    fn temperature_raw(&mut self) -> u16 {
        // The radio stack owns the TEMP peripheral; readings come back in
        // 0.25 degree steps.
        pack_temperature(self.mpsl.get_temperature().to_bits())
    }
}
