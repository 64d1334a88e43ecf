#![no_main]
#![no_std]

use defmt_rtt as _;
use embassy_nrf::{
    Peri,
    peripherals::{RNG, SAADC, TIMER0},
};
use panic_probe as _;

pub mod config;
pub mod eddystone;

pub mod bsp {
    pub mod ble;
    pub mod sensors;
}

pub struct Board {
    /// TIMER0 peripheral, claimed by the BLE controller at init
    pub timer0: Peri<'static, TIMER0>,
    /// Random number generator
    pub rng: Peri<'static, RNG>,
    /// ADC, used for the battery voltage reading
    pub saadc: Peri<'static, SAADC>,
    /// Bluetooth Low Energy
    pub ble: bsp::ble::BleControllerBuilder<'static>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl Board {
    pub fn new(config: embassy_nrf::config::Config) -> Self {
        let p = embassy_nrf::init(config);
        Self {
            timer0: p.TIMER0,
            rng: p.RNG,
            saadc: p.SAADC,
            ble: bsp::ble::BleControllerBuilder::new(
                p.RTC0, p.TEMP, p.PPI_CH17, p.PPI_CH18, p.PPI_CH19, p.PPI_CH20, p.PPI_CH21,
                p.PPI_CH22, p.PPI_CH23, p.PPI_CH24, p.PPI_CH25, p.PPI_CH26, p.PPI_CH27, p.PPI_CH28,
                p.PPI_CH29, p.PPI_CH30, p.PPI_CH31,
            ),
        }
    }
}

/// Factory-programmed 6-byte device address from the FICR block, low-order
/// byte first. Feeds the UID beacon ID and the on-air address.
pub fn device_address() -> [u8; 6] {
    let lo = embassy_nrf::pac::FICR.deviceaddr(0).read();
    let hi = embassy_nrf::pac::FICR.deviceaddr(1).read();
    [
        lo as u8,
        (lo >> 8) as u8,
        (lo >> 16) as u8,
        (lo >> 24) as u8,
        hi as u8,
        (hi >> 8) as u8,
    ]
}

#[defmt::panic_handler]
fn panic() -> ! {
    // same panicking *behavior* as `panic-probe` but doesn't print a panic message
    // this prevents the panic message being printed *twice* when `defmt::panic` is invoked
    cortex_m::asm::udf()
}

/// Terminates the application and makes a semihosting-capable debug tool exit
/// with status code 0.
pub fn exit() -> ! {
    semihosting::process::exit(0);
}

/// Hardfault handler.
///
/// Terminates the application and makes a semihosting-capable debug tool exit
/// with an error. This seems better than the default, which is to spin in a
/// loop.
#[cortex_m_rt::exception]
unsafe fn HardFault(_frame: &cortex_m_rt::ExceptionFrame) -> ! {
    semihosting::process::exit(1);
}

// defmt-test 0.3.0 has the limitation that this `#[tests]` attribute can only be used
// once within a crate. the module can be in any file but there can only be at most
// one `#[tests]` module in this library crate
#[cfg(test)]
#[defmt_test::tests]
mod unit_tests {
    use defmt::assert_eq;

    use crate::eddystone::frame::{FrameKind, pack_temperature};
    use crate::eddystone::scheduler::select_frame;

    #[test]
    fn temperature_packs_in_quarter_degree_steps() {
        assert_eq!(pack_temperature(100), 0x1900); // 25.00 C
        assert_eq!(pack_temperature(101), 0x1919); // 25.25 C
        assert_eq!(pack_temperature(0), 0x0000);
    }

    #[test]
    fn rotation_ties_resolve_in_slot_order() {
        assert_eq!(select_frame(9), Some(FrameKind::Tlm));
        assert_eq!(select_frame(45), Some(FrameKind::Tlm));
        assert_eq!(select_frame(15), Some(FrameKind::Url));
    }
}
