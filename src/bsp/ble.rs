//! BLE controller bring-up: the multiprotocol service layer plus the Nordic
//! softdevice controller, wired for the trouble-host stack.
//!
//! The controller claims TIMER0, RTC0, TEMP and PPI channels 17-31; the rest
//! of the firmware never touches those peripherals directly. Die-temperature
//! readings go through the returned service-layer handle.

use embassy_nrf::peripherals::{
    PPI_CH17, PPI_CH18, PPI_CH19, PPI_CH20, PPI_CH21, PPI_CH22, PPI_CH23, PPI_CH24, PPI_CH25,
    PPI_CH26, PPI_CH27, PPI_CH28, PPI_CH29, PPI_CH30, PPI_CH31, RNG, RTC0, TEMP, TIMER0,
};
use embassy_nrf::{Peri, bind_interrupts, rng};
use nrf_mpsl::MultiprotocolServiceLayer;
use nrf_sdc::{self as sdc, SoftdeviceController, mpsl};
use static_cell::StaticCell;

bind_interrupts!(pub struct Irqs {
    RNG => rng::InterruptHandler<RNG>;
    EGU0_SWI0 => nrf_mpsl::LowPrioInterruptHandler;
    CLOCK_POWER => nrf_mpsl::ClockInterruptHandler;
    RADIO => nrf_mpsl::HighPrioInterruptHandler;
    TIMER0 => nrf_mpsl::HighPrioInterruptHandler;
    RTC0 => nrf_mpsl::HighPrioInterruptHandler;
});

/// Memory reserved for the controller. An advertising-only configuration
/// needs little; the controller reports the exact shortfall if this is ever
/// too small.
const SDC_MEM_SIZE: usize = 3084;

#[derive(Debug)]
pub enum BleInitError {
    Mpsl(nrf_mpsl::Error),
    Sdc(nrf_sdc::Error),
}

pub struct BleControllerBuilder<'d> {
    rtc0: Peri<'d, RTC0>,
    temp: Peri<'d, TEMP>,
    ppi_ch17: Peri<'d, PPI_CH17>,
    ppi_ch18: Peri<'d, PPI_CH18>,
    ppi_ch19: Peri<'d, PPI_CH19>,
    ppi_ch20: Peri<'d, PPI_CH20>,
    ppi_ch21: Peri<'d, PPI_CH21>,
    ppi_ch22: Peri<'d, PPI_CH22>,
    ppi_ch23: Peri<'d, PPI_CH23>,
    ppi_ch24: Peri<'d, PPI_CH24>,
    ppi_ch25: Peri<'d, PPI_CH25>,
    ppi_ch26: Peri<'d, PPI_CH26>,
    ppi_ch27: Peri<'d, PPI_CH27>,
    ppi_ch28: Peri<'d, PPI_CH28>,
    ppi_ch29: Peri<'d, PPI_CH29>,
    ppi_ch30: Peri<'d, PPI_CH30>,
    ppi_ch31: Peri<'d, PPI_CH31>,
}

impl BleControllerBuilder<'static> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rtc0: Peri<'static, RTC0>,
        temp: Peri<'static, TEMP>,
        ppi_ch17: Peri<'static, PPI_CH17>,
        ppi_ch18: Peri<'static, PPI_CH18>,
        ppi_ch19: Peri<'static, PPI_CH19>,
        ppi_ch20: Peri<'static, PPI_CH20>,
        ppi_ch21: Peri<'static, PPI_CH21>,
        ppi_ch22: Peri<'static, PPI_CH22>,
        ppi_ch23: Peri<'static, PPI_CH23>,
        ppi_ch24: Peri<'static, PPI_CH24>,
        ppi_ch25: Peri<'static, PPI_CH25>,
        ppi_ch26: Peri<'static, PPI_CH26>,
        ppi_ch27: Peri<'static, PPI_CH27>,
        ppi_ch28: Peri<'static, PPI_CH28>,
        ppi_ch29: Peri<'static, PPI_CH29>,
        ppi_ch30: Peri<'static, PPI_CH30>,
        ppi_ch31: Peri<'static, PPI_CH31>,
    ) -> Self {
        Self {
            rtc0,
            temp,
            ppi_ch17,
            ppi_ch18,
            ppi_ch19,
            ppi_ch20,
            ppi_ch21,
            ppi_ch22,
            ppi_ch23,
            ppi_ch24,
            ppi_ch25,
            ppi_ch26,
            ppi_ch27,
            ppi_ch28,
            ppi_ch29,
            ppi_ch30,
            ppi_ch31,
        }
    }

    /// Brings up the service layer and builds an advertising-capable
    /// controller. The returned service-layer handle must be driven by a
    /// dedicated task (`mpsl.run()`) for the controller to function.
    pub fn init(
        self,
        timer0: Peri<'static, TIMER0>,
        rng: Peri<'static, RNG>,
    ) -> Result<
        (
            SoftdeviceController<'static>,
            &'static MultiprotocolServiceLayer<'static>,
        ),
        BleInitError,
    > {
        let mpsl_p = mpsl::Peripherals::new(
            self.rtc0,
            timer0,
            self.temp,
            self.ppi_ch19,
            self.ppi_ch30,
            self.ppi_ch31,
        );
        // External 32 kHz crystal, 20 ppm
        let lfclk_cfg = mpsl::raw::mpsl_clock_lfclk_cfg_t {
            source: mpsl::raw::MPSL_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy_ppm: 20,
            skip_wait_lfclk_started: false,
        };
        static MPSL: StaticCell<MultiprotocolServiceLayer<'static>> = StaticCell::new();
        let mpsl = &*MPSL.init(
            MultiprotocolServiceLayer::new(mpsl_p, Irqs, lfclk_cfg).map_err(BleInitError::Mpsl)?,
        );

        static RNG_DRIVER: StaticCell<rng::Rng<'static, RNG>> = StaticCell::new();
        let rng_driver = RNG_DRIVER.init(rng::Rng::new(rng, Irqs));

        static SDC_MEM: StaticCell<sdc::Mem<SDC_MEM_SIZE>> = StaticCell::new();
        let sdc_mem = SDC_MEM.init(sdc::Mem::new());

        let sdc_p = sdc::Peripherals::new(
            self.ppi_ch17,
            self.ppi_ch18,
            self.ppi_ch20,
            self.ppi_ch21,
            self.ppi_ch22,
            self.ppi_ch23,
            self.ppi_ch24,
            self.ppi_ch25,
            self.ppi_ch26,
            self.ppi_ch27,
            self.ppi_ch28,
            self.ppi_ch29,
        );

        let sdc = sdc::Builder::new()
            .map_err(BleInitError::Sdc)?
            .support_adv()
            .map_err(BleInitError::Sdc)?
            .build(sdc_p, rng_driver, mpsl, sdc_mem)
            .map_err(BleInitError::Sdc)?;

        Ok((sdc, mpsl))
    }
}
