//! Eddystone beacon firmware.
//!
//! Broadcasts rotating UID / URL / TLM frames as non-connectable
//! advertisements. The rotation runs in its own task, once per advertising
//! interval; selected payloads cross to the radio task through a single-slot
//! queue so the scheduler itself never awaits the radio.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{info, trace};
use eddystone_beacon_rs::eddystone::frame::{Frame, FrameKind};
use eddystone_beacon_rs::eddystone::scheduler::AdvertisementScheduler;
use eddystone_beacon_rs::eddystone::store::{BeaconConfig, FrameStore};
use eddystone_beacon_rs::eddystone::{RadioAdvertiser, RadioError};
use eddystone_beacon_rs::bsp::sensors::BeaconSensors;
use eddystone_beacon_rs::{self as _, Board, config, device_address};
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use nrf_mpsl::MultiprotocolServiceLayer;
use nrf_sdc::SoftdeviceController;
use trouble_host::prelude::*;

/// Payloads staged for the radio task. One slot: if the radio has not
/// picked up the previous payload yet, the push is reported as busy and
/// the scheduler moves on.
static ADV_FRAMES: Channel<CriticalSectionRawMutex, Frame, 1> = Channel::new();

/// Set once advertising is on air; gates the rotation ticks.
static RADIO_ACTIVE: AtomicBool = AtomicBool::new(false);

struct QueuedAdvertiser;

impl RadioAdvertiser for QueuedAdvertiser {
    fn set_advertisement_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        let frame = Frame::copy_from(payload).map_err(|_| RadioError::Fatal)?;
        ADV_FRAMES.try_send(frame).map_err(|_| RadioError::Busy)
    }
}

#[embassy_executor::task]
async fn mpsl_task(mpsl: &'static MultiprotocolServiceLayer<'static>) -> ! {
    mpsl.run().await
}

#[embassy_executor::task]
async fn beacon_task(sdc: SoftdeviceController<'static>, address: Address, initial: Frame) {
    let mut resources: HostResources<DefaultPacketPool, 0, 0, 27> = HostResources::new();
    let stack = trouble_host::new(sdc, &mut resources).set_random_address(address);
    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    info!("[adv] starting advertising");
    let _ = join(runner.run(), async {
        loop {
            let mut params = AdvertisementParameters::default();
            params.interval_min = Duration::from_millis(config::ADV_INTERVAL_MS);
            params.interval_max = Duration::from_millis(config::ADV_INTERVAL_MS);
            let _advertiser = peripheral
                .advertise(
                    &params,
                    Advertisement::NonconnectableNonscannableUndirected {
                        adv_data: initial.as_bytes(),
                    },
                )
                .await
                .unwrap();
            RADIO_ACTIVE.store(true, Ordering::Relaxed);
            loop {
                let frame = ADV_FRAMES.receive().await;
                if let Err(e) = peripheral
                    .update_adv_data(Advertisement::NonconnectableNonscannableUndirected {
                        adv_data: frame.as_bytes(),
                    })
                    .await
                {
                    // No recovery here: reset and rebuild from scratch.
                    let e = defmt::Debug2Format(&e);
                    defmt::panic!("[adv] payload update failed: {:?}", e);
                }
            }
        }
    })
    .await;
}

#[embassy_executor::task]
async fn rotation_task(mut scheduler: AdvertisementScheduler, mut sensors: BeaconSensors) {
    let mut radio = QueuedAdvertiser;
    loop {
        Timer::after(Duration::from_millis(config::ADV_INTERVAL_MS)).await;
        let radio_active = RADIO_ACTIVE.load(Ordering::Relaxed);
        match scheduler.on_radio_tick(radio_active, &mut sensors, &mut radio) {
            Ok(Some(kind)) => trace!("[tick] {} staged", kind),
            Ok(None) => {}
            Err(e) => defmt::panic!("[tick] radio failure: {}", e),
        }
        let ticks = scheduler.tick_count();
        if ticks > 0 && ticks % config::STATUS_LOG_TICKS == 0 {
            info!(
                "[tick] still running: {} frames pushed over {} ticks",
                scheduler.adv_count(),
                ticks
            );
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting Eddystone beacon...");
    let b = Board::default();
    let (sdc, mpsl) = b.ble.init(b.timer0, b.rng).unwrap();
    spawner.must_spawn(mpsl_task(mpsl));
    info!("Initialized BLE.");

    let device_address = device_address();
    let mut sensors = BeaconSensors::new(b.saadc, mpsl);

    let beacon_config = BeaconConfig {
        namespace: config::UID_NAMESPACE,
        device_address,
        url: config::URL,
        url_scheme: config::URL_SCHEME,
        measured_rssi: config::MEASURED_RSSI,
    };
    let store = FrameStore::new(&beacon_config, &mut sensors).unwrap();
    let scheduler = AdvertisementScheduler::new(store);
    // UID goes on air first; the rotation takes over from there.
    let initial = *scheduler.frame(FrameKind::Uid);

    // Factory addresses are of the static-random kind; the two high bits
    // must read as such on the air.
    let mut addr = device_address;
    addr[5] |= 0xC0;
    let address = Address::random(addr);
    info!("Our address = {:?}", address);

    spawner.must_spawn(beacon_task(sdc, address, initial));
    spawner.must_spawn(rotation_task(scheduler, sensors));
}
