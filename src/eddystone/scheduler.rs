//! Advertisement rotation.
//!
//! The scheduler runs once per radio tick, inside the latency window around
//! an advertising event, so everything here is bounded: a few counter
//! increments, at most one frame rebuild and one payload push.

use defmt::{debug, warn};

use crate::config::{TLM_TICK_MODULUS, UID_TICK_MODULUS, URL_TICK_MODULUS};

use super::frame::{Frame, FrameKind, Telemetry};
use super::store::FrameStore;
use super::{RadioAdvertiser, RadioError, SensorSource};

/// Rotation slots, evaluated top to bottom; the first matching modulus wins.
/// Order is part of the broadcast mix: counters divisible by several moduli
/// (9, 18, 45, ...) resolve to the earliest slot, so TLM beats URL beats UID.
/// Reordering this table is a deliberate cadence change, not a cleanup.
pub const ROTATION_SLOTS: [(u32, FrameKind); 3] = [
    (TLM_TICK_MODULUS, FrameKind::Tlm),
    (URL_TICK_MODULUS, FrameKind::Url),
    (UID_TICK_MODULUS, FrameKind::Uid),
];

/// Pure rotation policy: which frame, if any, goes on air for this counter
/// value. Counter values divisible by none of the moduli change nothing;
/// the radio keeps repeating the previously configured payload.
pub fn select_frame(counter: u32) -> Option<FrameKind> {
    ROTATION_SLOTS
        .iter()
        .find(|(modulus, _)| counter % modulus == 0)
        .map(|&(_, kind)| kind)
}

/// Drives the frame rotation from the periodic radio tick.
///
/// Single-caller by construction: all state is owned here and only the tick
/// callback mutates it. If this ever moves to a preemptive context the
/// increment-and-read of the counters needs a critical section.
pub struct AdvertisementScheduler {
    store: FrameStore,
    /// Rotation counter, feeds the modulus chain.
    iterations: u32,
    /// Frames handed to the radio; the TLM "advertising PDU count" field.
    adv_count: u32,
    /// Active ticks since power-on; the TLM elapsed-time field.
    // TODO: at intervals other than 100 ms this drifts from the 0.1 s
    // resolution scanners expect; derive it from embassy_time::Instant.
    tick_count: u32,
}

impl AdvertisementScheduler {
    pub fn new(store: FrameStore) -> Self {
        AdvertisementScheduler {
            store,
            iterations: 0,
            adv_count: 0,
            tick_count: 0,
        }
    }

    /// Read access to the built frames (e.g. for the initial payload).
    pub fn frame(&self, kind: FrameKind) -> &Frame {
        self.store.get(kind)
    }

    pub fn adv_count(&self) -> u32 {
        self.adv_count
    }

    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    /// One radio tick. Returns the frame that went on air, if any.
    ///
    /// Inactive ticks are free: no counter advances, no sensor is read. On
    /// active ticks the policy picks a frame; TLM selections rebuild the
    /// frame from fresh sensor readings first. A transient-busy push is
    /// dropped (the following selected tick re-pushes current state), an
    /// encode overflow keeps the previous payload on air, and only
    /// [`RadioError::Fatal`] is propagated to the caller.
    pub fn on_radio_tick(
        &mut self,
        radio_active: bool,
        sensors: &mut impl SensorSource,
        radio: &mut impl RadioAdvertiser,
    ) -> Result<Option<FrameKind>, RadioError> {
        if !radio_active {
            return Ok(None);
        }

        self.iterations = self.iterations.wrapping_add(1);
        self.tick_count = self.tick_count.wrapping_add(1);

        let Some(kind) = select_frame(self.iterations) else {
            return Ok(None);
        };

        if kind == FrameKind::Tlm {
            let telemetry = Telemetry::capture(sensors, self.adv_count, self.tick_count);
            if let Err(e) = self.store.rebuild_tlm(&telemetry) {
                warn!("[tick] TLM rebuild failed ({}), keeping previous frame", e);
                return Ok(None);
            }
        }

        match radio.set_advertisement_payload(self.store.get(kind).as_bytes()) {
            Ok(()) => {
                self.adv_count = self.adv_count.wrapping_add(1);
                Ok(Some(kind))
            }
            Err(RadioError::Busy) => {
                debug!("[tick] radio busy, {} dropped", kind);
                Ok(None)
            }
            Err(e @ RadioError::Fatal) => Err(e),
        }
    }
}
