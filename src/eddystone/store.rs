//! Storage for the three advertisement frames.

use super::frame::{
    encode_tlm, encode_uid, encode_url, EncodeError, Frame, FrameKind, Telemetry, UrlScheme,
    ADV_MAX_SIZE,
};
use super::SensorSource;

/// Static identity and payload configuration, fixed for the life of the
/// process. See `crate::config` for the deployed values.
pub struct BeaconConfig {
    pub namespace: [u8; 10],
    pub device_address: [u8; 6],
    pub url: &'static [u8],
    pub url_scheme: UrlScheme,
    pub measured_rssi: i8,
}

/// The three most recently built frames, indexed by [`FrameKind`].
///
/// UID and URL are built once here and are immutable afterwards. TLM is
/// rebuilt through [`FrameStore::rebuild_tlm`]; a rebuild that fails leaves
/// the previous TLM frame in place, stale but valid.
pub struct FrameStore {
    frames: [Frame; 3],
}

impl FrameStore {
    /// Builds all three frames. The initial TLM build samples the sensors
    /// with both counters at zero.
    pub fn new(
        config: &BeaconConfig,
        sensors: &mut impl SensorSource,
    ) -> Result<Self, EncodeError> {
        let mut frames = [Frame::empty(); 3];
        frames[FrameKind::Uid.index()] = build(|buf| {
            encode_uid(
                buf,
                &config.namespace,
                &config.device_address,
                config.measured_rssi,
            )
        })?;
        frames[FrameKind::Url.index()] =
            build(|buf| encode_url(buf, config.url_scheme, config.url, config.measured_rssi))?;
        frames[FrameKind::Tlm.index()] =
            build(|buf| encode_tlm(buf, &Telemetry::capture(sensors, 0, 0)))?;
        Ok(FrameStore { frames })
    }

    pub fn get(&self, kind: FrameKind) -> &Frame {
        &self.frames[kind.index()]
    }

    /// Re-encodes the TLM frame, committing only on success.
    pub fn rebuild_tlm(&mut self, telemetry: &Telemetry) -> Result<(), EncodeError> {
        let frame = build(|buf| encode_tlm(buf, telemetry))?;
        self.frames[FrameKind::Tlm.index()] = frame;
        Ok(())
    }
}

impl Telemetry {
    /// Reads both sensors and pairs the values with the current counters.
    pub fn capture(sensors: &mut impl SensorSource, adv_count: u32, tick_count: u32) -> Self {
        Telemetry {
            battery_mv: sensors.battery_millivolts(),
            temperature: sensors.temperature_raw(),
            adv_count,
            tick_count,
        }
    }
}

fn build(encode: impl FnOnce(&mut [u8]) -> Result<usize, EncodeError>) -> Result<Frame, EncodeError> {
    let mut buf = [0u8; ADV_MAX_SIZE];
    let len = encode(&mut buf)?;
    Ok(Frame::from_parts(buf, len))
}
