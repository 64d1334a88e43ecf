//! Compile-time beacon configuration.
//!
//! Everything a deployment would tune lives here so the encoder and
//! scheduler logic never need to change: identity, payload content and the
//! broadcast cadence.

use crate::eddystone::frame::UrlScheme;

/// Calibrated received signal strength at 1 m, in dBm. Scanners use this to
/// estimate distance from the observed RSSI.
pub const MEASURED_RSSI: i8 = -61;

/// 10-byte UID namespace. Truncated from a generated UUID
/// (first 6 + last 4 bytes of 8C257BA1-E4F7-4026-A735-B6C01043EEA4).
pub const UID_NAMESPACE: [u8; 10] = [
    0x8C, 0x25, 0x7B, 0xA1, 0xB6, 0xC0, 0x10, 0x43, 0xEE, 0xA4,
];

/// Shortened URL broadcast in the URL frame, with the scheme stripped.
/// Together with the scheme code this must fit a 31-byte advertisement.
pub const URL: &[u8] = b"goo.gl/jjurOU";

/// Scheme code prepended to [`URL`] by scanners.
pub const URL_SCHEME: UrlScheme = UrlScheme::Http;

/// Advertising interval. Also the rotation tick period: the scheduler is
/// driven once per advertising event.
pub const ADV_INTERVAL_MS: u64 = 100;

/// Rotation moduli. A frame is selected when the tick counter is divisible
/// by its modulus; see `eddystone::scheduler::ROTATION_SLOTS` for the
/// tie-breaking order.
pub const TLM_TICK_MODULUS: u32 = 9;
pub const URL_TICK_MODULUS: u32 = 5;
pub const UID_TICK_MODULUS: u32 = 3;

/// How many ticks between "still alive" status logs.
pub const STATUS_LOG_TICKS: u32 = 600;
