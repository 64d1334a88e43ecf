//! Eddystone frame serialization.
//!
//! All three frame kinds share a 12-byte opening: a Flags AD record, the
//! complete 16-bit service UUID list carrying the Eddystone UUID 0xFEAA, and
//! the Service Data record header followed by the frame-type byte. The
//! Service Data record's length byte (offset 7) counts every byte that
//! follows it, so it can only be patched once a frame body is complete.
//! `FrameWriter::finish` does that; nothing else touches it.

/// Link-layer limit for a legacy advertisement payload.
pub const ADV_MAX_SIZE: usize = 31;

/// Byte offset of the Service Data AD length within a frame.
pub const SERVICE_DATA_LEN_OFFSET: usize = 7;

/// Bytes of a frame not counted by the Service Data length byte: everything
/// up to and including the length byte itself.
const SERVICE_DATA_LEN_BASE: usize = SERVICE_DATA_LEN_OFFSET + 1;

/// The fixed bytes preceding the frame-type discriminator.
const FRAME_PREFIX: [u8; 11] = [
    0x02, 0x01, 0x06, // Flags: LE General Discoverable, BR/EDR not supported
    0x03, 0x03, 0xAA, 0xFE, // Complete 16-bit service UUID list: 0xFEAA
    0x03, 0x16, 0xAA, 0xFE, // Service Data for 0xFEAA, length patched in finish()
];

/// Total length of the shared opening, frame-type byte included.
pub const HEADER_LEN: usize = FRAME_PREFIX.len() + 1;

const UID_FRAME_TYPE: u8 = 0x00;
const URL_FRAME_TYPE: u8 = 0x10;
const TLM_FRAME_TYPE: u8 = 0x20;

const TLM_VERSION: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum FrameKind {
    Uid,
    Url,
    Tlm,
}

impl FrameKind {
    pub(crate) fn index(self) -> usize {
        match self {
            FrameKind::Uid => 0,
            FrameKind::Url => 1,
            FrameKind::Tlm => 2,
        }
    }
}

/// URL scheme codes understood by Eddystone scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum UrlScheme {
    HttpWww = 0x00,
    HttpsWww = 0x01,
    Http = 0x02,
    Https = 0x03,
}

/// A built advertisement payload: fixed-capacity buffer plus valid length.
/// Bytes past `len` are undefined and never transmitted.
#[derive(Clone, Copy)]
pub struct Frame {
    buf: [u8; ADV_MAX_SIZE],
    len: u8,
}

impl Frame {
    pub const fn empty() -> Self {
        Frame {
            buf: [0; ADV_MAX_SIZE],
            len: 0,
        }
    }

    pub(crate) fn from_parts(buf: [u8; ADV_MAX_SIZE], len: usize) -> Self {
        debug_assert!(len <= ADV_MAX_SIZE);
        Frame {
            buf,
            len: len as u8,
        }
    }

    /// Copies a finished payload. Fails if it exceeds the advertisement
    /// size limit.
    pub fn copy_from(payload: &[u8]) -> Result<Self, EncodeError> {
        if payload.len() > ADV_MAX_SIZE {
            return Err(EncodeError::Overflow);
        }
        let mut buf = [0u8; ADV_MAX_SIZE];
        buf[..payload.len()].copy_from_slice(payload);
        Ok(Frame {
            buf,
            len: payload.len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum EncodeError {
    /// Appending would exceed the destination capacity (or the 31-byte
    /// advertisement limit, whichever is smaller). Nothing was written.
    Overflow,
}

/// Live TLM field values, captured right before a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct Telemetry {
    /// Battery voltage, 1 mV per bit.
    pub battery_mv: u16,
    /// Die temperature, already packed by [`pack_temperature`].
    pub temperature: u16,
    /// Advertisement frames handed to the radio since power-on.
    pub adv_count: u32,
    /// Scheduler ticks since power-on.
    pub tick_count: u32,
}

/// Checked, append-only writer over a caller-provided buffer.
///
/// Every append verifies capacity before touching the buffer, so a failed
/// encode never writes past the boundary. `finish` patches the Service Data
/// length byte and returns the final length.
struct FrameWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> FrameWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        FrameWriter { buf, len: 0 }
    }

    fn capacity(&self) -> usize {
        self.buf.len().min(ADV_MAX_SIZE)
    }

    fn push(&mut self, byte: u8) -> Result<(), EncodeError> {
        if self.len + 1 > self.capacity() {
            return Err(EncodeError::Overflow);
        }
        self.buf[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        if self.len + bytes.len() > self.capacity() {
            return Err(EncodeError::Overflow);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    fn write_u16_be(&mut self, val: u16) -> Result<(), EncodeError> {
        self.extend(&val.to_be_bytes())
    }

    fn write_u32_be(&mut self, val: u32) -> Result<(), EncodeError> {
        self.extend(&val.to_be_bytes())
    }

    fn header(&mut self, frame_type: u8) -> Result<(), EncodeError> {
        self.extend(&FRAME_PREFIX)?;
        self.push(frame_type)
    }

    fn finish(self) -> usize {
        self.buf[SERVICE_DATA_LEN_OFFSET] = (self.len - SERVICE_DATA_LEN_BASE) as u8;
        self.len
    }
}

/// Writes the shared frame opening with the given frame-type byte.
/// Exposed separately so the header layout is testable on its own.
pub fn encode_header(out: &mut [u8], frame_type: u8) -> Result<usize, EncodeError> {
    let mut w = FrameWriter::new(out);
    w.header(frame_type)?;
    Ok(w.len)
}

/// Builds a UID frame. The beacon ID is the factory device address written
/// byte-reversed: the address field convention is network byte order, so the
/// low-order address byte lands in the most significant ID position.
pub fn encode_uid(
    out: &mut [u8],
    namespace: &[u8; 10],
    device_address: &[u8; 6],
    measured_rssi: i8,
) -> Result<usize, EncodeError> {
    let mut w = FrameWriter::new(out);
    w.header(UID_FRAME_TYPE)?;
    w.push(measured_rssi as u8)?;
    w.extend(namespace)?;
    for &byte in device_address.iter().rev() {
        w.push(byte)?;
    }
    // RFU, must be zero
    w.push(0x00)?;
    w.push(0x00)?;
    Ok(w.finish())
}

/// Builds a URL frame from a scheme code and the scheme-stripped URL bytes.
pub fn encode_url(
    out: &mut [u8],
    scheme: UrlScheme,
    url: &[u8],
    measured_rssi: i8,
) -> Result<usize, EncodeError> {
    let mut w = FrameWriter::new(out);
    w.header(URL_FRAME_TYPE)?;
    w.push(measured_rssi as u8)?;
    w.push(scheme as u8)?;
    w.extend(url)?;
    Ok(w.finish())
}

/// Builds a TLM frame. All multi-byte fields are big-endian.
pub fn encode_tlm(out: &mut [u8], telemetry: &Telemetry) -> Result<usize, EncodeError> {
    let mut w = FrameWriter::new(out);
    w.header(TLM_FRAME_TYPE)?;
    w.push(TLM_VERSION)?;
    w.write_u16_be(telemetry.battery_mv)?;
    w.write_u16_be(telemetry.temperature)?;
    w.write_u32_be(telemetry.adv_count)?;
    w.write_u32_be(telemetry.tick_count)?;
    // RFU, must be zero
    w.push(0x00)?;
    w.push(0x00)?;
    Ok(w.finish())
}

/// Packs a die-temperature reading (0.25 °C units) into the TLM field:
/// integer degrees in the high byte, hundredths in the low byte.
///
/// The combination is done in sign-extending integer arithmetic. For small
/// negative readings the low byte's sign extension bleeds into the high
/// byte (e.g. -0.75 °C packs as 0xFFB5, not 0x00B5); receivers calibrated
/// against this encoding rely on it, so it is kept bit-exact.
pub fn pack_temperature(quarter_degrees: i32) -> u16 {
    let hi = (quarter_degrees / 4) as i8;
    let lo = ((quarter_degrees * 25) % 100) as i8;
    (((hi as i32) << 8) | (lo as i32)) as u16
}
