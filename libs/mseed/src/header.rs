use rtsim_api::{OrdinalTime, Timestamp};

/// Length of the SEED fixed section of data header.
pub const FIXED_HEADER_LEN: usize = 48;

/// Smallest record length exponent accepted in blockette 1000 (128 bytes).
pub const MIN_RECORD_EXP: u8 = 7;
/// Largest record length exponent accepted in blockette 1000 (1 MiB).
pub const MAX_RECORD_EXP: u8 = 20;

pub(crate) const BTIME_OFFSET: usize = 20;

/// Activity flag bit: time correction already applied to BTIME.
const ACTIVITY_CORRECTION_APPLIED: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    pub(crate) fn u16_at(self, buf: &[u8], off: usize) -> u16 {
        let b = [buf[off], buf[off + 1]];
        match self {
            ByteOrder::Big => u16::from_be_bytes(b),
            ByteOrder::Little => u16::from_le_bytes(b),
        }
    }

    pub(crate) fn i16_at(self, buf: &[u8], off: usize) -> i16 {
        self.u16_at(buf, off) as i16
    }

    pub(crate) fn i32_at(self, buf: &[u8], off: usize) -> i32 {
        let b = [buf[off], buf[off + 1], buf[off + 2], buf[off + 3]];
        match self {
            ByteOrder::Big => i32::from_be_bytes(b),
            ByteOrder::Little => i32::from_le_bytes(b),
        }
    }

    pub(crate) fn f32_at(self, buf: &[u8], off: usize) -> f32 {
        f32::from_bits(self.i32_at(buf, off) as u32)
    }

    pub(crate) fn put_u16(self, buf: &mut [u8], off: usize, v: u16) {
        let b = match self {
            ByteOrder::Big => v.to_be_bytes(),
            ByteOrder::Little => v.to_le_bytes(),
        };
        buf[off..off + 2].copy_from_slice(&b);
    }
}

/// Decoded fixed section of data header.
#[derive(Debug, Clone)]
pub struct FixedHeader {
    pub quality: u8,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub network: String,
    pub btime: OrdinalTime,
    pub sample_count: u16,
    pub rate_factor: i16,
    pub rate_multiplier: i16,
    pub activity_flags: u8,
    pub blockette_count: u8,
    /// Units of 0.0001 s.
    pub time_correction: i32,
    pub data_offset: u16,
    pub first_blockette: u16,
    pub order: ByteOrder,
}

impl FixedHeader {
    /// Parse the first [`FIXED_HEADER_LEN`] bytes of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self, String> {
        if buf.len() < FIXED_HEADER_LEN {
            return Err(format!("header needs {FIXED_HEADER_LEN} bytes, got {}", buf.len()));
        }

        let quality = buf[6];
        if !matches!(quality, b'D' | b'R' | b'Q' | b'M') {
            return Err(format!("unknown data quality indicator 0x{quality:02x}"));
        }

        let order = detect_byte_order(buf)
            .ok_or_else(|| "cannot determine byte order from start time".to_string())?;

        let hour = buf[BTIME_OFFSET + 4];
        let minute = buf[BTIME_OFFSET + 5];
        let second = buf[BTIME_OFFSET + 6];
        let fract = order.u16_at(buf, BTIME_OFFSET + 8);
        // second == 60 is a leap second; fold it into the next minute via arithmetic
        if hour > 23 || minute > 59 || second > 60 || fract > 9999 {
            return Err(format!(
                "invalid start time {hour:02}:{minute:02}:{second:02}.{fract:04}"
            ));
        }

        Ok(Self {
            quality,
            station: ascii(&buf[8..13]),
            location: ascii(&buf[13..15]),
            channel: ascii(&buf[15..18]),
            network: ascii(&buf[18..20]),
            btime: OrdinalTime {
                year: order.u16_at(buf, BTIME_OFFSET) as i64,
                day_of_year: order.u16_at(buf, BTIME_OFFSET + 2) as u32,
                hour: hour as u32,
                minute: minute as u32,
                second: second as u32,
                micros: fract as u32 * 100,
            },
            sample_count: order.u16_at(buf, 30),
            rate_factor: order.i16_at(buf, 32),
            rate_multiplier: order.i16_at(buf, 34),
            activity_flags: buf[36],
            blockette_count: buf[39],
            time_correction: order.i32_at(buf, 40),
            data_offset: order.u16_at(buf, 44),
            first_blockette: order.u16_at(buf, 46),
            order,
        })
    }

    /// Nominal sample rate from factor and multiplier (SEED manual, fixed header field 10/11).
    pub fn nominal_rate(&self) -> f64 {
        let f = self.rate_factor as f64;
        let m = if self.rate_multiplier == 0 { 1.0 } else { self.rate_multiplier as f64 };
        match (f > 0.0, m > 0.0) {
            _ if f == 0.0 => 0.0,
            (true, true) => f * m,
            (true, false) => -f / m,
            (false, true) => -m / f,
            (false, false) => 1.0 / (f * m),
        }
    }

    /// Correction still to be added to BTIME, in microseconds.
    pub fn pending_correction_micros(&self) -> i64 {
        if self.activity_flags & ACTIVITY_CORRECTION_APPLIED != 0 {
            0
        } else {
            self.time_correction as i64 * 100
        }
    }

    pub fn source_key(&self) -> String {
        format!("{}.{}.{}.{}", self.network, self.station, self.location, self.channel)
    }
}

fn ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

fn plausible_btime(order: ByteOrder, buf: &[u8]) -> bool {
    let year = order.u16_at(buf, BTIME_OFFSET);
    let day = order.u16_at(buf, BTIME_OFFSET + 2);
    (1900..=2100).contains(&year) && (1..=366).contains(&day)
}

fn detect_byte_order(buf: &[u8]) -> Option<ByteOrder> {
    [ByteOrder::Big, ByteOrder::Little]
        .into_iter()
        .find(|&o| plausible_btime(o, buf))
}

/// Encode `t` into the 10-byte BTIME at [`BTIME_OFFSET`].
/// Sub-100 µs precision is dropped; callers store it in blockette 1001.
pub(crate) fn write_btime(buf: &mut [u8], order: ByteOrder, t: Timestamp) {
    let o = t.to_ordinal();
    order.put_u16(buf, BTIME_OFFSET, o.year as u16);
    order.put_u16(buf, BTIME_OFFSET + 2, o.day_of_year as u16);
    buf[BTIME_OFFSET + 4] = o.hour as u8;
    buf[BTIME_OFFSET + 5] = o.minute as u8;
    buf[BTIME_OFFSET + 6] = o.second as u8;
    buf[BTIME_OFFSET + 7] = 0;
    order.put_u16(buf, BTIME_OFFSET + 8, (o.micros / 100) as u16);
}
