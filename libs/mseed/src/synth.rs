//! Builder for well-formed test records.

use crate::ByteOrder;

/// Fields of one synthetic record. Defaults describe a 512-byte big-endian
/// GE.APE..BHZ record at 2020-02-01 10:20:30.1234, 412 samples at 20 Hz.
pub struct Synth {
    pub order: ByteOrder,
    pub station: &'static str,
    pub network: &'static str,
    pub location: &'static str,
    pub channel: &'static str,
    pub year: u16,
    pub day: u16,
    pub hms: (u8, u8, u8),
    pub fract: u16,
    pub nsamp: u16,
    pub factor: i16,
    pub multiplier: i16,
    pub activity: u8,
    pub correction: i32,
    pub exp: u8,
    pub usec: Option<i8>,
    pub actual_rate: Option<f32>,
    pub with_b1000: bool,
}

impl Default for Synth {
    fn default() -> Self {
        Self {
            order: ByteOrder::Big,
            station: "APE",
            network: "GE",
            location: "",
            channel: "BHZ",
            year: 2020,
            day: 32,
            hms: (10, 20, 30),
            fract: 1234,
            nsamp: 412,
            factor: 20,
            multiplier: 1,
            activity: 0x02,
            correction: 0,
            exp: 9,
            usec: None,
            actual_rate: None,
            with_b1000: true,
        }
    }
}

fn put_u16(buf: &mut [u8], off: usize, order: ByteOrder, v: u16) {
    let b = match order {
        ByteOrder::Big => v.to_be_bytes(),
        ByteOrder::Little => v.to_le_bytes(),
    };
    buf[off..off + 2].copy_from_slice(&b);
}

fn put_u32(buf: &mut [u8], off: usize, order: ByteOrder, v: u32) {
    let b = match order {
        ByteOrder::Big => v.to_be_bytes(),
        ByteOrder::Little => v.to_le_bytes(),
    };
    buf[off..off + 4].copy_from_slice(&b);
}

fn padded(s: &str, n: usize) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.resize(n, b' ');
    v
}

pub fn synth(s: Synth) -> Vec<u8> {
    let o = s.order;
    let mut buf = vec![0u8; 1 << s.exp];
    buf[0..6].copy_from_slice(b"000001");
    buf[6] = b'D';
    buf[7] = b' ';
    buf[8..13].copy_from_slice(&padded(s.station, 5));
    buf[13..15].copy_from_slice(&padded(s.location, 2));
    buf[15..18].copy_from_slice(&padded(s.channel, 3));
    buf[18..20].copy_from_slice(&padded(s.network, 2));
    put_u16(&mut buf, 20, o, s.year);
    put_u16(&mut buf, 22, o, s.day);
    buf[24] = s.hms.0;
    buf[25] = s.hms.1;
    buf[26] = s.hms.2;
    put_u16(&mut buf, 28, o, s.fract);
    put_u16(&mut buf, 30, o, s.nsamp);
    put_u16(&mut buf, 32, o, s.factor as u16);
    put_u16(&mut buf, 34, o, s.multiplier as u16);
    buf[36] = s.activity;
    put_u32(&mut buf, 40, o, s.correction as u32);

    let mut blocks: Vec<(u16, Vec<u8>)> = Vec::new();
    if s.with_b1000 {
        blocks.push((1000, vec![10, if o == ByteOrder::Big { 1 } else { 0 }, s.exp, 0]));
    }
    if let Some(us) = s.usec {
        blocks.push((1001, vec![100, us as u8, 0, 1]));
    }
    if let Some(rate) = s.actual_rate {
        let mut body = vec![0u8; 8];
        put_u32(&mut body, 0, o, rate.to_bits());
        blocks.push((100, body));
    }

    let mut off = 48usize;
    buf[39] = blocks.len() as u8;
    put_u16(&mut buf, 46, o, if blocks.is_empty() { 0 } else { 48 });
    let count = blocks.len();
    for (i, (kind, body)) in blocks.into_iter().enumerate() {
        let len = 4 + body.len();
        let next = if i + 1 == count { 0 } else { off + len };
        put_u16(&mut buf, off, o, kind);
        put_u16(&mut buf, off + 2, o, next as u16);
        buf[off + 4..off + len].copy_from_slice(&body);
        off += len;
    }
    put_u16(&mut buf, 44, o, 64.max(off as u16));
    buf
}
