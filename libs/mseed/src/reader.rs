use std::io::{ErrorKind, Read};

use crate::error::MseedError;
use crate::header::{FIXED_HEADER_LEN, FixedHeader, MAX_RECORD_EXP, MIN_RECORD_EXP};
use crate::record::{Blockettes, MseedRecord};

/// Blockette 1000 must sit inside the smallest legal record.
const BLOCKETTE_SCAN_LIMIT: usize = 1 << MIN_RECORD_EXP;
const MAX_BLOCKETTES: usize = 32;

/// Lazy, single-pass reader over a stream of concatenated miniSEED records.
///
/// Stops cleanly at EOF on a record boundary; EOF inside a record is
/// [`MseedError::Truncated`]. After the first error the reader is fused
/// and yields `None`.
pub struct MseedReader<R> {
    inner: R,
    offset: u64,
    records: u64,
    failed: bool,
}

impl<R: Read> MseedReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0, records: 0, failed: false }
    }

    /// Records decoded so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn read_record(&mut self) -> Result<Option<MseedRecord>, MseedError> {
        let start = self.offset;
        let mut buf = vec![0u8; FIXED_HEADER_LEN];
        let got = read_full(&mut self.inner, &mut buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < FIXED_HEADER_LEN {
            return Err(MseedError::Truncated { offset: start, needed: FIXED_HEADER_LEN, got });
        }

        let header = FixedHeader::parse(&buf).map_err(|d| MseedError::format(start, d))?;
        let blockettes = self.walk_blockettes(&mut buf, &header, start)?;

        let record_len = blockettes
            .record_len
            .ok_or_else(|| MseedError::format(start, "missing blockette 1000"))?;
        if buf.len() > record_len {
            return Err(MseedError::format(
                start,
                format!("blockettes extend past record length {record_len}"),
            ));
        }
        self.fill_to(&mut buf, record_len, start)?;

        self.offset = start + record_len as u64;
        self.records += 1;
        Ok(Some(MseedRecord::new(buf, header, blockettes)))
    }

    fn walk_blockettes(
        &mut self,
        buf: &mut Vec<u8>,
        header: &FixedHeader,
        start: u64,
    ) -> Result<Blockettes, MseedError> {
        let order = header.order;
        let mut found = Blockettes::default();
        let mut off = header.first_blockette as usize;

        for _ in 0..MAX_BLOCKETTES {
            if off == 0 {
                return Ok(found);
            }
            if off < FIXED_HEADER_LEN {
                return Err(MseedError::format(start, format!("blockette offset {off} inside fixed header")));
            }
            let limit = found.record_len.unwrap_or(BLOCKETTE_SCAN_LIMIT);
            if off + 8 > limit {
                return Err(MseedError::format(start, format!("blockette at {off} beyond {limit} bytes")));
            }
            self.fill_to(buf, off + 8, start)?;

            let kind = order.u16_at(buf, off);
            let next = order.u16_at(buf, off + 2) as usize;
            match kind {
                1000 => {
                    let exp = buf[off + 6];
                    if !(MIN_RECORD_EXP..=MAX_RECORD_EXP).contains(&exp) {
                        return Err(MseedError::format(start, format!("record length exponent {exp} out of range")));
                    }
                    found.record_len = Some(1usize << exp);
                }
                100 => found.actual_rate = Some(order.f32_at(buf, off + 4)),
                1001 => {
                    found.usec = buf[off + 5] as i8;
                    found.usec_offset = Some(off + 5);
                }
                other => tracing::trace!(blockette = other, offset = off, "skipping blockette"),
            }

            if next != 0 && next <= off {
                return Err(MseedError::format(start, "blockette chain does not advance"));
            }
            off = next;
        }

        Err(MseedError::format(start, format!("more than {MAX_BLOCKETTES} blockettes")))
    }

    /// Grow `buf` to `len` bytes from the stream.
    fn fill_to(&mut self, buf: &mut Vec<u8>, len: usize, start: u64) -> Result<(), MseedError> {
        let have = buf.len();
        if have >= len {
            return Ok(());
        }
        buf.resize(len, 0);
        let got = read_full(&mut self.inner, &mut buf[have..])?;
        if have + got < len {
            return Err(MseedError::Truncated { offset: start, needed: len, got: have + got });
        }
        Ok(())
    }
}

impl<R: Read> Iterator for MseedReader<R> {
    type Item = Result<MseedRecord, MseedError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Read until `buf` is full or EOF. Returns bytes read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
