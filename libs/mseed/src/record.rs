use rtsim_api::{PacedRecord, Timestamp};

use crate::header::{FixedHeader, write_btime};

/// Values collected while walking the blockette chain.
#[derive(Debug, Clone, Default)]
pub struct Blockettes {
    /// From blockette 1000, in bytes.
    pub record_len: Option<usize>,
    /// Actual sample rate from blockette 100.
    pub actual_rate: Option<f32>,
    /// Absolute byte offset of the blockette 1001 microsecond field.
    pub usec_offset: Option<usize>,
    /// Microsecond offset from blockette 1001.
    pub usec: i8,
}

/// One miniSEED record: the raw bytes plus the metadata the player needs.
#[derive(Debug, Clone)]
pub struct MseedRecord {
    raw: Vec<u8>,
    header: FixedHeader,
    key: String,
    begin: Timestamp,
    sample_rate: f64,
    usec_offset: Option<usize>,
}

impl MseedRecord {
    pub(crate) fn new(raw: Vec<u8>, header: FixedHeader, blockettes: Blockettes) -> Self {
        let begin = Timestamp::from_ordinal(header.btime)
            .offset_by(blockettes.usec as i64)
            .offset_by(header.pending_correction_micros());
        let sample_rate = match blockettes.actual_rate {
            Some(r) if r > 0.0 && r.is_finite() => r as f64,
            _ => header.nominal_rate(),
        };
        Self {
            raw,
            key: header.source_key(),
            header,
            begin,
            sample_rate,
            usec_offset: blockettes.usec_offset,
        }
    }

    pub fn network(&self) -> &str {
        &self.header.network
    }

    pub fn station(&self) -> &str {
        &self.header.station
    }

    pub fn location(&self) -> &str {
        &self.header.location
    }

    pub fn channel(&self) -> &str {
        &self.header.channel
    }
}

impl PacedRecord for MseedRecord {
    fn source_key(&self) -> &str {
        &self.key
    }

    fn begin_time(&self) -> Timestamp {
        self.begin
    }

    fn set_begin_time(&mut self, begin: Timestamp) {
        self.begin = begin;
        let encoded = begin.offset_by(-self.header.pending_correction_micros());
        let order = self.header.order;
        match self.usec_offset {
            Some(off) => {
                let micros = encoded.as_micros();
                let coarse = micros - micros.rem_euclid(100);
                self.raw[off] = micros.rem_euclid(100) as i8 as u8;
                write_btime(&mut self.raw, order, Timestamp::from_micros(coarse));
            }
            None => write_btime(&mut self.raw, order, encoded),
        }
        self.header.btime = Timestamp::from_micros(
            encoded.as_micros() - encoded.as_micros().rem_euclid(100),
        )
        .to_ordinal();
    }

    fn sample_count(&self) -> u32 {
        self.header.sample_count as u32
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn byte_size(&self) -> usize {
        self.raw.len()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}
