#![allow(dead_code)]

use rtsim_api::{
    CANONICAL_RECORD_SIZE, MICROS_PER_SECOND, PacedRecord, RecordSink, ReplayError, Timestamp,
};
use rtsim_engine::Clock;
use tokio::time::Instant;

/// 1 Hz record; `count` seconds long.
#[derive(Debug, Clone)]
pub struct Rec {
    pub key: String,
    pub begin: Timestamp,
    pub count: u32,
    pub index: usize,
}

impl Rec {
    pub fn ending_at(key: &str, end_secs: i64, dur_secs: u32) -> Self {
        Self {
            key: key.to_string(),
            begin: Timestamp::from_micros((end_secs - dur_secs as i64) * MICROS_PER_SECOND),
            count: dur_secs,
            index: 0,
        }
    }
}

impl PacedRecord for Rec {
    fn source_key(&self) -> &str {
        &self.key
    }
    fn begin_time(&self) -> Timestamp {
        self.begin
    }
    fn set_begin_time(&mut self, begin: Timestamp) {
        self.begin = begin;
    }
    fn sample_count(&self) -> u32 {
        self.count
    }
    fn sample_rate(&self) -> f64 {
        1.0
    }
    fn byte_size(&self) -> usize {
        CANONICAL_RECORD_SIZE
    }
    fn as_bytes(&self) -> &[u8] {
        &[]
    }
}

/// Number records by input position.
pub fn indexed(recs: Vec<Rec>) -> Vec<Result<Rec, ReplayError>> {
    recs.into_iter()
        .enumerate()
        .map(|(index, r)| Ok(Rec { index, ..r }))
        .collect()
}

/// UTC clock that follows tokio's (paused) virtual time.
pub struct VirtualClock {
    utc_origin: Timestamp,
    mono_origin: Instant,
}

impl VirtualClock {
    pub fn new(utc_origin: Timestamp) -> Self {
        Self { utc_origin, mono_origin: Instant::now() }
    }
}

impl Clock for VirtualClock {
    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> Timestamp {
        let elapsed = Instant::now().saturating_duration_since(self.mono_origin);
        self.utc_origin.offset_by(elapsed.as_micros() as i64)
    }
}

/// Records what was written and when.
#[derive(Default)]
pub struct CaptureSink {
    pub written: Vec<(Instant, Rec)>,
}

impl RecordSink<Rec> for CaptureSink {
    fn write_record(&mut self, record: &Rec) -> Result<(), ReplayError> {
        self.written.push((Instant::now(), record.clone()));
        Ok(())
    }
}
