use rtsim_api::{
    CANONICAL_RECORD_SIZE, DelayProfile, MICROS_PER_SECOND, PacedRecord, RecordSink, ReplayError,
    Timestamp,
};
use tokio::time::Instant;

use crate::stream::Scheduled;

/// 1 Hz test record; duration in seconds equals the sample count.
#[derive(Debug, Clone)]
pub struct Rec {
    pub key: String,
    pub begin: Timestamp,
    pub count: u32,
    pub size: usize,
    pub tag: u32,
}

impl Rec {
    pub fn new(key: &str, begin_secs: i64, dur_secs: u32) -> Self {
        Self {
            key: key.to_string(),
            begin: Timestamp::from_micros(begin_secs * MICROS_PER_SECOND),
            count: dur_secs,
            size: CANONICAL_RECORD_SIZE,
            tag: 0,
        }
    }

    pub fn tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
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
        self.size
    }
    fn as_bytes(&self) -> &[u8] {
        &[]
    }
}

/// 10 s records `(key, begin seconds)`.
pub fn records(spec: &[(&str, i64)]) -> Vec<Result<Rec, ReplayError>> {
    spec.iter().map(|&(k, t)| Ok(Rec::new(k, t, 10))).collect()
}

pub fn scheduled(recs: Vec<Rec>) -> Vec<Result<Scheduled<Rec>, ReplayError>> {
    recs.into_iter()
        .map(|record| Ok(Scheduled { release: record.end_time(), record }))
        .collect()
}

pub fn delays(default_secs: f64, entries: &[(&str, f64)]) -> DelayProfile {
    let mut p = DelayProfile::new(default_secs).unwrap();
    for &(k, d) in entries {
        p.insert(k, d).unwrap();
    }
    p
}

pub fn keys_of(out: &[Scheduled<Rec>]) -> Vec<String> {
    out.iter().map(|s| s.record.key.clone()).collect()
}

#[derive(Default)]
pub struct VecSink {
    pub written: Vec<(Instant, Rec)>,
    pub flushes: usize,
    pub fail_after: Option<usize>,
}

impl RecordSink<Rec> for VecSink {
    fn write_record(&mut self, record: &Rec) -> Result<(), ReplayError> {
        if self.fail_after.is_some_and(|n| self.written.len() >= n) {
            return Err(ReplayError::io("broken pipe"));
        }
        self.written.push((Instant::now(), record.clone()));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ReplayError> {
        self.flushes += 1;
        Ok(())
    }
}
