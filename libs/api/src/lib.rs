mod delay;
mod error;
mod time;

pub use delay::DelayProfile;
pub use error::{ErrorKind, ReplayError};
pub use time::{
    MICROS_PER_SECOND, OrdinalTime, Timestamp, civil_from_days, days_from_civil, micros_to_secs,
    secs_to_micros,
};

/// Size of a canonical SeedLink-compatible record in bytes.
pub const CANONICAL_RECORD_SIZE: usize = 512;

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// One timestamped unit of the replayed stream.
///
/// The engine treats the payload as opaque bytes and only looks at the
/// timing, size and source metadata exposed here. The begin time is the
/// only mutable attribute; the pacing scheduler rewrites it at most once.
pub trait PacedRecord {
    /// Identifier of the originating channel, e.g. `NET.STA.LOC.CHA`.
    fn source_key(&self) -> &str;

    /// Time of the first sample.
    fn begin_time(&self) -> Timestamp;

    /// Replace the begin time, keeping the encoded bytes consistent.
    fn set_begin_time(&mut self, begin: Timestamp);

    fn sample_count(&self) -> u32;

    /// Samples per second. Zero for records without a time series.
    fn sample_rate(&self) -> f64;

    /// Encoded length (header + payload).
    fn byte_size(&self) -> usize;

    /// Encoded record as it goes to the sink.
    fn as_bytes(&self) -> &[u8];

    /// `sample_count / sample_rate` in microseconds.
    fn duration_micros(&self) -> i64 {
        let rate = self.sample_rate();
        if rate > 0.0 && rate.is_finite() {
            secs_to_micros(self.sample_count() as f64 / rate)
        } else {
            0
        }
    }

    /// Raw end time: `begin_time + duration`.
    fn end_time(&self) -> Timestamp {
        self.begin_time().offset_by(self.duration_micros())
    }
}

// ════════════════════════════════════════════════════════════════
//  Sink
// ════════════════════════════════════════════════════════════════

/// Destination of emitted records. Writes are blocking; a failed write
/// ends the run.
pub trait RecordSink<R: PacedRecord> {
    /// Write one whole record as a single operation.
    fn write_record(&mut self, record: &R) -> Result<(), ReplayError>;

    fn flush(&mut self) -> Result<(), ReplayError> {
        Ok(())
    }
}

impl<R: PacedRecord, S: RecordSink<R> + ?Sized> RecordSink<R> for Box<S> {
    fn write_record(&mut self, record: &R) -> Result<(), ReplayError> {
        (**self).write_record(record)
    }

    fn flush(&mut self) -> Result<(), ReplayError> {
        (**self).flush()
    }
}
