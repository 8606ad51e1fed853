use rtsim_api::{DelayProfile, PacedRecord, ReplayError, Timestamp};

use crate::config::ReorderConfig;
use crate::reorder::{ReorderBuffer, ReorderStats};

/// A record together with the logical time it is due.
///
/// `release` is the raw end time, plus the source delay when a delay
/// profile is active.
#[derive(Debug, Clone)]
pub struct Scheduled<R> {
    pub release: Timestamp,
    pub record: R,
}

/// Stage used when no delay profile is given: input order, release = end time.
pub struct PassThrough<I> {
    source: I,
}

impl<I> PassThrough<I> {
    pub fn new(source: I) -> Self {
        Self { source }
    }
}

impl<I, R, E> Iterator for PassThrough<I>
where
    I: Iterator<Item = Result<R, E>>,
    R: PacedRecord,
    E: Into<ReplayError>,
{
    type Item = Result<Scheduled<R>, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next().map(|item| {
            item.map(|record| Scheduled { release: record.end_time(), record })
                .map_err(Into::into)
        })
    }
}

/// Either stage behind one iterator, so the scheduler consumes both the
/// same way.
pub enum RecordStream<I, R> {
    Direct(PassThrough<I>),
    Reordered(ReorderBuffer<I, R>),
}

impl<I, R, E> RecordStream<I, R>
where
    I: Iterator<Item = Result<R, E>>,
    R: PacedRecord,
    E: Into<ReplayError>,
{
    pub fn new(source: I, delays: Option<DelayProfile>, config: ReorderConfig) -> Self {
        match delays {
            Some(profile) => RecordStream::Reordered(ReorderBuffer::new(source, profile, config)),
            None => RecordStream::Direct(PassThrough::new(source)),
        }
    }

    pub fn reorder_stats(&self) -> Option<ReorderStats> {
        match self {
            RecordStream::Direct(_) => None,
            RecordStream::Reordered(buf) => Some(buf.stats()),
        }
    }
}

impl<I, R, E> Iterator for RecordStream<I, R>
where
    I: Iterator<Item = Result<R, E>>,
    R: PacedRecord,
    E: Into<ReplayError>,
{
    type Item = Result<Scheduled<R>, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RecordStream::Direct(s) => s.next(),
            RecordStream::Reordered(s) => s.next(),
        }
    }
}
