use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rtsim_api::{DelayProfile, PacedRecord, ReplayError, Timestamp};

use crate::config::ReorderConfig;
use crate::stream::Scheduled;

/// Counters describing how much buffering a run needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReorderStats {
    pub pushed: u64,
    pub peak_pending: usize,
    /// Entries released early because `max_pending` was exceeded.
    pub forced_releases: u64,
    /// Inputs whose raw end time went backwards.
    pub regressions: u64,
}

/// Heap entry ordered so that `BinaryHeap` pops the smallest
/// `(release, seq)` first.
struct PendingEntry<R> {
    release: Timestamp,
    seq: u64,
    record: R,
}

impl<R> PartialEq for PendingEntry<R> {
    fn eq(&self, other: &Self) -> bool {
        self.release == other.release && self.seq == other.seq
    }
}

impl<R> Eq for PendingEntry<R> {}

impl<R> Ord for PendingEntry<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .release
            .cmp(&self.release)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<R> PartialOrd for PendingEntry<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Streaming reorder by release time (`raw end + delay(source)`).
///
/// Input must arrive with non-decreasing raw end times. An entry is
/// released as soon as `release - margin < latest raw end seen`: every
/// later input ends no earlier than that and is delayed by at least the
/// margin, so nothing can overtake it. Equal release times leave in
/// insertion order. Buffer size is bounded by the records inside one
/// delay-spread window of raw time, not by the input length.
pub struct ReorderBuffer<I, R> {
    source: I,
    profile: DelayProfile,
    margin_micros: i64,
    max_pending: Option<usize>,
    heap: BinaryHeap<PendingEntry<R>>,
    next_seq: u64,
    latest_end: Option<Timestamp>,
    exhausted: bool,
    failed: bool,
    stats: ReorderStats,
}

impl<I, R, E> ReorderBuffer<I, R>
where
    I: Iterator<Item = Result<R, E>>,
    R: PacedRecord,
    E: Into<ReplayError>,
{
    pub fn new(source: I, profile: DelayProfile, config: ReorderConfig) -> Self {
        let margin_micros = config.margin_micros(&profile);
        tracing::info!(
            entries = profile.len(),
            default_s = rtsim_api::micros_to_secs(profile.default_micros()),
            spread_s = rtsim_api::micros_to_secs(profile.spread_micros()),
            margin = %config.margin,
            margin_s = rtsim_api::micros_to_secs(margin_micros),
            max_pending = ?config.max_pending,
            "reordering by delay profile"
        );
        Self {
            source,
            profile,
            margin_micros,
            max_pending: config.max_pending,
            heap: BinaryHeap::new(),
            next_seq: 0,
            latest_end: None,
            exhausted: false,
            failed: false,
            stats: ReorderStats::default(),
        }
    }

    pub fn stats(&self) -> ReorderStats {
        self.stats
    }

    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    fn releasable(&self) -> bool {
        match (self.heap.peek(), self.latest_end) {
            (Some(top), Some(latest)) => {
                top.release.as_micros().saturating_sub(self.margin_micros) < latest.as_micros()
            }
            _ => false,
        }
    }

    fn push(&mut self, record: R) {
        let end = record.end_time();
        match self.latest_end {
            Some(latest) if end < latest => {
                self.stats.regressions += 1;
                if self.stats.regressions == 1 {
                    tracing::warn!(
                        source = %record.source_key(),
                        end = %end,
                        latest = %latest,
                        "input not sorted by end time, output order is best-effort"
                    );
                }
            }
            _ => self.latest_end = Some(end),
        }

        let release = end.offset_by(self.profile.delay_micros(record.source_key()));
        self.heap.push(PendingEntry { release, seq: self.next_seq, record });
        self.next_seq += 1;
        self.stats.pushed += 1;
        self.stats.peak_pending = self.stats.peak_pending.max(self.heap.len());
    }

    fn pop(&mut self) -> Option<Scheduled<R>> {
        self.heap
            .pop()
            .map(|e| Scheduled { release: e.release, record: e.record })
    }

    fn over_cap(&self) -> bool {
        match self.max_pending {
            Some(cap) => self.heap.len() > cap,
            None => false,
        }
    }
}

impl<I, R, E> Iterator for ReorderBuffer<I, R>
where
    I: Iterator<Item = Result<R, E>>,
    R: PacedRecord,
    E: Into<ReplayError>,
{
    type Item = Result<Scheduled<R>, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if self.releasable() {
                return self.pop().map(Ok);
            }
            if self.exhausted {
                return self.pop().map(Ok);
            }

            match self.source.next() {
                None => {
                    self.exhausted = true;
                    tracing::debug!(
                        pushed = self.stats.pushed,
                        peak_pending = self.stats.peak_pending,
                        draining = self.heap.len(),
                        "input exhausted"
                    );
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e.into()));
                }
                Some(Ok(record)) => {
                    self.push(record);
                    if self.over_cap() {
                        self.stats.forced_releases += 1;
                        if self.stats.forced_releases == 1 {
                            tracing::warn!(
                                max_pending = ?self.max_pending,
                                "reorder buffer full, releasing early; order may be violated"
                            );
                        }
                        return self.pop().map(Ok);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarginPolicy;
    use crate::testing::{Rec, delays, keys_of, records};

    fn zero_margin() -> ReorderConfig {
        ReorderConfig { margin: MarginPolicy::Zero, max_pending: None }
    }

    #[test]
    fn slow_station_is_pushed_back() {
        // 10 s records from two stations, B delayed by 25 s
        let input = records(&[("A", 0), ("B", 0), ("A", 10), ("B", 10), ("A", 20), ("A", 30), ("A", 40)]);
        let profile = delays(0.0, &[("B", 25.0)]);
        let out: Vec<_> = ReorderBuffer::new(input.into_iter(), profile, zero_margin())
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(keys_of(&out), ["A", "A", "A", "B", "A", "B", "A"]);
        let releases: Vec<i64> = out.iter().map(|s| s.release.as_micros() / 1_000_000).collect();
        assert_eq!(releases, [10, 20, 30, 35, 40, 45, 50]);
    }

    #[test]
    fn equal_release_keeps_input_order() {
        let input = vec![
            Ok::<_, ReplayError>(Rec::new("A", 0, 10).tag(1)),
            Ok(Rec::new("B", 5, 5).tag(2)),
            Ok(Rec::new("C", 0, 10).tag(3)),
        ];
        let out: Vec<_> = ReorderBuffer::new(input.into_iter(), delays(0.0, &[]), zero_margin())
            .map(|s| s.unwrap().record.tag)
            .collect();
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn source_error_is_forwarded_once() {
        let input = vec![
            Ok(Rec::new("A", 0, 10)),
            Err(ReplayError::io("disk gone")),
            Ok(Rec::new("A", 10, 10)),
        ];
        let mut buf = ReorderBuffer::new(input.into_iter(), delays(5.0, &[]), zero_margin());
        let err = buf.next().unwrap().unwrap_err();
        assert_eq!(err.message(), "disk gone");
        assert!(buf.next().is_none());
    }

    #[test]
    fn cap_forces_early_release() {
        let input = records(&[("A", 0), ("A", 10), ("A", 20), ("A", 30), ("A", 40)]);
        let cfg = ReorderConfig { margin: MarginPolicy::Zero, max_pending: Some(2) };
        let mut buf = ReorderBuffer::new(input.into_iter(), delays(100.0, &[]), cfg);
        let out: Vec<_> = buf.by_ref().collect::<Result<_, _>>().unwrap();

        assert_eq!(out.len(), 5);
        let stats = buf.stats();
        assert_eq!(stats.peak_pending, 3);
        assert_eq!(stats.forced_releases, 3);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn regression_is_counted() {
        let input = records(&[("A", 20), ("A", 0), ("A", 30)]);
        let mut buf = ReorderBuffer::new(input.into_iter(), delays(0.0, &[]), zero_margin());
        let n = buf.by_ref().count();
        assert_eq!(n, 3);
        assert_eq!(buf.stats().regressions, 1);
    }

    #[test]
    fn profile_min_margin_releases_sooner() {
        let make = || records(&[("A", 0), ("A", 10), ("A", 20)]);
        let profile = delays(30.0, &[]);

        let mut zero = ReorderBuffer::new(make().into_iter(), profile.clone(), zero_margin());
        zero.next();
        // nothing is older than the newest end time until the input runs out
        assert_eq!(zero.stats().pushed, 3);

        let mut min = ReorderBuffer::new(make().into_iter(), profile, ReorderConfig::default());
        min.next();
        assert_eq!(min.stats().pushed, 2);
    }
}
