use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use rtsim_api::{
    CANONICAL_RECORD_SIZE, PacedRecord, RecordSink, ReplayError, Timestamp, micros_to_secs,
};

use crate::clock::Clock;
use crate::config::{PacingConfig, TimeMode};
use crate::error::EngineError;
use crate::stream::Scheduled;

/// Added to every pacing sleep so a wake-up never lands just short of the deadline.
pub const PACING_EPSILON_MICROS: i64 = 1_000;

/// Longest single pacing sleep; longer waits are split.
pub const MAX_PACING_WAIT: Duration = Duration::from_secs(3_600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPhase {
    Init,
    Skipping,
    Active,
    Done,
}

/// Fixed at the first record and never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub wall_start: Instant,
    pub logical_start: Timestamp,
}

#[derive(Debug, Clone)]
pub struct PacingState {
    pub phase: PacingPhase,
    pub anchor: Option<Anchor>,
    /// Release time of the record that crossed the jump threshold.
    /// Pacing measures logical progress from here once set.
    pub resume_from: Option<Timestamp>,
    /// Realtime mode: `utc_now - end_time` of the first emitted record.
    pub time_offset_micros: Option<i64>,
}

impl PacingState {
    fn new() -> Self {
        Self {
            phase: PacingPhase::Init,
            anchor: None,
            resume_from: None,
            time_offset_micros: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub read: u64,
    pub emitted: u64,
    pub skipped_jump: u64,
    pub skipped_size: u64,
    pub interrupted: bool,
    pub time_offset_micros: Option<i64>,
}

/// Emits each record no earlier than `speed` x real elapsed time allows.
///
/// Only throttles: a record that is already late is written at once and
/// the scheduler never tries to catch up.
pub struct PacingScheduler<C> {
    config: PacingConfig,
    clock: C,
    state: PacingState,
    summary: PlaybackSummary,
}

impl<C: Clock> PacingScheduler<C> {
    pub fn new(config: PacingConfig, clock: C) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            state: PacingState::new(),
            summary: PlaybackSummary::default(),
        })
    }

    pub fn state(&self) -> &PacingState {
        &self.state
    }

    pub fn summary(&self) -> &PlaybackSummary {
        &self.summary
    }

    /// Drop all run state so the scheduler can drive another stream.
    pub fn reset(&mut self) {
        self.state = PacingState::new();
        self.summary = PlaybackSummary::default();
    }

    /// Play `stream` into `sink` until it ends, fails or `cancel` fires.
    ///
    /// Cancellation is observed before every record and during the pacing
    /// sleep; it ends the run successfully with `interrupted` set. Each run
    /// starts from a fresh anchor.
    pub async fn run<R, S, K>(
        &mut self,
        stream: S,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<PlaybackSummary, EngineError>
    where
        R: PacedRecord,
        S: IntoIterator<Item = Result<Scheduled<R>, ReplayError>>,
        K: RecordSink<R> + ?Sized,
    {
        if self.state.phase != PacingPhase::Init {
            self.reset();
        }
        let result = self.drive(stream, sink, cancel).await;
        self.state.phase = PacingPhase::Done;
        self.summary.time_offset_micros = self.state.time_offset_micros;

        match &result {
            Ok(()) => tracing::info!(
                read = self.summary.read,
                emitted = self.summary.emitted,
                skipped_jump = self.summary.skipped_jump,
                skipped_size = self.summary.skipped_size,
                interrupted = self.summary.interrupted,
                "playback finished"
            ),
            Err(e) => tracing::error!(error = %e, emitted = self.summary.emitted, "playback aborted"),
        }
        result.map(|()| self.summary.clone())
    }

    async fn drive<R, S, K>(
        &mut self,
        stream: S,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError>
    where
        R: PacedRecord,
        S: IntoIterator<Item = Result<Scheduled<R>, ReplayError>>,
        K: RecordSink<R> + ?Sized,
    {
        for item in stream {
            if cancel.is_cancelled() {
                self.summary.interrupted = true;
                return Ok(());
            }
            let Scheduled { release, mut record } = item.map_err(EngineError::Source)?;
            self.summary.read += 1;

            if !self.admit(release) {
                continue;
            }

            if !self.config.allow_oversized && record.byte_size() != CANONICAL_RECORD_SIZE {
                tracing::warn!(
                    source = %record.source_key(),
                    begin = %record.begin_time(),
                    size = record.byte_size(),
                    "skipping record: length != {CANONICAL_RECORD_SIZE} bytes"
                );
                self.summary.skipped_size += 1;
                continue;
            }

            if !self.wait_until_due(release, cancel).await {
                self.summary.interrupted = true;
                return Ok(());
            }

            self.rewrite_begin_time(&mut record);

            sink.write_record(&record).map_err(EngineError::Sink)?;
            sink.flush().map_err(EngineError::Sink)?;
            self.summary.emitted += 1;
            self.trace_emitted(&record);
        }
        Ok(())
    }

    /// Anchor on the first record and apply the jump. `false` = discard.
    fn admit(&mut self, release: Timestamp) -> bool {
        if self.state.phase == PacingPhase::Init {
            self.state.anchor = Some(Anchor {
                wall_start: self.clock.monotonic(),
                logical_start: release,
            });
            self.state.phase = if self.config.jump_minutes > 0.0 {
                PacingPhase::Skipping
            } else {
                PacingPhase::Active
            };
            tracing::debug!(logical_start = %release, phase = ?self.state.phase, "anchored on first record");
        }

        if self.state.phase == PacingPhase::Skipping {
            let Some(anchor) = self.state.anchor else {
                return false;
            };
            let minutes = micros_to_secs(release.micros_since(anchor.logical_start)) / 60.0;
            if minutes < self.config.jump_minutes {
                self.summary.skipped_jump += 1;
                return false;
            }
            self.state.resume_from = Some(release);
            self.state.phase = PacingPhase::Active;
            tracing::info!(
                skipped = self.summary.skipped_jump,
                resume_at = %release,
                "jump complete"
            );
        }
        true
    }

    /// Sleep until `release` is due on the scaled real-time axis.
    /// Returns `false` if cancelled while waiting.
    async fn wait_until_due(&self, release: Timestamp, cancel: &CancellationToken) -> bool {
        let Some(anchor) = self.state.anchor else {
            return true;
        };
        let origin = self.state.resume_from.unwrap_or(anchor.logical_start);
        loop {
            let now = self.clock.monotonic();
            let elapsed = now.saturating_duration_since(anchor.wall_start).as_secs_f64();

            let target = origin.as_micros() as f64 + self.config.speed * elapsed * 1e6;
            let ahead = release.as_micros() as f64 - target;
            if ahead <= 0.0 {
                return true;
            }

            // very slow speeds overflow Duration; sleep in bounded steps instead
            let wait = Duration::try_from_secs_f64((ahead + PACING_EPSILON_MICROS as f64) / 1e6 / self.config.speed)
                .map_or(MAX_PACING_WAIT, |w| w.min(MAX_PACING_WAIT));
            tracing::trace!(wait_s = wait.as_secs_f64(), "pacing");
            tokio::select! {
                _ = tokio::time::sleep_until(now + wait) => {}
                _ = cancel.cancelled() => return false,
            }
        }
    }

    fn rewrite_begin_time<R: PacedRecord>(&mut self, record: &mut R) {
        if self.config.mode != TimeMode::Realtime {
            return;
        }
        let offset = match self.state.time_offset_micros {
            Some(offset) => offset,
            None => {
                let offset = self.clock.utc_now().micros_since(record.end_time());
                tracing::info!(offset_s = micros_to_secs(offset), "realtime offset fixed");
                self.state.time_offset_micros = Some(offset);
                offset
            }
        };
        record.set_begin_time(record.begin_time().offset_by(offset));
    }

    fn trace_emitted<R: PacedRecord>(&self, record: &R) {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return;
        }
        let since_start = self
            .state
            .anchor
            .map(|a| self.clock.monotonic().saturating_duration_since(a.wall_start).as_secs_f64())
            .unwrap_or_default();
        let latency = micros_to_secs(self.clock.utc_now().micros_since(record.begin_time()));
        tracing::debug!(
            source = %record.source_key(),
            since_start = format_args!("{since_start:7.2}"),
            begin = %record.begin_time(),
            latency = format_args!("{latency:7.2}"),
            "emitted"
        );
    }
}
