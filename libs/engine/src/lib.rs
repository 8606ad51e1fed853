//! Real-time playback engine.
//!
//! ```text
//! record source ─▶ [ReorderBuffer | PassThrough] ─▶ PacingScheduler ─▶ RecordSink
//! ```
//!
//! Both stages are plain iterators yielding [`Scheduled`] records, so the
//! scheduler consumes either through the same interface. Everything runs on
//! one task; the only suspension point is the pacing sleep.

pub mod clock;
pub mod config;
pub mod error;
mod pacing;
mod reorder;
mod stream;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use config::{MarginPolicy, PacingConfig, ReorderConfig, TimeMode};
pub use error::EngineError;
pub use pacing::{
    Anchor, MAX_PACING_WAIT, PACING_EPSILON_MICROS, PacingPhase, PacingScheduler, PacingState,
    PlaybackSummary,
};
pub use reorder::{ReorderBuffer, ReorderStats};
pub use stream::{PassThrough, RecordStream, Scheduled};
