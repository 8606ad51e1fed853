use tokio::time::Instant;

use rtsim_api::Timestamp;

/// Time sources used by the pacing scheduler.
///
/// Pacing arithmetic and sleeping run on the monotonic axis; the UTC
/// reading is only used to compute the realtime offset and latencies.
pub trait Clock {
    fn monotonic(&self) -> Instant;
    fn utc_now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> Timestamp {
        Timestamp::now()
    }
}
