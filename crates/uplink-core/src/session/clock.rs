//! Time source for message and session identifiers.

/// Supplies the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall-clock time via `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
    }
}

/// Hands out strictly increasing millisecond stamps.
///
/// A clock reading that does not move past the last stamp is bumped to
/// `last + 1`, so two ids issued in the same millisecond never collide.
#[derive(Debug, Default)]
pub(crate) struct StampSequence {
    last: u64,
}

impl StampSequence {
    pub(crate) fn next(&mut self, now: u64) -> u64 {
        self.last = now.max(self.last + 1);
        self.last
    }
}
