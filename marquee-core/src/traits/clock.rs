//! Time source

/// Monotonic clock with blocking sleep
///
/// The runtime is a single cooperative loop, so sleeping blocks everything,
/// including the next poll.
pub trait Clock {
    /// Milliseconds since boot
    fn now_ms(&self) -> u64;

    /// Block for `ms` milliseconds
    fn sleep_ms(&mut self, ms: u32);
}
