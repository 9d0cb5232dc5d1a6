//! Liveness signalling

/// Trait for the liveness watchdog
///
/// `pulse` reopens the liveness window. If the window expires the board
/// resets, which is the only restart path the runtime has.
pub trait Watchdog {
    fn pulse(&mut self);
}
