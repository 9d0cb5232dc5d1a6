//! Time source backed by the embassy time driver

use embassy_time::{block_for, Duration, Instant};

use marquee_core::traits::Clock;

pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    fn sleep_ms(&mut self, ms: u32) {
        block_for(Duration::from_millis(ms as u64));
    }
}
