//! Liveness watchdog
//!
//! The main loop pulses a timestamp once per poll cycle. Core 1 feeds the
//! hardware watchdog only while the last pulse is inside the liveness window,
//! so a stalled loop resets the board.

use defmt::*;
use embassy_rp::watchdog::Watchdog as HardwareWatchdog;
use embassy_time::{Duration, Instant, Ticker};
use portable_atomic::{AtomicU64, Ordering};

use marquee_core::traits::Watchdog;

/// Longest the main loop may go without pulsing
pub const LIVENESS_WINDOW_MS: u64 = 300_000;

/// Hardware timeout; must stay below the RP2040 limit of about 8 s
const HARDWARE_TIMEOUT_MS: u64 = 2_000;

const FEED_PERIOD_MS: u64 = 500;

/// Milliseconds since boot at the last pulse
static LAST_PULSE_MS: AtomicU64 = AtomicU64::new(0);

/// Main loop side of the watchdog
pub struct LivenessWatchdog;

impl Watchdog for LivenessWatchdog {
    fn pulse(&mut self) {
        LAST_PULSE_MS.store(Instant::now().as_millis(), Ordering::Relaxed);
    }
}

/// Feed the hardware watchdog while the main loop is alive
#[embassy_executor::task]
pub async fn watchdog_task(mut watchdog: HardwareWatchdog, window_ms: u64) {
    watchdog.start(Duration::from_millis(HARDWARE_TIMEOUT_MS));
    info!("Watchdog armed, liveness window {} ms", window_ms);

    let mut ticker = Ticker::every(Duration::from_millis(FEED_PERIOD_MS));
    let mut expired = false;
    loop {
        ticker.next().await;
        let silent = Instant::now()
            .as_millis()
            .saturating_sub(LAST_PULSE_MS.load(Ordering::Relaxed));
        if silent <= window_ms {
            watchdog.feed();
        } else if !expired {
            error!("Main loop silent for {} ms, resetting", silent);
            expired = true;
        }
    }
}
