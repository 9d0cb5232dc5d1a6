//! HUB75 refresh loop
//!
//! Runs on core 1. The panel is scanned two rows at a time (upper and lower
//! half share a row address) and each row is shown once per bit plane, with
//! the on-time doubling per plane (binary code modulation).

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::Timer;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::matrix::{FRONT, PANEL_HEIGHT, PANEL_WIDTH};

/// On-time of the least significant plane
const BASE_PLANE_US: u64 = 2;

const SCAN_ROWS: usize = PANEL_HEIGHT / 2;

/// Panel connector pins
pub struct Hub75Pins {
    pub r1: Output<'static>,
    pub g1: Output<'static>,
    pub b1: Output<'static>,
    pub r2: Output<'static>,
    pub g2: Output<'static>,
    pub b2: Output<'static>,
    /// Row address lines A to D
    pub addr: [Output<'static>; 4],
    pub clk: Output<'static>,
    pub lat: Output<'static>,
    /// Output enable, active low
    pub oe: Output<'static>,
}

impl Hub75Pins {
    fn set_color(&mut self, upper: Rgb888, lower: Rgb888, bit: u8) {
        let on = |channel: u8| (channel >> bit) & 1 != 0;
        self.r1.set_level(on(upper.r()).into());
        self.g1.set_level(on(upper.g()).into());
        self.b1.set_level(on(upper.b()).into());
        self.r2.set_level(on(lower.r()).into());
        self.g2.set_level(on(lower.g()).into());
        self.b2.set_level(on(lower.b()).into());
    }

    fn shift_row(&mut self, upper: &[Rgb888; PANEL_WIDTH], lower: &[Rgb888; PANEL_WIDTH], bit: u8) {
        for x in 0..PANEL_WIDTH {
            self.set_color(upper[x], lower[x], bit);
            self.clk.set_high();
            self.clk.set_low();
        }
    }

    fn select_row(&mut self, row: usize) {
        for (i, line) in self.addr.iter_mut().enumerate() {
            line.set_level(((row >> i) & 1 != 0).into());
        }
    }

    fn latch(&mut self) {
        self.lat.set_high();
        self.lat.set_low();
    }
}

/// Scan the front buffer out to the panel forever
#[embassy_executor::task]
pub async fn refresh_task(mut pins: Hub75Pins, bit_depth: u8) {
    let depth = bit_depth.clamp(1, 8);
    info!("HUB75 refresh started: {}x{}, {} bit planes", PANEL_WIDTH, PANEL_HEIGHT, depth);

    pins.oe.set_high();
    let mut upper = [Rgb888::BLACK; PANEL_WIDTH];
    let mut lower = [Rgb888::BLACK; PANEL_WIDTH];
    loop {
        for row in 0..SCAN_ROWS {
            FRONT.lock(|front| {
                let front = front.borrow();
                upper = *front.row(row);
                lower = *front.row(row + SCAN_ROWS);
            });

            for plane in 0..depth {
                // Use the most significant bits of each channel
                let bit = 8 - depth + plane;
                pins.shift_row(&upper, &lower, bit);
                pins.oe.set_high();
                pins.select_row(row);
                pins.latch();
                pins.oe.set_low();
                Timer::after_micros(BASE_PLANE_US << plane).await;
            }
            pins.oe.set_high();
        }
    }
}
