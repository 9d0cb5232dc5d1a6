//! Pixel output trait

use crate::animation::Frame;

/// Trait for the LED matrix driver
///
/// The driver rasterizes the frame's scene at the frame's offset and opacity,
/// then keeps it on the panel for `frame.step.duration_ms` before returning.
/// Showing a frame cannot fail; a driver that loses its panel keeps blocking
/// for the duration so loop timing is preserved.
pub trait DisplayDriver {
    fn show(&mut self, frame: &Frame<'_>);
}
