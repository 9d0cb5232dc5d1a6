//! Frame rasterization for the LED matrix
//!
//! Frames are drawn into a private back buffer with embedded-graphics, then
//! copied into the front buffer that the refresh loop on core 1 scans out.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{block_for, Duration};
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};

use marquee_core::animation::{Frame, Run, FALLBACK_ADVANCE};
use marquee_core::style::Color;
use marquee_core::traits::DisplayDriver;
use marquee_protocol::Bitmap;

use crate::assets::AssetStore;

pub const PANEL_WIDTH: usize = 128;
pub const PANEL_HEIGHT: usize = 32;

/// Same metrics the planner assumes when no font loads
const FALLBACK_FONT: MonoFont<'static> = FONT_6X10;

pub type PanelCanvas = Canvas<PANEL_WIDTH, PANEL_HEIGHT>;

/// Front buffer, shared with the refresh loop
pub static FRONT: Mutex<CriticalSectionRawMutex, RefCell<PanelCanvas>> =
    Mutex::new(RefCell::new(Canvas::new()));

/// RGB pixel grid
#[derive(Clone)]
pub struct Canvas<const W: usize, const H: usize> {
    rows: [[Rgb888; W]; H],
}

impl<const W: usize, const H: usize> Canvas<W, H> {
    pub const fn new() -> Self {
        Self {
            rows: [[Rgb888::BLACK; W]; H],
        }
    }

    pub fn clear(&mut self) {
        self.rows = [[Rgb888::BLACK; W]; H];
    }

    pub fn row(&self, y: usize) -> &[Rgb888; W] {
        &self.rows[y]
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb888) {
        if x >= 0 && x < W as i32 && y >= 0 && y < H as i32 {
            self.rows[y as usize][x as usize] = color;
        }
    }

    fn blit(&mut self, image: &Bitmap, x: i32, y: i32, opacity: u8) {
        for py in 0..image.height {
            for px in 0..image.width {
                if let Some([r, g, b]) = image.pixel(px, py) {
                    let c = Color { r, g, b }.scale(opacity);
                    self.set_pixel(x + px as i32, y + py as i32, Rgb888::new(c.r, c.g, c.b));
                }
            }
        }
    }
}

impl<const W: usize, const H: usize> OriginDimensions for Canvas<W, H> {
    fn size(&self) -> Size {
        Size::new(W as u32, H as u32)
    }
}

impl<const W: usize, const H: usize> DrawTarget for Canvas<W, H> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color);
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        for (point, color) in area.points().zip(colors) {
            self.set_pixel(point.x, point.y, color);
        }
        Ok(())
    }
}

/// Display driver for the HUB75 panel
pub struct MatrixDisplay {
    back: Box<PanelCanvas>,
    store: Rc<RefCell<AssetStore>>,
    icon_gap: i32,
}

impl MatrixDisplay {
    pub fn new(store: Rc<RefCell<AssetStore>>, icon_gap_px: u8) -> Self {
        Self {
            back: Box::new(Canvas::new()),
            store,
            icon_gap: icon_gap_px as i32,
        }
    }

    fn render(&mut self, frame: &Frame<'_>) {
        let Self { back, store, icon_gap } = self;
        let store = store.borrow();
        let scene = frame.scene;
        let step = frame.step;

        back.clear();
        if let Some(image) = scene.background.and_then(|bg| store.image(bg.asset)) {
            back.blit(image, 0, 0, u8::MAX);
        }
        if step.opacity == 0 {
            return;
        }

        let font = scene
            .font
            .and_then(|f| store.font(f.asset))
            .unwrap_or(&FALLBACK_FONT);
        let advance = scene.font.map_or(FALLBACK_ADVANCE, |f| f.width) as i32;

        let mut x = step.x as i32;
        let y = step.y as i32;
        for (i, run) in scene.runs.iter().enumerate() {
            match run {
                Run::Icon(icon) => {
                    if let Some(image) = store.image(icon.asset) {
                        back.blit(image, x, y, step.opacity);
                    }
                    x += icon.width as i32;
                    if i + 1 < scene.runs.len() {
                        x += *icon_gap;
                    }
                }
                Run::Text { text, color } => {
                    let c = color.scale(step.opacity);
                    let style = MonoTextStyle::new(font, Rgb888::new(c.r, c.g, c.b));
                    Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
                        .draw(&mut **back)
                        .ok();
                    x += text.chars().count() as i32 * advance;
                }
            }
        }
    }
}

impl DisplayDriver for MatrixDisplay {
    fn show(&mut self, frame: &Frame<'_>) {
        self.render(frame);
        FRONT.lock(|front| front.borrow_mut().clone_from(&*self.back));
        if frame.step.duration_ms > 0 {
            block_for(Duration::from_millis(frame.step.duration_ms as u64));
        }
    }
}
