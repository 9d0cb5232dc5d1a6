//! Frame step generation

use alloc::vec::Vec;

use super::effect::{Edge, Effect, Primitive};
use super::FrameStep;
use crate::config::AnimationConfig;

const OPAQUE: u8 = 255;
const HIDDEN: u8 = 0;

/// Panel and content geometry in pixels
#[derive(Debug, Clone, Copy)]
pub(super) struct Geometry {
    pub panel_w: i32,
    pub panel_h: i32,
    pub content_w: i32,
    pub content_h: i32,
    pub rest_x: i32,
    pub rest_y: i32,
}

impl Geometry {
    fn rest(&self) -> (i32, i32) {
        (self.rest_x, self.rest_y)
    }

    /// Content position fully beyond `edge`
    fn beyond(&self, edge: Edge) -> (i32, i32) {
        match edge {
            Edge::Left => (-self.content_w, self.rest_y),
            Edge::Right => (self.panel_w, self.rest_y),
            Edge::Top => (self.rest_x, -self.content_h),
            Edge::Bottom => (self.rest_x, self.panel_h),
        }
    }
}

fn clamp16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn step(pos: (i32, i32), opacity: u8, duration_ms: u32) -> FrameStep {
    FrameStep {
        x: clamp16(pos.0),
        y: clamp16(pos.1),
        opacity,
        duration_ms: duration_ms.max(1),
    }
}

/// Build the full step list for an effect
pub(super) fn build(effect: Effect, g: &Geometry, cfg: &AnimationConfig) -> Vec<FrameStep> {
    let mut out = Vec::new();
    match effect {
        Effect::Single(p @ Primitive::ScrollIn(_)) => {
            primitive(p, g, cfg, &mut out);
            extend_last(&mut out, cfg.static_hold_ms);
        }
        Effect::Single(p @ Primitive::ScrollOut(_)) => {
            out.push(step(g.rest(), OPAQUE, cfg.static_hold_ms));
            primitive(p, g, cfg, &mut out);
        }
        Effect::Single(p) => primitive(p, g, cfg, &mut out),
        Effect::Sequence { entry, exit } => {
            primitive(entry, g, cfg, &mut out);
            if entry.is_vertical() {
                extend_last(&mut out, cfg.vertical_hold_ms);
            }
            primitive(exit, g, cfg, &mut out);
        }
    }
    out
}

fn extend_last(out: &mut [FrameStep], extra_ms: u32) {
    if let Some(last) = out.last_mut() {
        last.duration_ms = last.duration_ms.saturating_add(extra_ms);
    }
}

fn primitive(p: Primitive, g: &Geometry, cfg: &AnimationConfig, out: &mut Vec<FrameStep>) {
    match p {
        Primitive::ScrollIn(edge) => scroll(g.beyond(edge), g.rest(), edge.is_vertical(), cfg, out),
        Primitive::ScrollOut(edge) => scroll(g.rest(), g.beyond(edge), edge.is_vertical(), cfg, out),
        Primitive::Flash => cycle(g, cfg, 2, out),
        Primitive::Blink => cycle(g, cfg, 4, out),
        Primitive::Fade => fade(g, cfg, out),
        Primitive::Static => out.push(step(g.rest(), OPAQUE, cfg.static_hold_ms)),
    }
}

/// Linear slide; the first frame is one stride from `from`, the last is `to`
fn scroll(
    from: (i32, i32),
    to: (i32, i32),
    vertical: bool,
    cfg: &AnimationConfig,
    out: &mut Vec<FrameStep>,
) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let distance = dx.unsigned_abs().max(dy.unsigned_abs());
    if distance == 0 {
        out.push(step(to, OPAQUE, 1));
        return;
    }

    let budget = (cfg.max_frames_per_primitive as u32).max(1);
    let stride = distance.div_ceil(budget);
    let frames = distance.div_ceil(stride);
    let total_ms = if vertical {
        cfg.vertical_scroll_ms
    } else {
        (distance as u64 * 1000 / cfg.scroll_speed_px_s.max(1) as u64) as u32
    };
    let per_frame = total_ms / frames;

    out.reserve(frames as usize);
    for i in 1..=frames as i64 {
        let n = frames as i64;
        let x = from.0 as i64 + dx as i64 * i / n;
        let y = from.1 as i64 + dy as i64 * i / n;
        out.push(step((x as i32, y as i32), OPAQUE, per_frame));
    }
}

/// Visibility cycles at rest; each cycle blanks for `1/divisor` of its period
fn cycle(g: &Geometry, cfg: &AnimationConfig, divisor: u32, out: &mut Vec<FrameStep>) {
    let count = cfg.flash_count.max(1) as u32;
    let period = cfg.flash_ms / count;
    let off = period / divisor;
    let on = period - off;
    for _ in 0..count {
        out.push(step(g.rest(), HIDDEN, off));
        out.push(step(g.rest(), OPAQUE, on));
    }
}

/// Opacity ramp up to full then back down to hidden
fn fade(g: &Geometry, cfg: &AnimationConfig, out: &mut Vec<FrameStep>) {
    let steps = cfg.fade_steps.max(1) as u32;
    let per_frame = cfg.fade_ms / (2 * steps);
    let level = |i: u32| (i * OPAQUE as u32 / steps) as u8;
    for i in 1..=steps {
        out.push(step(g.rest(), level(i), per_frame));
    }
    for i in (0..steps).rev() {
        out.push(step(g.rest(), level(i), per_frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(content_w: i32) -> Geometry {
        Geometry {
            panel_w: 128,
            panel_h: 32,
            content_w,
            content_h: 10,
            rest_x: ((128 - content_w) / 2).max(0),
            rest_y: 11,
        }
    }

    #[test]
    fn test_static_is_one_frame() {
        let cfg = AnimationConfig::default();
        let steps = build(Effect::Single(Primitive::Static), &geometry(40), &cfg);
        assert_eq!(steps.len(), 1);
        assert_eq!((steps[0].x, steps[0].y), (44, 11));
        assert_eq!(steps[0].duration_ms, cfg.static_hold_ms);
    }

    #[test]
    fn test_scroll_in_ends_at_rest_and_holds() {
        let cfg = AnimationConfig::default();
        let g = geometry(40);
        let steps = build(Effect::Single(Primitive::ScrollIn(Edge::Right)), &g, &cfg);
        let last = steps.last().unwrap();
        assert_eq!((last.x as i32, last.y as i32), (g.rest_x, g.rest_y));
        assert!(last.duration_ms >= cfg.static_hold_ms);
        // 84 px at one pixel per frame
        assert_eq!(steps.len(), 84);
        assert!(steps.windows(2).all(|w| w[0].x > w[1].x));
    }

    #[test]
    fn test_long_scroll_widens_stride() {
        let cfg = AnimationConfig {
            max_frames_per_primitive: 50,
            ..AnimationConfig::default()
        };
        let steps = build(Effect::Single(Primitive::ScrollOut(Edge::Left)), &geometry(1000), &cfg);
        // one rest frame plus a capped scroll
        assert!(steps.len() <= 51);
        assert_eq!(steps.last().unwrap().x, -1000);
    }

    #[test]
    fn test_sequence_has_no_gap_frame() {
        let cfg = AnimationConfig::default();
        let g = geometry(40);
        let steps = build(
            Effect::Sequence {
                entry: Primitive::ScrollIn(Edge::Top),
                exit: Primitive::ScrollOut(Edge::Bottom),
            },
            &g,
            &cfg,
        );
        let rest_index = steps.iter().position(|s| s.y as i32 == g.rest_y).unwrap();
        assert!(steps[rest_index].duration_ms >= cfg.vertical_hold_ms);
        // the very next frame already moves toward the bottom edge
        assert!(steps[rest_index + 1].y as i32 > g.rest_y);
        assert!(steps.iter().all(|s| s.opacity == OPAQUE));
        assert_eq!(steps.last().unwrap().y, 32);
    }

    #[test]
    fn test_flash_and_blink_frame_counts() {
        let cfg = AnimationConfig::default();
        let g = geometry(40);
        let flash = build(Effect::Single(Primitive::Flash), &g, &cfg);
        let blink = build(Effect::Single(Primitive::Blink), &g, &cfg);
        assert_eq!(flash.len(), 2 * cfg.flash_count as usize);
        assert_eq!(blink.len(), 2 * cfg.flash_count as usize);
        assert_eq!(flash.last().unwrap().opacity, OPAQUE);
        assert!(blink[0].duration_ms < blink[1].duration_ms);
    }

    #[test]
    fn test_fade_ramps_up_then_down() {
        let cfg = AnimationConfig::default();
        let steps = build(Effect::Single(Primitive::Fade), &geometry(40), &cfg);
        let n = cfg.fade_steps as usize;
        assert_eq!(steps.len(), 2 * n);
        assert_eq!(steps[n - 1].opacity, OPAQUE);
        assert_eq!(steps.last().unwrap().opacity, HIDDEN);
    }
}
