//! Message animation
//!
//! A message and its effective style become an [`AnimationPlan`]: a scene
//! (background, font and content runs, with every resource already loaded and
//! pinned) plus the complete list of frame steps. Playback only walks the
//! list, so nothing can fail once planning is done.
//!
//! State machine:
//! ```text
//! Idle ──plan()──► Planning ──► Playing ──step()=Done / finish()──► Idle
//! ```

mod effect;
mod engine;
mod frames;

pub use effect::{Edge, Effect, Primitive, FALLBACK_EFFECT};
pub use engine::{AnimationEngine, EngineState, EngineStats};

use alloc::string::String;
use alloc::vec::Vec;

use crate::cache::ResourceHandle;
use crate::style::Color;

/// Glyph advance used when no font could be loaded
pub const FALLBACK_ADVANCE: u16 = 6;

/// Line height used when no font could be loaded
pub const FALLBACK_LINE_HEIGHT: u16 = 10;

/// One piece of content, laid out left to right
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Icon(ResourceHandle),
    Text { text: String, color: Color },
}

/// Everything a frame draws, resolved once per message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    /// Drawn at the panel origin, never moves
    pub background: Option<ResourceHandle>,
    /// `None` means the driver's built-in font
    pub font: Option<ResourceHandle>,
    pub runs: Vec<Run>,
    pub content_width: u16,
    pub content_height: u16,
    /// Content position when fully on screen
    pub rest_x: i16,
    pub rest_y: i16,
}

impl Scene {
    /// Scene with only a background, shown between messages
    pub fn backdrop(background: Option<ResourceHandle>) -> Self {
        Self {
            background,
            font: None,
            runs: Vec::new(),
            content_width: 0,
            content_height: 0,
            rest_x: 0,
            rest_y: 0,
        }
    }

    /// Every resource the scene references
    pub fn handles(&self) -> impl Iterator<Item = ResourceHandle> + '_ {
        self.background
            .into_iter()
            .chain(self.font)
            .chain(self.runs.iter().filter_map(|run| match run {
                Run::Icon(handle) => Some(*handle),
                Run::Text { .. } => None,
            }))
    }
}

/// Position, visibility and hold time of the content for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameStep {
    /// Content top-left on the panel
    pub x: i16,
    pub y: i16,
    /// 0 hides the content, 255 draws it at full brightness
    pub opacity: u8,
    pub duration_ms: u32,
}

/// A frame ready for the display driver
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub scene: &'a Scene,
    pub step: FrameStep,
    /// Position within the plan
    pub index: usize,
}

/// Output of `AnimationEngine::step`
#[derive(Debug)]
pub enum Step<'a> {
    Frame(Frame<'a>),
    Done,
}

/// Precomputed frames for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationPlan {
    scene: Scene,
    steps: Vec<FrameStep>,
    cursor: usize,
    effect: Effect,
    sequence_id: u32,
}

impl AnimationPlan {
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn steps(&self) -> &[FrameStep] {
        &self.steps
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn sequence_id(&self) -> u32 {
        self.sequence_id
    }

    /// Frames not yet stepped
    pub fn remaining(&self) -> usize {
        self.steps.len() - self.cursor
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.duration_ms as u64).sum()
    }
}
