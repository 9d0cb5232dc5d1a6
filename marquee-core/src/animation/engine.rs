//! Planning and playback

use alloc::vec::Vec;

use super::frames::{self, Geometry};
use super::{
    AnimationPlan, Effect, Frame, FrameStep, Run, Scene, Step, FALLBACK_ADVANCE,
    FALLBACK_EFFECT, FALLBACK_LINE_HEIGHT,
};
use crate::cache::{ResourceCache, ResourceHandle, ResourceKind, ResourceSource};
use crate::config::{AnimationConfig, DisplayConfig};
use crate::message::{ElementKind, Message};
use crate::style::{Color, EffectiveStyle};
use crate::traits::{DisplayDriver, ResourceDecoder};

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineState {
    Idle,
    /// Resolving resources and computing frames
    Planning,
    /// A plan is being stepped
    Playing,
}

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineStats {
    pub plans: u32,
    pub frames: u32,
    /// Resources that were replaced by their global fallback
    pub fallbacks: u32,
    pub cancelled: u32,
}

/// Turns messages into frame sequences
#[derive(Debug)]
pub struct AnimationEngine {
    panel_w: u16,
    panel_h: u16,
    config: AnimationConfig,
    state: EngineState,
    stats: EngineStats,
}

impl AnimationEngine {
    pub fn new(display: &DisplayConfig, config: &AnimationConfig) -> Self {
        Self {
            panel_w: display.width,
            panel_h: display.height,
            config: config.clone(),
            state: EngineState::Idle,
            stats: EngineStats::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Resolve every resource of `message` and precompute all its frames
    ///
    /// Each resource is tried from `style` first, then from the global
    /// fallback. Anything that still fails is drawn without: a missing font
    /// uses the driver's built-in glyphs, a missing background leaves the
    /// panel black, a missing icon is left out. Every loaded handle is
    /// pinned until [`finish`](Self::finish) or [`cancel`](Self::cancel).
    pub fn plan<D: ResourceDecoder>(
        &mut self,
        message: &Message,
        style: &EffectiveStyle,
        cache: &mut ResourceCache<D>,
    ) -> AnimationPlan {
        self.state = EngineState::Planning;
        self.stats.plans += 1;

        let font = self.load(
            cache,
            ResourceKind::Font,
            Some(&ResourceSource::Named(style.font.clone())),
            Some(&ResourceSource::Named(style.fallback.font.clone())),
        );
        let background = self.load(
            cache,
            ResourceKind::Background,
            Some(&style.background),
            Some(&style.fallback.background),
        );

        let mut runs = Vec::new();
        let has_icons = message.elements_of(ElementKind::Icon).next().is_some();
        if !has_icons {
            if let Some(icon) = &style.icon {
                let loaded = self.load(cache, ResourceKind::Icon, Some(icon), style.fallback.icon.as_ref());
                runs.extend(loaded.map(Run::Icon));
            }
        }

        let mut color = style.fallback.color;
        for element in &message.elements {
            let payload = element.payload.as_str();
            match element.kind {
                ElementKind::Text => runs.push(Run::Text {
                    text: element.payload.clone(),
                    color,
                }),
                ElementKind::Color => {
                    if let Some(c) = Color::parse(payload) {
                        color = c;
                    }
                }
                ElementKind::Icon => {
                    let source = ResourceSource::icon(payload).ok();
                    let loaded = self.load(
                        cache,
                        ResourceKind::Icon,
                        source.as_ref(),
                        style.fallback.icon.as_ref(),
                    );
                    runs.extend(loaded.map(Run::Icon));
                }
                ElementKind::Font | ElementKind::Background | ElementKind::Effect => {}
            }
        }

        let effect = Effect::resolve(style.effect.as_str());
        let scene = self.layout(background, font, runs);
        let geometry = Geometry {
            panel_w: self.panel_w as i32,
            panel_h: self.panel_h as i32,
            content_w: scene.content_width as i32,
            content_h: scene.content_height as i32,
            rest_x: scene.rest_x as i32,
            rest_y: scene.rest_y as i32,
        };
        let steps = frames::build(effect, &geometry, &self.config);
        debug!(
            "Planned message {}: {} frames, {} runs",
            message.sequence_id,
            steps.len(),
            scene.runs.len()
        );

        self.state = EngineState::Playing;
        AnimationPlan {
            scene,
            steps,
            cursor: 0,
            effect,
            sequence_id: message.sequence_id,
        }
    }

    /// Plan a single frame showing only `background`
    pub fn plan_backdrop<D: ResourceDecoder>(
        &mut self,
        background: &ResourceSource,
        cache: &mut ResourceCache<D>,
    ) -> AnimationPlan {
        self.state = EngineState::Planning;
        let handle = self.load(cache, ResourceKind::Background, Some(background), None);
        self.state = EngineState::Playing;
        AnimationPlan {
            scene: Scene::backdrop(handle),
            steps: alloc::vec![FrameStep {
                x: 0,
                y: 0,
                opacity: u8::MAX,
                duration_ms: 0,
            }],
            cursor: 0,
            effect: FALLBACK_EFFECT,
            sequence_id: 0,
        }
    }

    /// Next frame of `plan`, or `Done` once every frame has been stepped
    pub fn step<'p>(&mut self, plan: &'p mut AnimationPlan) -> Step<'p> {
        let Some(step) = plan.steps.get(plan.cursor).copied() else {
            self.state = EngineState::Idle;
            return Step::Done;
        };
        let index = plan.cursor;
        plan.cursor += 1;
        self.stats.frames += 1;
        Step::Frame(Frame {
            scene: &plan.scene,
            step,
            index,
        })
    }

    /// Release the plan's resources after it has played out
    pub fn finish<D: ResourceDecoder>(&mut self, plan: AnimationPlan, cache: &mut ResourceCache<D>) {
        for handle in plan.scene.handles() {
            cache.unpin(&handle);
        }
        self.state = EngineState::Idle;
    }

    /// Abandon a plan part way through
    pub fn cancel<D: ResourceDecoder>(&mut self, plan: AnimationPlan, cache: &mut ResourceCache<D>) {
        debug!("Cancelling message {} with {} frames left", plan.sequence_id, plan.remaining());
        self.stats.cancelled += 1;
        self.finish(plan, cache);
    }

    /// Step `plan` to the end on `display`, then release it
    ///
    /// Returns the number of frames shown.
    pub fn play<D: ResourceDecoder, P: DisplayDriver>(
        &mut self,
        mut plan: AnimationPlan,
        display: &mut P,
        cache: &mut ResourceCache<D>,
    ) -> usize {
        let mut shown = 0;
        while let Step::Frame(frame) = self.step(&mut plan) {
            display.show(&frame);
            shown += 1;
        }
        self.finish(plan, cache);
        shown
    }

    /// Load `primary`, falling back to `fallback`; pins whatever loads
    fn load<D: ResourceDecoder>(
        &mut self,
        cache: &mut ResourceCache<D>,
        kind: ResourceKind,
        primary: Option<&ResourceSource>,
        fallback: Option<&ResourceSource>,
    ) -> Option<ResourceHandle> {
        let mut handle = primary.and_then(|source| cache.get_or_load(kind, source).ok());
        if handle.is_none() {
            if let Some(source) = fallback.filter(|f| Some(*f) != primary) {
                handle = cache.get_or_load(kind, source).ok();
                if handle.is_some() {
                    debug!("{} fell back to '{}'", kind, source.label());
                    self.stats.fallbacks += 1;
                }
            }
        }
        if let Some(handle) = &handle {
            cache.pin(handle);
        }
        handle
    }

    fn layout(
        &self,
        background: Option<ResourceHandle>,
        font: Option<ResourceHandle>,
        runs: Vec<Run>,
    ) -> Scene {
        let advance = font.map_or(FALLBACK_ADVANCE, |f| f.width) as u32;
        let line_height = font.map_or(FALLBACK_LINE_HEIGHT, |f| f.height) as u32;
        let gap = self.config.icon_gap_px as u32;

        let mut width: u32 = 0;
        let mut height = line_height;
        for (i, run) in runs.iter().enumerate() {
            match run {
                Run::Icon(icon) => {
                    width += icon.width as u32;
                    if i + 1 < runs.len() {
                        width += gap;
                    }
                    height = height.max(icon.height as u32);
                }
                Run::Text { text, .. } => width += text.chars().count() as u32 * advance,
            }
        }

        let limit = i16::MAX as u32;
        let width = width.min(limit);
        let height = height.min(limit);
        let panel_w = self.panel_w as u32;
        let panel_h = self.panel_h as u32;
        let centre = |panel: u32, size: u32| if size <= panel { ((panel - size) / 2) as i16 } else { 0 };

        Scene {
            background,
            font,
            runs,
            content_width: width as u16,
            content_height: height as u16,
            rest_x: centre(panel_w, width),
            rest_y: centre(panel_h, height),
        }
    }
}
