//! Main loop
//!
//! One cooperative loop does everything: render at most one queued message,
//! poll the feed service when the poll period has elapsed, log a status line,
//! then wait. Only the network call and frame display block, and both are
//! bounded.

use alloc::vec::Vec;
use core::fmt::Write;

use marquee_protocol::{FeedEndpoints, FeedSetting};

use crate::animation::AnimationEngine;
use crate::cache::ResourceCache;
use crate::config::{name, parse_bool, MarqueeConfig, SettingKey};
use crate::message::{Message, Origin};
use crate::poller::{Backlog, CycleOutcome, PollError, ResilientPoller, RetryPolicy};
use crate::queue::{QueueKind, QueueManager, RawItem};
use crate::style::StyleState;
use crate::traits::{Clock, DisplayDriver, FeedTransport, ResourceDecoder, Watchdog};

/// Effect used for device-generated status messages
const STATUS_EFFECT: &str = "none";

/// What one loop cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    /// Origin of the message rendered, if any
    pub rendered: Option<Origin>,
    /// Whether a poll cycle ran
    pub polled: bool,
    /// How long to wait before the next cycle
    pub wait_ms: u32,
}

/// The display runtime and its collaborators
pub struct Runtime<T, D, P, W, C>
where
    T: FeedTransport,
    D: ResourceDecoder,
    P: DisplayDriver,
    W: Watchdog,
    C: Clock,
{
    config: MarqueeConfig,
    endpoints: FeedEndpoints,
    poller: ResilientPoller<T>,
    text_backlog: Backlog,
    message_backlog: Backlog,
    queues: QueueManager,
    style: StyleState,
    cache: ResourceCache<D>,
    engine: AnimationEngine,
    display: P,
    watchdog: W,
    clock: C,
    system_enabled: bool,
    last_poll_ms: Option<u64>,
    started_ms: u64,
}

impl<T, D, P, W, C> Runtime<T, D, P, W, C>
where
    T: FeedTransport,
    D: ResourceDecoder,
    P: DisplayDriver,
    W: Watchdog,
    C: Clock,
{
    pub fn new(config: MarqueeConfig, transport: T, decoder: D, display: P, watchdog: W, clock: C) -> Self {
        let feeds = &config.feeds;
        let endpoints = FeedEndpoints::new(
            &feeds.base_url,
            &feeds.username,
            &feeds.group,
            &feeds.text_feed,
            &feeds.message_feed,
            feeds.page_size as usize,
        );
        let started_ms = clock.now_ms();
        Self {
            endpoints,
            poller: ResilientPoller::new(transport, RetryPolicy::from_config(&config.network)),
            text_backlog: Backlog::new(feeds.page_size, feeds.backlog_pages),
            message_backlog: Backlog::new(feeds.page_size, feeds.backlog_pages),
            queues: QueueManager::new(feeds.queue_capacity, feeds.fetch_limit),
            style: StyleState::new(&config.style, &config.fonts),
            cache: ResourceCache::new(decoder, &config.cache),
            engine: AnimationEngine::new(&config.display, &config.animation),
            display,
            watchdog,
            clock,
            system_enabled: true,
            last_poll_ms: None,
            started_ms,
            config,
        }
    }

    /// Show a device-generated message with a static effect
    pub fn show_status(&mut self, text: &str) {
        let message = Message::system(text);
        let mut style = self.style.merge(&message);
        if let Ok(effect) = name(STATUS_EFFECT) {
            style.effect = effect;
        }
        let plan = self.engine.plan(&message, &style, &mut self.cache);
        self.engine.play(plan, &mut self.display, &mut self.cache);
    }

    /// Run one loop cycle
    pub fn run_once(&mut self) -> LoopReport {
        let rendered = if self.system_enabled {
            self.render_next()
        } else {
            None
        };

        let polled = self.poll_due();
        if polled {
            self.poll();
        }
        self.log_status();

        let timing = &self.config.timing;
        LoopReport {
            rendered,
            polled,
            wait_ms: if rendered.is_some() {
                timing.busy_wait_ms
            } else {
                timing.idle_wait_ms
            },
        }
    }

    /// Loop forever
    pub fn run(&mut self) -> ! {
        info!("Runtime started");
        loop {
            let report = self.run_once();
            self.clock.sleep_ms(report.wait_ms);
        }
    }

    fn render_next(&mut self) -> Option<Origin> {
        let message = self.queues.dequeue_next()?;
        info!(
            "Rendering message {} ({}, {} chars)",
            message.sequence_id,
            message.category_str(),
            message.text_len()
        );

        let style = self.style.merge(&message);
        self.style.begin_message(&message);
        let plan = self.engine.plan(&message, &style, &mut self.cache);
        self.engine.play(plan, &mut self.display, &mut self.cache);
        self.style.end_message();

        self.show_idle();
        Some(message.origin)
    }

    /// Show the wallpaper, or the screen-off image, between messages
    fn show_idle(&mut self) {
        let background = self.style.idle_background();
        let plan = self.engine.plan_backdrop(&background, &mut self.cache);
        self.engine.play(plan, &mut self.display, &mut self.cache);
    }

    fn poll_due(&self) -> bool {
        let period_ms = self.config.timing.poll_period_s as u64 * 1000;
        self.last_poll_ms
            .map_or(true, |last| self.clock.now_ms().saturating_sub(last) >= period_ms)
    }

    fn poll(&mut self) {
        self.last_poll_ms = Some(self.clock.now_ms());

        let Self {
            config,
            endpoints,
            poller,
            text_backlog,
            message_backlog,
            queues,
            style,
            watchdog,
            clock,
            system_enabled,
            ..
        } = self;
        let group = config.feeds.group.as_str();
        let acknowledge = config.feeds.acknowledge;

        let outcome = poller.cycle(watchdog, clock, |poller, clock| {
            queues.begin_poll();

            match poller.poll_settings(&endpoints.settings, clock) {
                Ok(settings) => apply_settings(&mut *style, &mut *system_enabled, group, &settings),
                Err(PollError::Status(status)) => warn!("Settings request refused: {}", status),
                Err(e) => return Err(e),
            }
            if !*system_enabled {
                return Ok(0);
            }

            let mut admitted = 0;
            for kind in [QueueKind::Text, QueueKind::Message] {
                let backlog = match kind {
                    QueueKind::Text => &mut *text_backlog,
                    QueueKind::Message => &mut *message_backlog,
                };
                let page = |cursor: Option<u64>| match (kind, cursor) {
                    (QueueKind::Text, None) => endpoints.text.clone(),
                    (QueueKind::Text, Some(epoch)) => endpoints.text_before(epoch),
                    (QueueKind::Message, None) => endpoints.messages.clone(),
                    (QueueKind::Message, Some(epoch)) => endpoints.messages_before(epoch),
                };
                let mark = queues.watermark(kind).cloned();
                let items = match backlog.fetch(poller, mark.as_ref(), clock, page) {
                    Ok(Some(items)) => items,
                    // Older pages still to read; nothing is admitted meanwhile
                    Ok(None) => continue,
                    Err(PollError::Status(status)) => {
                        warn!("{} feed request refused: {}", kind, status);
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let batch: Vec<RawItem> = items
                    .into_iter()
                    .map(|item| RawItem::from_feed(item, kind.origin()))
                    .collect();
                let ingested = queues.ingest(batch);
                admitted += ingested.admitted.len();

                if acknowledge {
                    for id in ingested.finished() {
                        let item_url = match kind {
                            QueueKind::Text => endpoints.text_item(id),
                            QueueKind::Message => endpoints.message_item(id),
                        };
                        if let Err(e) = poller.acknowledge(&item_url, clock) {
                            warn!("Could not delete {} item {}: {}", kind, id.as_str(), e);
                            break;
                        }
                    }
                }
            }
            Ok(admitted)
        });

        if let CycleOutcome::Completed(admitted) = outcome {
            debug!("Poll cycle admitted {} items", admitted);
        }
    }

    fn log_status(&self) {
        let line = status_line(
            self.poller.healthy(),
            self.queues.len(QueueKind::Text),
            self.queues.len(QueueKind::Message),
            self.uptime_s(),
        );
        info!("{}", line.as_str());
    }

    /// Seconds since the runtime was created
    pub fn uptime_s(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.started_ms) / 1000
    }

    pub fn system_enabled(&self) -> bool {
        self.system_enabled
    }

    pub fn config(&self) -> &MarqueeConfig {
        &self.config
    }

    pub fn queues(&self) -> &QueueManager {
        &self.queues
    }

    pub fn queues_mut(&mut self) -> &mut QueueManager {
        &mut self.queues
    }

    pub fn style(&self) -> &StyleState {
        &self.style
    }

    pub fn cache(&self) -> &ResourceCache<D> {
        &self.cache
    }

    pub fn engine(&self) -> &AnimationEngine {
        &self.engine
    }

    pub fn poller(&self) -> &ResilientPoller<T> {
        &self.poller
    }

    pub fn display(&self) -> &P {
        &self.display
    }

    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

/// Apply a settings snapshot; bad values keep their previous setting
fn apply_settings(style: &mut StyleState, system_enabled: &mut bool, group: &str, settings: &[FeedSetting]) {
    for setting in settings {
        let Some(key) = SettingKey::parse(group, &setting.key) else {
            debug!("Ignoring setting {}", setting.key.as_str());
            continue;
        };
        let result = match key {
            SettingKey::SystemOn => parse_bool(&setting.value).map(|on| {
                if on != *system_enabled {
                    info!("Display switched {}", if on { "on" } else { "off" });
                }
                *system_enabled = on;
            }),
            _ => style.apply_global_update(key, &setting.value),
        };
        if let Err(e) = result {
            warn!("Bad value for setting {}: {}", key.as_str(), e);
        }
    }
}

/// `IO ok | text:003 msg:000 | up 1h, 2m, 5s`
pub fn status_line(healthy: bool, text: usize, messages: usize, uptime_s: u64) -> heapless::String<64> {
    let mut line = heapless::String::new();
    let _ = write!(
        line,
        "IO {} | text:{:03} msg:{:03} | up {}",
        if healthy { "ok" } else { "err" },
        text,
        messages,
        format_uptime(uptime_s, 3).as_str()
    );
    line
}

/// Human uptime with at most `parts` units, largest first
pub fn format_uptime(seconds: u64, parts: usize) -> heapless::String<32> {
    const UNITS: [(u64, char); 5] = [(604_800, 'w'), (86_400, 'd'), (3_600, 'h'), (60, 'm'), (1, 's')];

    let mut out = heapless::String::new();
    let mut remaining = seconds;
    let mut written = 0;
    for (size, unit) in UNITS {
        if written == parts {
            break;
        }
        let count = remaining / size;
        remaining %= size;
        if count == 0 {
            continue;
        }
        if written > 0 {
            let _ = out.push_str(", ");
        }
        let _ = write!(out, "{}{}", count, unit);
        written += 1;
    }
    if written == 0 {
        let _ = out.push_str("0s");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleDefaults;
    use alloc::string::String;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0, 3).as_str(), "0s");
        assert_eq!(format_uptime(3725, 3).as_str(), "1h, 2m, 5s");
        assert_eq!(format_uptime(694_861, 3).as_str(), "1w, 1d, 1h");
        assert_eq!(format_uptime(90_061, 2).as_str(), "1d, 1h");
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            status_line(true, 3, 0, 3725).as_str(),
            "IO ok | text:003 msg:000 | up 1h, 2m, 5s"
        );
        assert!(status_line(false, 0, 0, 0).starts_with("IO err"));
    }

    fn setting(key: &str, value: &str) -> FeedSetting {
        FeedSetting {
            key: String::from(key),
            value: String::from(value),
        }
    }

    #[test]
    fn test_apply_settings() {
        let fonts = crate::config::MarqueeConfig::default().fonts;
        let mut style = StyleState::new(&StyleDefaults::default(), &fonts);
        let mut enabled = true;
        apply_settings(
            &mut style,
            &mut enabled,
            "scroller",
            &[
                setting("scroller.font", "comic8"),
                setting("scroller.color", "not a color"),
                setting("scroller.system-on", "off"),
                setting("weather.temp", "21"),
            ],
        );
        assert_eq!(style.global().font.as_str(), "comic8");
        assert_eq!(style.global().color, crate::style::Color::WHITE);
        assert!(!enabled);
    }
}
