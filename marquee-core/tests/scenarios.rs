//! End-to-end scenarios against in-memory collaborators

use std::collections::{HashSet, VecDeque};

use marquee_core::animation::{AnimationEngine, FrameStep, Run, Step};
use marquee_core::cache::{AssetId, LoadError, ResourceCache, ResourceHandle, ResourceKind, ResourceSource};
use marquee_core::config::{CacheConfig, MarqueeConfig, SettingKey};
use marquee_core::message::{MessageParser, Origin};
use marquee_core::queue::{QueueKind, QueueManager, RawItem};
use marquee_core::style::{Color, StyleState};
use marquee_core::traits::{
    Clock, Decoded, DisplayDriver, FeedTransport, Method, Request, ResourceDecoder, Response, TransportError,
    Watchdog,
};
use marquee_core::Runtime;
use marquee_protocol::{decode_items, timestamp, ItemId};

/// Feed service answering by URL, optionally failing the next requests
#[derive(Default)]
struct FakeService {
    settings: String,
    text: String,
    messages: String,
    failures: VecDeque<TransportError>,
    requests: Vec<(Method, String)>,
}

impl FakeService {
    fn new() -> Self {
        Self {
            settings: r#"{"feeds": []}"#.into(),
            text: "[]".into(),
            messages: "[]".into(),
            ..Self::default()
        }
    }

    fn gets(&self) -> usize {
        self.requests.iter().filter(|(m, _)| *m == Method::Get).count()
    }

    fn deletes(&self) -> usize {
        self.requests.iter().filter(|(m, _)| *m == Method::Delete).count()
    }
}

impl FeedTransport for FakeService {
    fn request(&mut self, request: &Request<'_>) -> Result<Response, TransportError> {
        self.requests.push((request.method, request.url.to_string()));
        if let Some(failure) = self.failures.pop_front() {
            return Err(failure);
        }
        let body = match request.method {
            Method::Delete => "",
            Method::Get if request.url.contains("/groups/") => self.settings.as_str(),
            Method::Get if request.url.contains(".text-queue/") => self.text.as_str(),
            Method::Get => self.messages.as_str(),
        };
        Ok(Response::new(200, body.as_bytes()))
    }

    fn reset_session(&mut self) {}
}

/// Decoder that knows a fixed set of asset names
struct TableDecoder {
    known: HashSet<&'static str>,
    next: u32,
}

impl TableDecoder {
    fn new() -> Self {
        Self {
            known: ["lemon", "comic8", "ledbg00", "beach", "heart", "star"].into_iter().collect(),
            next: 0,
        }
    }
}

impl ResourceDecoder for TableDecoder {
    fn decode(&mut self, kind: ResourceKind, source: &ResourceSource) -> Result<Decoded, LoadError> {
        if let ResourceSource::Named(name) = source {
            if !self.known.contains(name.as_str()) {
                return Err(LoadError::NotFound);
            }
        }
        self.next += 1;
        let (width, height) = match kind {
            ResourceKind::Font => (6, 10),
            ResourceKind::Icon => (8, 8),
            ResourceKind::Background => (128, 32),
        };
        Ok(Decoded {
            asset: AssetId(self.next),
            width,
            height,
        })
    }

    fn release(&mut self, _asset: AssetId) {}
}

#[derive(Default)]
struct RecordingDisplay {
    frames: Vec<FrameStep>,
}

impl DisplayDriver for RecordingDisplay {
    fn show(&mut self, frame: &marquee_core::animation::Frame<'_>) {
        self.frames.push(frame.step);
    }
}

#[derive(Default)]
struct CountingWatchdog {
    pulses: u32,
}

impl Watchdog for CountingWatchdog {
    fn pulse(&mut self) {
        self.pulses += 1;
    }
}

#[derive(Default)]
struct ManualClock {
    now_ms: u64,
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.now_ms += ms as u64;
    }
}

type TestRuntime<T> = Runtime<T, TableDecoder, RecordingDisplay, CountingWatchdog, ManualClock>;

fn runtime<T: FeedTransport>(service: T) -> TestRuntime<T> {
    Runtime::new(
        MarqueeConfig::default(),
        service,
        TableDecoder::new(),
        RecordingDisplay::default(),
        CountingWatchdog::default(),
        ManualClock::default(),
    )
}

fn style() -> StyleState {
    let config = MarqueeConfig::default();
    StyleState::new(&config.style, &config.fonts)
}

fn engine() -> AnimationEngine {
    let config = MarqueeConfig::default();
    AnimationEngine::new(&config.display, &config.animation)
}

fn cache() -> ResourceCache<TableDecoder> {
    ResourceCache::new(TableDecoder::new(), &CacheConfig::default())
}

#[test]
fn test_scenario_a_repeated_item_is_queued_once() {
    let body = br#"[{"id": "1", "value": "Hello"}]"#;
    let mut queues = QueueManager::new(250, 5);
    for _ in 0..2 {
        queues.begin_poll();
        let batch = decode_items(body)
            .unwrap()
            .into_iter()
            .map(|item| RawItem::from_feed(item, Origin::PlainText))
            .collect();
        queues.ingest(batch);
    }
    assert_eq!(queues.len(QueueKind::Text), 1);
    assert_eq!(queues.stats(QueueKind::Text).duplicates, 1);
}

#[test]
fn test_scenario_a_through_the_main_loop() {
    let mut service = FakeService::new();
    service.text = r#"[{"id": "1", "value": "Hello"}]"#.into();
    let mut rt = runtime(service);

    // First cycle: nothing to render, poll admits the item
    let report = rt.run_once();
    assert!(report.polled);
    assert_eq!(report.rendered, None);
    assert_eq!(report.wait_ms, 10_000);
    assert_eq!(rt.queues().len(QueueKind::Text), 1);

    // Second cycle after the poll period: renders, then sees id 1 again
    rt.clock_mut().now_ms += 30_000;
    let report = rt.run_once();
    assert_eq!(report.rendered, Some(Origin::PlainText));
    assert_eq!(report.wait_ms, 2_000);
    assert_eq!(rt.queues().len(QueueKind::Text), 0);
    assert_eq!(rt.queues().stats(QueueKind::Text).admitted, 1);
    assert_eq!(rt.queues().stats(QueueKind::Text).duplicates, 1);
    // Deleted when admitted, and again when the feed still returned it
    assert_eq!(rt.poller().transport().deletes(), 2);
    assert_eq!(rt.watchdog().pulses, 2);
}

#[test]
fn test_scenario_b_color_override_inherits_font() {
    let mut parser = MessageParser::new();
    let msg = parser
        .parse(
            Origin::Structured,
            r##"{"name":"bday","elements":[{"type":"color","data":"#FF0000"},{"type":"text","data":"Hi"}]}"##,
        )
        .unwrap();
    let style = style();
    let effective = style.merge(&msg);

    assert_eq!(effective.font.as_str(), "lemon");
    assert_eq!(effective.color, Color::from_rgb24(0xFF0000));
    assert_eq!(msg.category_str(), "bday");

    let mut engine = engine();
    let mut cache = cache();
    let plan = engine.plan(&msg, &effective, &mut cache);
    assert_eq!(
        plan.scene().runs,
        vec![Run::Text {
            text: "Hi".into(),
            color: Color::from_rgb24(0xFF0000)
        }]
    );
}

#[test]
fn test_scenario_c_unknown_effect_is_one_frame() {
    let mut parser = MessageParser::new();
    let msg = parser
        .parse(
            Origin::Structured,
            r#"{"name":"x","elements":[{"type":"fx","data":"sparkle"},{"type":"text","data":"Hi"}]}"#,
        )
        .unwrap();
    let mut engine = engine();
    let mut cache = cache();
    let mut plan = engine.plan(&msg, &style().merge(&msg), &mut cache);

    let mut frames = 0;
    while let Step::Frame(_) = engine.step(&mut plan) {
        frames += 1;
    }
    assert_eq!(frames, 1);
}

#[test]
fn test_scenario_d_failing_cycle_pulses_once() {
    let mut service = FakeService::new();
    service.text = r#"[{"id": "1", "value": "Hello"}]"#.into();
    service.failures = [TransportError::Timeout; 3].into_iter().collect();
    let mut rt = runtime(service);

    let report = rt.run_once();
    assert!(report.polled);
    assert_eq!(rt.queues().len(QueueKind::Text), 0);
    assert_eq!(rt.watchdog().pulses, 1);
    assert_eq!(rt.poller().stats().cycles_skipped, 1);
    // The rest of the cycle was skipped after the settings call gave up
    assert_eq!(rt.poller().transport().gets(), 3);

    // The next cycle recovers
    rt.clock_mut().now_ms += 30_000;
    rt.run_once();
    assert_eq!(rt.queues().len(QueueKind::Text), 1);
    assert_eq!(rt.watchdog().pulses, 2);
}

#[test]
fn test_scenario_e_missing_icon_uses_global() {
    let mut style = style();
    style.apply_global_update(SettingKey::Icon, "heart").unwrap();
    let mut parser = MessageParser::new();
    let msg = parser
        .parse(
            Origin::Structured,
            r#"{"name":"x","elements":[{"type":"icon","data":"nope"},{"type":"text","data":"Hi"}]}"#,
        )
        .unwrap();

    let mut engine = engine();
    let mut cache = cache();
    let heart = cache
        .get_or_load(ResourceKind::Icon, &ResourceSource::named("heart").unwrap())
        .unwrap();
    let plan = engine.plan(&msg, &style.merge(&msg), &mut cache);

    let icons: Vec<ResourceHandle> = plan
        .scene()
        .runs
        .iter()
        .filter_map(|run| match run {
            Run::Icon(handle) => Some(*handle),
            Run::Text { .. } => None,
        })
        .collect();
    assert_eq!(icons, vec![heart]);
    assert_eq!(engine.stats().fallbacks, 1);
}

#[test]
fn test_system_off_still_polls_settings() {
    let mut service = FakeService::new();
    service.settings = r#"{"feeds": [{"key": "scroller.system-on", "last_value": "false"}]}"#.into();
    service.text = r#"[{"id": "1", "value": "Hello"}]"#.into();
    let mut rt = runtime(service);

    rt.run_once();
    assert!(!rt.system_enabled());
    assert_eq!(rt.queues().len(QueueKind::Text), 0);
    assert_eq!(rt.poller().transport().gets(), 1);
    assert!(rt.display().frames.is_empty());
}

#[test]
fn test_status_splash_is_static() {
    let mut rt = runtime(FakeService::new());
    rt.show_status("Connecting");
    assert_eq!(rt.display().frames.len(), 1);
    assert_eq!(rt.display().frames[0].duration_ms, 3_000);
}

#[test]
fn test_render_ends_on_wallpaper() {
    let mut service = FakeService::new();
    service.settings = r#"{"feeds": [{"key": "scroller.wallpaper", "last_value": "beach"}]}"#.into();
    service.text = r#"[{"id": "7", "value": "Hi"}]"#.into();
    let mut rt = runtime(service);

    rt.run_once();
    rt.run_once();
    let last = rt.display().frames.last().copied().unwrap();
    assert_eq!(last.duration_ms, 0);
    assert_eq!(rt.cache().len(ResourceKind::Background), 2);
    assert_eq!(rt.queues().watermark(QueueKind::Text), Some(&ItemId::from_number(7)));
}

/// Feed that holds items until they are deleted and pages like the service:
/// newest first, `limit` items, optionally only those created at or before
/// `end_time`
struct PagedFeed {
    /// (id, created_epoch, value), oldest first
    text: Vec<(u64, u64, String)>,
    deleted: Vec<u64>,
}

impl PagedFeed {
    fn with_text(count: u64) -> Self {
        Self {
            text: (1..=count).map(|id| (id, 1_000 + id, format!("msg {}", id))).collect(),
            deleted: Vec::new(),
        }
    }

    fn page(&self, query: &str) -> String {
        let mut limit = usize::MAX;
        let mut end_time = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("limit", n)) => limit = n.parse().unwrap(),
                Some(("end_time", t)) => end_time = Some(t.to_string()),
                _ => {}
            }
        }
        let items: Vec<String> = self
            .text
            .iter()
            .rev()
            .filter(|(_, epoch, _)| end_time.as_deref().map_or(true, |end| timestamp(*epoch).unwrap().as_str() <= end))
            .take(limit)
            .map(|(id, epoch, value)| format!(r#"{{"id":"{}","value":"{}","created_epoch":{}}}"#, id, value, epoch))
            .collect();
        format!("[{}]", items.join(","))
    }
}

impl FeedTransport for PagedFeed {
    fn request(&mut self, request: &Request<'_>) -> Result<Response, TransportError> {
        let (path, query) = request.url.split_once('?').unwrap_or((request.url, ""));
        let body = match request.method {
            Method::Get if path.contains("/groups/") => r#"{"feeds": []}"#.to_string(),
            Method::Get if path.contains(".text-queue/") => self.page(query),
            Method::Get => "[]".to_string(),
            Method::Delete => {
                let id: u64 = path.rsplit('/').next().unwrap().parse().unwrap();
                self.text.retain(|(item, _, _)| *item != id);
                self.deleted.push(id);
                String::new()
            }
        };
        Ok(Response::new(200, body.as_bytes()))
    }

    fn reset_session(&mut self) {}
}

#[test]
fn test_backlog_deeper_than_one_page_is_delivered_in_order() {
    let mut rt = runtime(PagedFeed::with_text(25));

    for _ in 0..40 {
        rt.run_once();
        rt.clock_mut().now_ms += 30_000;
    }

    let feed = rt.poller().transport();
    assert!(feed.text.is_empty());
    assert_eq!(feed.deleted, (1..=25).collect::<Vec<u64>>());
    assert_eq!(rt.queues().stats(QueueKind::Text).admitted, 25);
    assert_eq!(rt.queues().stats(QueueKind::Text).duplicates, 0);
    assert_eq!(rt.queues().len(QueueKind::Text), 0);
}

#[test]
fn test_unparseable_items_are_deleted() {
    let mut service = FakeService::new();
    service.messages = r#"[{"id": "2", "value": "not json"}, {"id": "1", "value": "{\"elements\": []}"}]"#.into();
    let mut rt = runtime(service);

    rt.run_once();
    assert_eq!(rt.queues().len(QueueKind::Message), 0);
    assert_eq!(rt.queues().stats(QueueKind::Message).discarded, 2);
    let deleted: Vec<&str> = rt
        .poller()
        .transport()
        .requests
        .iter()
        .filter(|(m, _)| *m == Method::Delete)
        .map(|(_, url)| url.rsplit('/').next().unwrap())
        .collect();
    assert_eq!(deleted, vec!["1", "2"]);
}
