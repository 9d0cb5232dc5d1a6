//! Property tests for queue, style, planning and cache invariants

use proptest::prelude::*;

use marquee_core::animation::AnimationEngine;
use marquee_core::cache::{AssetId, LoadError, ResourceCache, ResourceKind, ResourceSource};
use marquee_core::config::{CacheConfig, MarqueeConfig};
use marquee_core::message::{Element, ElementKind, Message, MessageParser, Origin, ParseError};
use marquee_core::queue::{QueueKind, QueueManager, RawItem};
use marquee_core::style::StyleState;
use marquee_core::traits::{Decoded, ResourceDecoder};
use marquee_protocol::ItemId;

#[derive(Default)]
struct AnyDecoder {
    next: u32,
}

impl ResourceDecoder for AnyDecoder {
    fn decode(&mut self, kind: ResourceKind, _source: &ResourceSource) -> Result<Decoded, LoadError> {
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

fn element_kind() -> impl Strategy<Value = ElementKind> {
    prop_oneof![
        Just(ElementKind::Font),
        Just(ElementKind::Background),
        Just(ElementKind::Icon),
        Just(ElementKind::Color),
        Just(ElementKind::Text),
        Just(ElementKind::Effect),
    ]
}

fn payload(kind: ElementKind) -> BoxedStrategy<String> {
    match kind {
        ElementKind::Font => prop_oneof![Just("lemon"), Just("comic8"), Just("nosuch")]
            .prop_map(String::from)
            .boxed(),
        ElementKind::Color => "#[0-9A-F]{6}".boxed(),
        ElementKind::Effect => prop_oneof![
            Just("left2right"),
            Just("top2bottom"),
            Just("fade"),
            Just("blink"),
            Just("in_left"),
            Just("out_top"),
            Just("bogus")
        ]
        .prop_map(String::from)
        .boxed(),
        _ => "[a-z]{1,12}".boxed(),
    }
}

fn structured_message() -> impl Strategy<Value = Message> {
    prop::collection::vec(element_kind().prop_flat_map(|k| payload(k).prop_map(move |p| (k, p))), 1..8).prop_map(
        |elements| Message {
            origin: Origin::Structured,
            category: None,
            elements: elements.iter().map(|(k, p)| Element::new(*k, p)).collect(),
            sequence_id: 1,
            item_id: None,
        },
    )
}

fn style() -> StyleState {
    let config = MarqueeConfig::default();
    StyleState::new(&config.style, &config.fonts)
}

proptest! {
    #[test]
    fn prop_seen_ids_never_requeued(ids in prop::collection::vec(0u64..50, 1..40), candidate in 0u64..50) {
        let mut queues = QueueManager::new(250, 255);
        for id in &ids {
            queues.enqueue_if_new(RawItem::new(ItemId::from_number(*id), Origin::PlainText, "x"));
        }
        let mark = ids.iter().copied().max().unwrap();
        let before = queues.len(QueueKind::Text);
        let queued = queues.enqueue_if_new(RawItem::new(ItemId::from_number(candidate), Origin::PlainText, "x"));
        prop_assert_eq!(queued, candidate > mark);
        prop_assert_eq!(queues.len(QueueKind::Text), before + queued as usize);
    }

    #[test]
    fn prop_queue_holds_unique_ascending_ids(ids in prop::collection::vec(0u64..30, 0..60)) {
        let mut queues = QueueManager::new(250, 255);
        let batch = ids
            .iter()
            .map(|id| RawItem::new(ItemId::from_number(*id), Origin::PlainText, "x"))
            .collect();
        queues.ingest(batch);

        let mut last: Option<ItemId> = None;
        while let Some(msg) = queues.dequeue_text() {
            let id = msg.item_id.unwrap();
            if let Some(prev) = &last {
                prop_assert!(*prev < id);
            }
            last = Some(id);
        }
    }

    #[test]
    fn prop_no_text_is_empty(kinds in prop::collection::vec(element_kind(), 0..6)) {
        let elements: Vec<String> = kinds
            .iter()
            .filter(|k| **k != ElementKind::Text)
            .map(|k| format!(r#"{{"type":"{}","data":"v"}}"#, k.tag()))
            .collect();
        let raw = format!(r#"{{"name":"n","elements":[{}]}}"#, elements.join(","));
        let mut parser = MessageParser::new();
        prop_assert_eq!(parser.parse(Origin::Structured, &raw), Err(ParseError::Empty));
    }

    #[test]
    fn prop_merge_never_mutates_global(msg in structured_message()) {
        let style = style();
        let before = style.global().clone();
        let _ = style.merge(&msg);
        prop_assert_eq!(style.global(), &before);
    }

    #[test]
    fn prop_plan_is_deterministic(msg in structured_message()) {
        let config = MarqueeConfig::default();
        let style = style();
        let effective = style.merge(&msg);
        let mut engine = AnimationEngine::new(&config.display, &config.animation);
        let mut cache = ResourceCache::new(AnyDecoder::default(), &CacheConfig::default());

        let first = engine.plan(&msg, &effective, &mut cache);
        let second = engine.plan(&msg, &effective, &mut cache);
        prop_assert_eq!(first.steps(), second.steps());
        prop_assert_eq!(first.scene(), second.scene());
        prop_assert!(first.steps().len() <= 2 * config.animation.max_frames_per_primitive as usize + 1);

        engine.finish(first, &mut cache);
        engine.finish(second, &mut cache);
    }

    #[test]
    fn prop_pinned_entries_survive(names in prop::collection::vec("[a-e]", 1..30), pinned in "[a-e]") {
        let config = CacheConfig { font_slots: 1, icon_slots: 2, background_slots: 1 };
        let mut cache = ResourceCache::new(AnyDecoder::default(), &config);
        let source = ResourceSource::named(&pinned).unwrap();
        let handle = cache.get_or_load(ResourceKind::Icon, &source).unwrap();
        cache.pin(&handle);

        for name in &names {
            let _ = cache.get_or_load(ResourceKind::Icon, &ResourceSource::named(name).unwrap());
            prop_assert!(cache.holds(&handle));
        }
        prop_assert!(cache.len(ResourceKind::Icon) <= 2);
    }
}
