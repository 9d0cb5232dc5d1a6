//! Dual work queue
//!
//! Plain-text and structured items queue independently. Each queue keeps a
//! watermark, the highest feed identifier it has accepted, and rejects
//! anything at or below it, so overlapping poll windows never replay an item.
//! Each poll admits at most `fetch_limit` new items per queue, oldest first.
//!
//! Rejections caused by back-pressure (queue full, poll ceiling reached)
//! leave the watermark alone so the item is offered again by a later poll.
//! Payloads that fail to parse do move it: they were seen and would fail
//! again. Anything at or below the watermark is finished with and may be
//! removed from the feed.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use marquee_protocol::{FeedItem, ItemId};

use crate::message::{Message, MessageParser, Origin, ParseStats};

/// Which queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueKind {
    Text,
    Message,
}

impl QueueKind {
    pub fn origin(self) -> Origin {
        match self {
            QueueKind::Text => Origin::PlainText,
            QueueKind::Message => Origin::Structured,
        }
    }

    pub fn of(origin: Origin) -> Self {
        match origin {
            Origin::PlainText => QueueKind::Text,
            Origin::Structured => QueueKind::Message,
        }
    }
}

/// An item as fetched, before parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub id: ItemId,
    pub origin: Origin,
    pub payload: String,
}

impl RawItem {
    pub fn new(id: ItemId, origin: Origin, payload: &str) -> Self {
        Self {
            id,
            origin,
            payload: String::from(payload),
        }
    }

    pub fn from_feed(item: FeedItem, origin: Origin) -> Self {
        Self {
            id: item.id,
            origin,
            payload: item.value,
        }
    }
}

/// What happened to one offered item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Admission {
    /// Parsed and queued
    Queued,
    /// At or below the watermark
    Duplicate,
    /// Unparseable; the watermark moved past it
    Discarded,
    /// Back-pressure; offered again by a later poll
    Deferred,
}

/// Outcome of one ingested batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ingested {
    /// Ids that were queued, oldest first
    pub admitted: Vec<ItemId>,
    /// Ids already seen or unparseable
    pub consumed: Vec<ItemId>,
}

impl Ingested {
    /// Every id the feed no longer needs to hold
    pub fn finished(&self) -> impl Iterator<Item = &ItemId> {
        self.admitted.iter().chain(self.consumed.iter())
    }
}

/// Per-queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LaneStats {
    pub admitted: u32,
    /// At or below the watermark
    pub duplicates: u32,
    /// Queue at capacity
    pub rejected_full: u32,
    /// Poll ceiling reached
    pub rejected_ceiling: u32,
    /// Seen but unparseable
    pub discarded: u32,
}

#[derive(Debug, Default)]
struct Lane {
    items: VecDeque<Message>,
    watermark: Option<ItemId>,
    admitted_this_poll: u8,
    stats: LaneStats,
}

impl Lane {
    fn is_seen(&self, id: &ItemId) -> bool {
        self.watermark.as_ref().is_some_and(|mark| id <= mark)
    }

    fn advance(&mut self, id: &ItemId) {
        if !self.is_seen(id) {
            self.watermark = Some(id.clone());
        }
    }
}

/// The text and message queues plus their admission policy
#[derive(Debug)]
pub struct QueueManager {
    text: Lane,
    messages: Lane,
    capacity: usize,
    fetch_limit: u8,
    parser: MessageParser,
    next_sequence: u32,
}

impl QueueManager {
    pub fn new(capacity: u16, fetch_limit: u8) -> Self {
        Self {
            text: Lane::default(),
            messages: Lane::default(),
            capacity: capacity.max(1) as usize,
            fetch_limit: fetch_limit.max(1),
            parser: MessageParser::new(),
            next_sequence: 1,
        }
    }

    fn lane(&self, kind: QueueKind) -> &Lane {
        match kind {
            QueueKind::Text => &self.text,
            QueueKind::Message => &self.messages,
        }
    }

    fn lane_mut(&mut self, kind: QueueKind) -> &mut Lane {
        match kind {
            QueueKind::Text => &mut self.text,
            QueueKind::Message => &mut self.messages,
        }
    }

    /// Reset the per-poll admission counters
    pub fn begin_poll(&mut self) {
        self.text.admitted_this_poll = 0;
        self.messages.admitted_this_poll = 0;
    }

    /// Parse and queue `item` unless its identifier has been seen
    ///
    /// Returns whether a message was queued.
    pub fn enqueue_if_new(&mut self, item: RawItem) -> bool {
        self.offer(item) == Admission::Queued
    }

    /// Parse and queue `item` unless its identifier has been seen
    pub fn offer(&mut self, item: RawItem) -> Admission {
        let kind = QueueKind::of(item.origin);
        let capacity = self.capacity;
        let fetch_limit = self.fetch_limit;

        let lane = self.lane_mut(kind);
        if lane.is_seen(&item.id) {
            lane.stats.duplicates += 1;
            trace!("{} queue: {} already seen", kind, item.id.as_str());
            return Admission::Duplicate;
        }
        if lane.admitted_this_poll >= fetch_limit {
            lane.stats.rejected_ceiling += 1;
            debug!("{} queue: poll ceiling reached, deferring {}", kind, item.id.as_str());
            return Admission::Deferred;
        }
        if lane.items.len() >= capacity {
            lane.stats.rejected_full += 1;
            debug!("{} queue: full, deferring {}", kind, item.id.as_str());
            return Admission::Deferred;
        }

        let parsed = self.parser.parse(item.origin, &item.payload);
        let lane = self.lane_mut(kind);
        lane.advance(&item.id);
        let mut message = match parsed {
            Ok(message) => message,
            Err(_) => {
                lane.stats.discarded += 1;
                return Admission::Discarded;
            }
        };

        lane.admitted_this_poll += 1;
        lane.stats.admitted += 1;
        message.item_id = Some(item.id);
        message.sequence_id = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let lane = self.lane_mut(kind);
        debug!("{} queue: admitted message {}", kind, message.sequence_id);
        lane.items.push_back(message);
        Admission::Queued
    }

    /// Admit a fetched batch oldest-first
    pub fn ingest(&mut self, mut batch: Vec<RawItem>) -> Ingested {
        batch.sort_by(|a, b| a.id.cmp(&b.id));
        let mut outcome = Ingested::default();
        for item in batch {
            let id = item.id.clone();
            match self.offer(item) {
                Admission::Queued => outcome.admitted.push(id),
                Admission::Duplicate | Admission::Discarded => outcome.consumed.push(id),
                Admission::Deferred => {}
            }
        }
        outcome
    }

    pub fn dequeue_text(&mut self) -> Option<Message> {
        self.text.items.pop_front()
    }

    pub fn dequeue_message(&mut self) -> Option<Message> {
        self.messages.items.pop_front()
    }

    /// Next message to render: text queue first
    pub fn dequeue_next(&mut self) -> Option<Message> {
        self.dequeue_text().or_else(|| self.dequeue_message())
    }

    pub fn capacity_remaining(&self, kind: QueueKind) -> usize {
        self.capacity.saturating_sub(self.lane(kind).items.len())
    }

    pub fn len(&self, kind: QueueKind) -> usize {
        self.lane(kind).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.items.is_empty() && self.messages.items.is_empty()
    }

    pub fn watermark(&self, kind: QueueKind) -> Option<&ItemId> {
        self.lane(kind).watermark.as_ref()
    }

    pub fn stats(&self, kind: QueueKind) -> LaneStats {
        self.lane(kind).stats
    }

    pub fn parser_stats(&self) -> ParseStats {
        self.parser.stats()
    }
}
