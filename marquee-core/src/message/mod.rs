//! Messages and their elements
//!
//! A message is an ordered run of typed elements. Plain-text feed items carry
//! a single text element; structured items interleave style elements (font,
//! background, icon, color, effect) with text.

mod parser;

pub use parser::{MessageParser, ParseError, ParseStats};

use alloc::string::String;
use alloc::vec::Vec;

use marquee_protocol::message::{TAG_BACKGROUND, TAG_COLOR, TAG_EFFECT, TAG_FONT, TAG_ICON, TAG_TEXT};
use marquee_protocol::ItemId;

/// Maximum category label length
pub const MAX_CATEGORY_LEN: usize = 32;

/// Which feed a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Origin {
    PlainText,
    Structured,
}

/// Element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ElementKind {
    Font,
    Background,
    Icon,
    Color,
    Text,
    Effect,
}

impl ElementKind {
    /// Look up a wire tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            TAG_FONT => Some(ElementKind::Font),
            TAG_BACKGROUND => Some(ElementKind::Background),
            TAG_ICON => Some(ElementKind::Icon),
            TAG_COLOR => Some(ElementKind::Color),
            TAG_TEXT => Some(ElementKind::Text),
            TAG_EFFECT => Some(ElementKind::Effect),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Font => TAG_FONT,
            ElementKind::Background => TAG_BACKGROUND,
            ElementKind::Icon => TAG_ICON,
            ElementKind::Color => TAG_COLOR,
            ElementKind::Text => TAG_TEXT,
            ElementKind::Effect => TAG_EFFECT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub payload: String,
}

impl Element {
    pub fn new(kind: ElementKind, payload: &str) -> Self {
        Self {
            kind,
            payload: String::from(payload),
        }
    }
}

/// One unit of display work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub origin: Origin,
    /// Structured messages only; never drives display logic
    pub category: Option<heapless::String<MAX_CATEGORY_LEN>>,
    pub elements: Vec<Element>,
    /// Ingestion order, stamped by the queue manager
    pub sequence_id: u32,
    /// Feed item this message came from; `None` for device-generated messages
    pub item_id: Option<ItemId>,
}

impl Message {
    /// A device-generated plain-text message (boot splash, status)
    pub fn system(text: &str) -> Self {
        Self {
            origin: Origin::PlainText,
            category: None,
            elements: alloc::vec![Element::new(ElementKind::Text, text)],
            sequence_id: 0,
            item_id: None,
        }
    }

    /// Elements of one kind, in order
    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &Element> + '_ {
        self.elements.iter().filter(move |e| e.kind == kind)
    }

    /// Payload of the last element of `kind`
    pub fn last_of(&self, kind: ElementKind) -> Option<&str> {
        self.elements
            .iter()
            .rev()
            .find(|e| e.kind == kind)
            .map(|e| e.payload.as_str())
    }

    /// Number of characters of displayable text
    pub fn text_len(&self) -> usize {
        self.elements_of(ElementKind::Text)
            .map(|e| e.payload.chars().count())
            .sum()
    }

    /// Category label, or `-` for uncategorized messages
    pub fn category_str(&self) -> &str {
        self.category.as_deref().unwrap_or("-")
    }
}
